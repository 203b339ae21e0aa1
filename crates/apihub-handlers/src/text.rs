//! Random text generation.

use apihub_core::result::AppResult;
use apihub_plugin::{PluginHandler, PluginRequest, PluginResponse};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{HandlerError, HandlerResult};
use crate::params;

const LOREM: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud",
];

const WORDS: &[&str] = &[
    "amazing", "brilliant", "creative", "dynamic", "elegant", "fantastic", "gorgeous", "incredible",
    "joyful", "magnificent", "outstanding", "perfect", "remarkable", "spectacular", "wonderful",
    "excellent", "beautiful", "awesome", "stunning",
];

const SENTENCES: &[&str] = &[
    "This is a sample sentence.",
    "Technology is advancing rapidly.",
    "Innovation drives progress.",
    "Creativity knows no bounds.",
    "The future is bright.",
    "Learning never stops.",
    "Dreams become reality.",
    "Success requires dedication.",
];

/// Kind of text to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Lorem ipsum words.
    Lorem,
    /// Positive adjectives.
    Words,
    /// Short sentences.
    Sentences,
}

impl TextKind {
    /// Parses a kind name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lorem" => Some(Self::Lorem),
            "words" => Some(Self::Words),
            "sentences" => Some(Self::Sentences),
            _ => None,
        }
    }

    fn vocabulary(self) -> &'static [&'static str] {
        match self {
            Self::Lorem => LOREM,
            Self::Words => WORDS,
            Self::Sentences => SENTENCES,
        }
    }

    /// Picks `length` random entries and joins them with spaces.
    pub fn generate(self, length: usize) -> String {
        let vocabulary = self.vocabulary();
        let mut rng = rand::rng();
        (0..length)
            .filter_map(|_| vocabulary.choose(&mut rng).copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Options accepted by [`TextGeneratorHandler`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextGeneratorOptions {
    /// Length used when the request does not give one.
    pub default_length: usize,
    /// Upper bound on the requested length.
    pub max_length: usize,
}

impl Default for TextGeneratorOptions {
    fn default() -> Self {
        Self {
            default_length: 5,
            max_length: 1000,
        }
    }
}

/// Generates random lorem ipsum, words, or sentences.
#[derive(Debug, Clone, Default)]
pub struct TextGeneratorHandler {
    options: TextGeneratorOptions,
}

impl TextGeneratorHandler {
    /// Builds the handler from manifest options.
    pub fn from_options(options: &Value) -> HandlerResult<Self> {
        Ok(Self {
            options: params::options(options)?,
        })
    }

    fn generate(&self, request: &PluginRequest) -> HandlerResult<Value> {
        let kind_name = params::required_text(request, "type")?;

        let length = match request.param("length") {
            None => self.options.default_length,
            Some(value) => params::as_integer(&value)
                .filter(|n| *n >= 1)
                .map(|n| n as usize)
                .ok_or_else(|| HandlerError::invalid("Length must be a positive number"))?,
        };
        if length > self.options.max_length {
            return Err(HandlerError::invalid(format!(
                "Length must not exceed {}",
                self.options.max_length
            )));
        }

        let kind = TextKind::parse(&kind_name)
            .ok_or_else(|| HandlerError::invalid("Invalid type. Use: lorem, words, sentences"))?;

        Ok(json!({
            "success": true,
            "type": kind_name,
            "length": length,
            "result": kind.generate(length),
            "timestamp": params::now_iso(),
        }))
    }
}

#[async_trait]
impl PluginHandler for TextGeneratorHandler {
    async fn handle(&self, request: PluginRequest) -> AppResult<PluginResponse> {
        Ok(PluginResponse::ok(self.generate(&request)?))
    }
}

//! Request and response payloads for the static endpoints.

pub mod request;
pub mod response;

// ABOUTME: Error types for the processing API client
// ABOUTME: Separates server-reported failures from transport and decoding failures

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The server answered with `status: "error"`; the message is shown verbatim.
    Server(String),
    Transport(String),
    Parse(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::Server(msg) => write!(f, "{}", msg),
            ApiError::Transport(msg) => write!(f, "Request failed: {}", msg),
            ApiError::Parse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

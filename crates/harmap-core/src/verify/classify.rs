//! Classify HTTP status codes and curl errors into verification outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    ClientError,
    ServerError,
    TransportError,
    Timeout,
}

impl Outcome {
    pub const ALL: [Outcome; 5] = [
        Outcome::Success,
        Outcome::ClientError,
        Outcome::ServerError,
        Outcome::TransportError,
        Outcome::Timeout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::ClientError => "client_error",
            Outcome::ServerError => "server_error",
            Outcome::TransportError => "transport_error",
            Outcome::Timeout => "timeout",
        }
    }

    pub fn is_success(&self) -> bool {
        *self == Outcome::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final status after redirects. Anything below 400 counts as success.
pub fn classify_status(code: u32) -> Outcome {
    match code {
        400..=499 => Outcome::ClientError,
        500..=599 => Outcome::ServerError,
        // A status outside 1xx-5xx is not valid HTTP.
        600.. => Outcome::TransportError,
        _ => Outcome::Success,
    }
}

/// Curl failures: the configured timeout firing is its own outcome; every
/// other failure (DNS, connect, TLS, reset) is a transport error.
pub fn classify_curl_error(e: &curl::Error) -> Outcome {
    if e.is_operation_timedout() {
        Outcome::Timeout
    } else {
        Outcome::TransportError
    }
}

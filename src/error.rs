use std::fmt;

/// Crate-wide error taxonomy (spec §7): `Config` is fatal at startup;
/// `Transport` and `Registry` are logged by the caller, which decides
/// whether to retry; `Data` drops the offending record and keeps the rest;
/// `Internal` signals a broken invariant.
#[derive(Debug)]
#[allow(dead_code)]
pub enum GatewayError {
    NoRouteMatch,
    NoUpstream,
    Config(String),
    Transport(String),
    Registry { status: u16, body: String },
    Data(String),
    Internal(String),
    Http(reqwest::Error),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::NoRouteMatch => write!(f, "no route matched"),
            GatewayError::NoUpstream => write!(f, "no upstream available"),
            GatewayError::Config(msg) => write!(f, "config error: {}", msg),
            GatewayError::Transport(msg) => write!(f, "transport error: {}", msg),
            GatewayError::Registry { status, body } => {
                write!(f, "registry error: status={} body={}", status, body)
            }
            GatewayError::Data(msg) => write!(f, "data error: {}", msg),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
            GatewayError::Http(e) => write!(f, "http error: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            GatewayError::Transport(e.to_string())
        } else {
            GatewayError::Http(e)
        }
    }
}

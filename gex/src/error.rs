use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `gex`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum GexError {
    #[error("Ticker is required")]
    TickerRequired,

    #[error("spot price must be finite and positive, got: {0}")]
    InvalidSpot(f64),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to parse upstream payload: {0}")]
    Parse(String),

    #[error("upstream session unavailable: {0}")]
    Session(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GexError {
    /// Determine if an error was caused by the caller's request rather than an upstream
    /// collaborator. Only request errors are surfaced, everything else falls back.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_request_error(&self) -> bool {
        match self {
            GexError::TickerRequired | GexError::InvalidSpot(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for GexError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Parse(value.to_string())
        } else {
            Self::Http(value.to_string())
        }
    }
}

impl From<serde_json::Error> for GexError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

impl From<url::ParseError> for GexError {
    fn from(value: url::ParseError) -> Self {
        Self::Config(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gex_error_is_request_error() {
        struct TestCase {
            input: GexError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: missing ticker is the caller's fault
                input: GexError::TickerRequired,
                expected: true,
            },
            TestCase {
                // TC1: non-positive spot is the caller's fault
                input: GexError::InvalidSpot(-1.0),
                expected: true,
            },
            TestCase {
                // TC2: upstream status is recoverable via fallback
                input: GexError::Status {
                    url: "https://query1.finance.yahoo.com".to_string(),
                    status: 429,
                },
                expected: false,
            },
            TestCase {
                // TC3: parse failures are recoverable via fallback
                input: GexError::from(serde_json::from_str::<u8>("nope").unwrap_err()),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_request_error();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_ticker_required_message_matches_wire_error() {
        assert_eq!(GexError::TickerRequired.to_string(), "Ticker is required");
    }
}

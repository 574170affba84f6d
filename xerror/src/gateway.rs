use err_derive::Error;
use serde::Serialize;

/// Failures talking to the payment gateway. `Http` carries the literal
/// status code and body so callers can log or surface them verbatim.
#[derive(Debug, Error, Serialize)]
pub enum GatewayError {
    #[error(display = "Gateway returned HTTP {}: {}", status_code, body)]
    Http { status_code: u16, body: String },
    #[error(display = "Malformed gateway document: {}", _0)]
    Parse(String),
    #[error(display = "Gateway transport error: {}", _0)]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_preserves_status_and_body_verbatim() {
        let err = GatewayError::Http {
            status_code: 500,
            body: "<html>It's not you. It's us.</html>".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("500"));
        assert!(rendered.contains("<html>It's not you. It's us.</html>"));
    }
}


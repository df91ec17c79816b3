//! Type Conversions for ChatError
//!
//! From implementations for the error types the crate's dependencies raise.

use super::types::ChatError;

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::TimeoutError(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::api(status.as_u16(), err.to_string());
        }
        Self::HttpError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connection_failure_is_an_http_error() {
        // Nothing listens on port 9 of the loopback interface.
        let err: ChatError = reqwest::Client::new()
            .get("http://127.0.0.1:9/")
            .send()
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, ChatError::HttpError(_)));
        assert!(err.is_retryable());
    }
}

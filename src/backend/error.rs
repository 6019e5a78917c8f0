use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unavailable(String),

    #[error("unauthorized - check the configured API key")]
    Unauthorized,

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl BackendError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        // Cutting mid-character would panic on a non-ASCII body
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => BackendError::Unauthorized,
            404 => BackendError::NotFound(truncated),
            500..=599 => BackendError::ServerError(truncated),
            _ => BackendError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            BackendError::from_status(StatusCode::UNAUTHORIZED, ""),
            BackendError::Unauthorized
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::NOT_FOUND, "results/x"),
            BackendError::NotFound(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            BackendError::ServerError(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::IM_A_TEAPOT, ""),
            BackendError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = BackendError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        let msg = err.to_string();
        assert!(msg.len() < body.len());
        assert!(msg.contains("truncated"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // A multi-byte character straddling the cut point must not panic
        let mut body = "x".repeat(MAX_ERROR_BODY_LENGTH - 1);
        body.push('é');
        body.push_str(&"y".repeat(100));
        let err = BackendError::from_status(reqwest::StatusCode::BAD_GATEWAY, &body);
        let msg = err.to_string();
        assert!(msg.contains("truncated"));
        assert!(!msg.contains('é'));
    }
}

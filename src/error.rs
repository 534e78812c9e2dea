use thiserror::Error;

/// Errors raised while talking to the settings backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status. The body is the
    /// error text the user should see.
    #[error("{}", status_text(.status, .body))]
    Status { status: u16, body: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}

fn status_text(status: &u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_shows_body_verbatim() {
        let err = Error::status(400, "Unknown provider");
        assert_eq!(err.to_string(), "Unknown provider");
    }

    #[test]
    fn status_error_without_body_shows_code() {
        let err = Error::status(502, "  ");
        assert_eq!(err.to_string(), "HTTP 502");
    }
}

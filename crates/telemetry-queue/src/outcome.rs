//! Typed upload outcomes.
//!
//! Replaces the Python worker's exception-driven control flow with a pure
//! function of the HTTP result: the routing table in the upload-queue spec
//! becomes [`UploadOutcome::classify`] plus a `match` in the worker.

use std::fmt;

/// The result of one upload attempt, already classified for routing.
#[derive(Debug)]
pub enum UploadOutcome {
    /// HTTP 2xx — the envelope is done.
    Success,
    /// Retryable: 408, 429, 5xx, timeout, connection error, or circuit open.
    Transient(TransientError),
    /// Not retryable: any other 4xx.
    Permanent(PermanentError),
}

#[derive(Debug)]
pub struct TransientError(pub String);

impl fmt::Display for TransientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct PermanentError(pub String);

impl fmt::Display for PermanentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl UploadOutcome {
    /// Classify an HTTP status code per the spec's routing table.
    ///
    /// 408 and 429 are transient alongside 5xx even though they are
    /// nominally 4xx — this is the documented choice for the spec's open
    /// question "whether 4xx should all move to FAILED or only a subset".
    pub fn from_status(status: u16, body_excerpt: &str) -> Self {
        if (200..300).contains(&status) {
            return UploadOutcome::Success;
        }
        if status == 408 || status == 429 || status >= 500 {
            return UploadOutcome::Transient(TransientError(format!(
                "HTTP {status}: {body_excerpt}"
            )));
        }
        UploadOutcome::Permanent(PermanentError(format!("HTTP {status}: {body_excerpt}")))
    }

    pub fn transient(message: impl Into<String>) -> Self {
        UploadOutcome::Transient(TransientError(message.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_transient(o: &UploadOutcome) -> bool {
        matches!(o, UploadOutcome::Transient(_))
    }

    #[test]
    fn classifies_2xx_as_success() {
        assert!(matches!(
            UploadOutcome::from_status(200, ""),
            UploadOutcome::Success
        ));
        assert!(matches!(
            UploadOutcome::from_status(201, ""),
            UploadOutcome::Success
        ));
    }

    #[test]
    fn classifies_408_and_429_as_transient() {
        assert!(is_transient(&UploadOutcome::from_status(408, "")));
        assert!(is_transient(&UploadOutcome::from_status(429, "")));
    }

    #[test]
    fn classifies_5xx_as_transient() {
        assert!(is_transient(&UploadOutcome::from_status(500, "")));
        assert!(is_transient(&UploadOutcome::from_status(503, "")));
    }

    #[test]
    fn classifies_other_4xx_as_permanent() {
        assert!(matches!(
            UploadOutcome::from_status(400, ""),
            UploadOutcome::Permanent(_)
        ));
        assert!(matches!(
            UploadOutcome::from_status(404, ""),
            UploadOutcome::Permanent(_)
        ));
    }
}

//! Outcome model: the two-way classification of a finished task.

/// Result classification for one task after the backend returned or the
/// retry budget was exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure { reason: String },
}

impl Outcome {
    pub fn success() -> Self {
        Outcome::Success
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Outcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Error text for reporting, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Failure { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_its_reason() {
        let o = Outcome::failure("timeout after 3 attempts");
        assert!(!o.is_success());
        assert_eq!(o.reason(), Some("timeout after 3 attempts"));
    }

    #[test]
    fn success_has_no_reason() {
        assert!(Outcome::success().is_success());
        assert_eq!(Outcome::success().reason(), None);
    }
}

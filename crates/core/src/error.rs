use thiserror::Error;

/// A session (or one of its parts) failed validation.
///
/// Collects every violation found rather than stopping at the first one,
/// so callers get the complete list in one round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .violations.join("; "))]
pub struct ValidationError {
    violations: Vec<String>,
}

impl ValidationError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { violations: vec![message.into()] }
    }

    /// Builds an error from accumulated violations, or `None` when there are none.
    #[must_use]
    pub fn from_violations(violations: Vec<String>) -> Option<Self> {
        (!violations.is_empty()).then_some(Self { violations })
    }

    #[must_use]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_all_violations() {
        let err = ValidationError::from_violations(vec!["first".to_owned(), "second".to_owned()])
            .unwrap();
        assert_eq!(err.to_string(), "first; second");
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn no_violations_means_no_error() {
        assert!(ValidationError::from_violations(Vec::new()).is_none());
    }
}

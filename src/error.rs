//! Error taxonomy for migration outcomes
//!
//! Precondition errors abort before any mutation. Unsupported-shape errors
//! abort a single class while the rest of the file and batch continue.
//! External failures are fatal for one module's build-script run only.

use std::fmt;

#[derive(Debug, Clone)]
pub enum MigrationError {
    /// Missing project/module/package selection, nothing mutated yet
    Precondition(String),
    /// A class the rule set cannot rewrite safely (no onCreate, more
    /// layouts than bindings, duplicate ids in one layout)
    UnsupportedShape(String),
    /// Build-script or filesystem failure outside the core rewrite
    External(String),
    /// User interrupted the batch
    Cancelled,
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::Precondition(msg) => write!(f, "precondition failed: {}", msg),
            MigrationError::UnsupportedShape(msg) => write!(f, "unsupported class shape: {}", msg),
            MigrationError::External(msg) => write!(f, "external failure: {}", msg),
            MigrationError::Cancelled => write!(f, "process cancelled"),
        }
    }
}

impl std::error::Error for MigrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = MigrationError::UnsupportedShape("no onCreate".to_string());
        assert_eq!(err.to_string(), "unsupported class shape: no onCreate");
        assert_eq!(MigrationError::Cancelled.to_string(), "process cancelled");
    }
}

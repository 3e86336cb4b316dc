//! Error conversion helpers for file-backed operations
//!
//! Attaches the file path to any error raised while loading trees, scripts or
//! config files.

use std::error::Error;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting any `Result` to `ApplicationResult` with path context.
pub trait PathContextExt<T> {
    /// Add path context to an error.
    ///
    /// # Example
    /// ```ignore
    /// std::fs::read_to_string(&tree_file)
    ///     .with_path_context("read tree", &tree_file)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T, E> PathContextExt<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn given_domain_error_when_adding_context_then_keeps_source() {
        let result: Result<(), DomainError> = Err(DomainError::InvalidTree {
            message: "node without tag".into(),
        });
        let err = result
            .with_path_context("load tree", Path::new("page.toml"))
            .unwrap_err();

        assert_eq!(err.to_string(), "operation failed: load tree: page.toml");
        assert!(err.source().is_some());
    }
}

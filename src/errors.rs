//! Typed errors raised by step validation, execution, and transpilation.
//!
//! Uses typed variants rather than string parsing so callers (CLI, bindings)
//! can match on the failure kind and surface actionable messages.

use std::io;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    /// A column with this header already exists on the target sheet.
    #[error("a column named {0:?} already exists")]
    ColumnExists(String),

    /// A referenced column id does not exist on the target sheet.
    #[error("no column with id {column_id:?} in {df_name}")]
    NoColumn { column_id: String, df_name: String },

    /// A referenced sheet index is out of range.
    #[error("no sheet at index {0}")]
    NoSheet(usize),

    /// A parameter failed validation before execution.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Import target does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Import target is a directory, not a file.
    #[error("path is a directory, not a file: {}", .0.display())]
    IsDirectory(PathBuf),

    /// Unknown step type, or a persisted step with an unsupported version.
    #[error("unsupported step: {step_type} (version {step_version})")]
    UnsupportedStep {
        step_type: String,
        step_version: u32,
    },

    /// A mandatory code chunk could not be generated consistently.
    /// Fatal to the owning step.
    #[error("transpile invariant violated: {0}")]
    TranspileInvariant(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StepError {
    /// True for errors raised by parameter validation, before any state
    /// was built. These leave the step history untouched.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            StepError::ColumnExists(_)
                | StepError::NoColumn { .. }
                | StepError::NoSheet(_)
                | StepError::InvalidParameter(_)
        )
    }

    /// True for filesystem/resource failures surfaced from import probing.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            StepError::FileNotFound(_) | StepError::IsDirectory(_)
        )
    }

    /// User-facing message, matched on the error kind rather than parsed
    /// from display strings.
    pub fn user_message(&self) -> String {
        match self {
            StepError::ColumnExists(header) => format!(
                "A column already exists with the name {:?}. Try picking a different name.",
                header
            ),
            StepError::NoColumn { column_id, df_name } => format!(
                "The column {:?} does not exist in {}. Check spelling and that the column exists.",
                column_id, df_name
            ),
            StepError::NoSheet(index) => {
                format!("There is no sheet at index {}.", index)
            }
            StepError::InvalidParameter(msg) => msg.clone(),
            StepError::FileNotFound(path) => {
                format!("The file {} does not exist.", path.display())
            }
            StepError::IsDirectory(path) => format!(
                "{} is a directory. Pick a file to import instead.",
                path.display()
            ),
            StepError::UnsupportedStep {
                step_type,
                step_version,
            } => format!(
                "The step {:?} (version {}) is not supported by this version.",
                step_type, step_version
            ),
            StepError::TranspileInvariant(msg) => {
                format!("Could not generate code for this step: {}", msg)
            }
            StepError::Polars(err) => user_message_from_polars(err),
            StepError::Io(err) => user_message_from_io(err),
        }
    }
}

pub type StepResult<T> = Result<T, StepError>;

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check spelling and that the column exists.",
            msg
        ),
        PE::Duplicate(msg) => format!("Duplicate column in result: {}", msg),
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::ShapeMismatch(msg) => format!("Row shape mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::OutOfBounds(msg) => format!("Index or row out of bounds: {}", msg),
        PE::ComputeError(msg) => msg.to_string(),
        PE::IO { error, .. } => user_message_from_io(error.as_ref()),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error) -> String {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_exists_message() {
        let err = StepError::ColumnExists("Height".to_string());
        assert!(err.user_message().contains("Height"));
        assert!(err.is_validation_error());
        assert!(!err.is_resource_error());
    }

    #[test]
    fn test_resource_errors_classified() {
        let err = StepError::FileNotFound(PathBuf::from("/tmp/missing.csv"));
        assert!(err.is_resource_error());
        assert!(!err.is_validation_error());
        assert!(err.user_message().contains("missing.csv"));

        let err = StepError::IsDirectory(PathBuf::from("/tmp"));
        assert!(err.is_resource_error());
        assert!(err.user_message().contains("directory"));
    }

    #[test]
    fn test_unsupported_step_message() {
        let err = StepError::UnsupportedStep {
            step_type: "telepathy".to_string(),
            step_version: 9,
        };
        let msg = err.user_message();
        assert!(msg.contains("telepathy"));
        assert!(msg.contains('9'));
    }

    #[test]
    fn test_io_not_found_message() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err);
        assert!(msg.contains("not found"), "got: {}", msg);
    }
}

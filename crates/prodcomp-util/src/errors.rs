use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all prodcomp operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ComposeError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed product declaration.
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your ProductCompose.toml for syntax errors"))]
    Manifest { message: String },

    /// A package set references itself, directly or through other sets.
    #[error("Configuration error: cyclic definition of package set '{name}'")]
    CyclicSet { name: String },

    /// The same package set name is declared twice for one architecture/flavor.
    #[error("Configuration error: package set '{name}' is already defined")]
    #[diagnostic(help("Restrict the duplicate declarations with disjoint `flavors` or `architectures`"))]
    DuplicateSet { name: String },

    /// A package set name is referenced but never declared.
    #[error("Configuration error: package set '{name}' does not exist")]
    UnknownSet { name: String },

    /// A set operand could not be parsed (`name [architecture=A] [flavor=F]`).
    #[error("Configuration error: invalid package set reference '{reference}'")]
    InvalidSetReference { reference: String },

    /// A sub/intersect result cannot be expressed as a single version range.
    #[error("Configuration error: unsupported {operation} operation: {lhs}, {rhs}")]
    #[diagnostic(help("Split the package set so each operand describes one contiguous version range"))]
    Unrepresentable {
        operation: String,
        lhs: String,
        rhs: String,
    },

    /// One operand pins a release while the other wildcards it at the same version.
    #[error("Configuration error: ambiguous {operation} operation: {lhs}, {rhs}")]
    #[diagnostic(help("Either specify the release on both selectors or on neither"))]
    Ambiguous {
        operation: String,
        lhs: String,
        rhs: String,
    },

    /// A package selector string could not be parsed.
    #[error("Configuration error: invalid package selector '{spec}'")]
    InvalidSelector { spec: String },

    /// The synthetic `__all__` set needs a scanned pool.
    #[error("Configuration error: need a package pool to create the {set} package set")]
    MissingPool { set: String },

    /// A package header could not be read.
    #[error("Header error in {path}: {message}")]
    Header { path: String, message: String },

    /// An update notice document is malformed.
    #[error("Update notice error in {path}: {message}")]
    UpdateInfo { path: String, message: String },

    /// Selection found packages missing and the build policy forbids it.
    #[error("Abort due to {count} missing package(s)")]
    #[diagnostic(help("Add `ignore_missing_packages` to build_options to continue anyway"))]
    MissingPackages { count: usize },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl ComposeError {
    /// Whether this error is a fatal validation failure of the product declaration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ComposeError::CyclicSet { .. }
                | ComposeError::DuplicateSet { .. }
                | ComposeError::UnknownSet { .. }
                | ComposeError::InvalidSetReference { .. }
                | ComposeError::Unrepresentable { .. }
                | ComposeError::Ambiguous { .. }
                | ComposeError::InvalidSelector { .. }
                | ComposeError::MissingPool { .. }
        )
    }
}

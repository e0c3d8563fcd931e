//! Errors raised while describing targets and generating build files.
//!
//! Every variant aborts generation at the point of misuse. Nothing is written
//! to disk once one of these has been returned.

use std::path::PathBuf;

/// Error type for target description and generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An attribute was given a shape it cannot be normalized from
    InvalidArgumentType { attribute: String, found: String },
    /// Language standard outside {11, 14, 17, 20, "C++03"}
    InvalidLanguageStandard(String),
    /// Optimization level outside 0..=3
    InvalidOptimizationLevel(i64),
    /// Target kind string not recognized
    UnknownTargetType(String),
    /// Target lacks a name, kind or sources
    MissingRequiredAttribute { target: String, attribute: String },
    /// Path does not resolve to a build description
    DescriptionNotFound(PathBuf),
    /// Description parsed but declares no project
    NoProjectDeclared(PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgumentType { attribute, found } => {
                write!(f, "Invalid type {} for {}", found, attribute)
            }
            Error::InvalidLanguageStandard(version) => {
                write!(
                    f,
                    "Invalid C++ standard {} (expected 11, 14, 17, 20 or \"C++03\")",
                    version
                )
            }
            Error::InvalidOptimizationLevel(level) => {
                write!(f, "Optimization level must be between 0-3, got {}", level)
            }
            Error::UnknownTargetType(kind) => write!(f, "Unknown target type: {}", kind),
            Error::MissingRequiredAttribute { target, attribute } => {
                if target.is_empty() {
                    write!(f, "Target is missing required attribute '{}'", attribute)
                } else {
                    write!(
                        f,
                        "Target '{}' is missing required attribute '{}'",
                        target, attribute
                    )
                }
            }
            Error::DescriptionNotFound(path) => {
                write!(f, "Build description not found: {}", path.display())
            }
            Error::NoProjectDeclared(path) => {
                write!(f, "No [project] declared in {}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;

//! # pmake - C/C++ build file generator
//!
//! pmake reads a declarative build description (`pmake.toml`), or takes a
//! project assembled through the builder API, and emits either a `Makefile`
//! or a `CMakeLists.txt`. It can then drive the configure, build and install
//! phases of the generated project.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write the build file for the description in the current directory
//! pmake
//!
//! # Write, configure and build in release mode
//! pmake -w -c -b --mode release
//! ```
//!
//! ## Module Organization
//!
//! - [`target`] - Build targets and their attributes
//! - [`project`] - Target ordering, package metadata and atomic output
//! - [`generate`] - `Makefile` and `CMakeLists.txt` emitters
//! - [`description`] - `pmake.toml` loading
//! - [`toolchain`] - Configure, build and install orchestration

/// `pmake.toml` parsing and subdirectory loading.
pub mod description;

/// Library error type.
pub mod error;

/// Build file generators.
pub mod generate;

/// Host and output platform naming.
pub mod platform;

/// Projects and finalization.
pub mod project;

/// Build targets and compile step fan-out.
pub mod target;

/// External tool lifecycle.
pub mod toolchain;

pub use error::Error;

//! Build file generators.
//!
//! - [`makefile`] - dependency rules that invoke the compiler and archiver directly
//! - [`cmake`] - a `CMakeLists.txt` that delegates compilation and packages to CMake/Conan
//!
//! Both walk the same target graph and both are deterministic: rendering an
//! unchanged project twice yields identical text.

pub mod cmake;
pub mod makefile;

use crate::error::Result;
use crate::project::Project;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Which backend turns the target graph into a build file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
    /// Direct dependency-rule file (`Makefile`)
    #[value(name = "make")]
    Make,
    /// Project file for the external configuration tool (`CMakeLists.txt`)
    #[default]
    #[value(name = "cmake")]
    CMake,
}

impl Generator {
    pub fn file_name(&self) -> &'static str {
        match self {
            Generator::Make => "Makefile",
            Generator::CMake => "CMakeLists.txt",
        }
    }

    pub fn render(&self, project: &Project) -> Result<String> {
        match self {
            Generator::Make => makefile::render(project),
            Generator::CMake => cmake::render(project),
        }
    }
}

impl FromStr for Generator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "make" => Ok(Generator::Make),
            "cmake" => Ok(Generator::CMake),
            other => Err(format!("unknown generator '{}' (expected make or cmake)", other)),
        }
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generator::Make => write!(f, "make"),
            Generator::CMake => write!(f, "cmake"),
        }
    }
}

//! Build targets and their attributes.
//!
//! A [`Target`] is one user-declared build unit. Its kind is a tagged variant
//! ([`TargetKind`]) so both generators can match exhaustively on it instead of
//! checking types at runtime.
//!
//! ```rust
//! use pmake::target::Target;
//!
//! let mut app = Target::executable("app");
//! app.add_sources(["main.cpp", "util.cpp"])
//!     .add_includes("include")
//!     .add_define("NDEBUG", None);
//! app.set_standard(17).unwrap();
//! ```

mod attrs;
mod fanout;

pub use attrs::{AttrList, Defines};
pub(crate) use attrs::scalar_to_string;
pub use fanout::{CompileStep, OBJECT_SUFFIX, object_name};

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of a build target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Object,
    Executable,
    SharedLibrary,
    StaticLibrary,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Object => "object",
            TargetKind::Executable => "executable",
            TargetKind::SharedLibrary => "shared_library",
            TargetKind::StaticLibrary => "static_library",
        }
    }

    /// Leaf targets compile directly and are never fanned out
    pub fn is_leaf(&self) -> bool {
        matches!(self, TargetKind::Object)
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "object" => Ok(TargetKind::Object),
            "executable" => Ok(TargetKind::Executable),
            "shared_library" => Ok(TargetKind::SharedLibrary),
            "static_library" => Ok(TargetKind::StaticLibrary),
            other => Err(Error::UnknownTargetType(other.to_string())),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted C++ language standards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standard {
    Cpp03,
    Cpp11,
    Cpp14,
    Cpp17,
    Cpp20,
}

impl Standard {
    pub fn flag(&self) -> &'static str {
        match self {
            Standard::Cpp03 => "-std=c++03",
            Standard::Cpp11 => "-std=c++11",
            Standard::Cpp14 => "-std=c++14",
            Standard::Cpp17 => "-std=c++17",
            Standard::Cpp20 => "-std=c++20",
        }
    }
}

impl TryFrom<i64> for Standard {
    type Error = Error;

    fn try_from(version: i64) -> Result<Self> {
        match version {
            11 => Ok(Standard::Cpp11),
            14 => Ok(Standard::Cpp14),
            17 => Ok(Standard::Cpp17),
            20 => Ok(Standard::Cpp20),
            other => Err(Error::InvalidLanguageStandard(other.to_string())),
        }
    }
}

impl TryFrom<i32> for Standard {
    type Error = Error;

    fn try_from(version: i32) -> Result<Self> {
        Standard::try_from(i64::from(version))
    }
}

impl TryFrom<&str> for Standard {
    type Error = Error;

    fn try_from(version: &str) -> Result<Self> {
        match version {
            "C++03" => Ok(Standard::Cpp03),
            other => other
                .parse::<i64>()
                .map_err(|_| Error::InvalidLanguageStandard(other.to_string()))
                .and_then(Standard::try_from),
        }
    }
}

/// Shell command run before or after a target is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub command: String,
    pub directory: String,
}

impl Hook {
    pub fn new(command: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            directory: directory.into(),
        }
    }

    /// `cd <directory> && <command>`
    pub fn render(&self) -> String {
        format!("cd {} && {}", self.directory, self.command)
    }
}

/// A user-declared build unit
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub(crate) kind: TargetKind,
    pub(crate) name: String,
    pub(crate) sources: Vec<String>,
    pub(crate) includes: Vec<String>,
    pub(crate) libraries: Vec<String>,
    pub(crate) options: Vec<String>,
    pub(crate) library_paths: Vec<String>,
    pub(crate) defines: Defines,
    pub(crate) properties: BTreeMap<String, String>,
    pub(crate) install_path: Option<String>,
    pub(crate) before_build: Option<Hook>,
    pub(crate) after_build: Option<Hook>,
    pub(crate) compiler: Option<String>,
    pub(crate) archiver: Option<String>,
}

impl Target {
    pub fn new(kind: TargetKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            sources: Vec::new(),
            includes: Vec::new(),
            libraries: Vec::new(),
            options: Vec::new(),
            library_paths: Vec::new(),
            defines: Defines::new(),
            properties: BTreeMap::new(),
            install_path: None,
            before_build: None,
            after_build: None,
            compiler: None,
            archiver: None,
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(TargetKind::Object, name)
    }

    pub fn executable(name: impl Into<String>) -> Self {
        Self::new(TargetKind::Executable, name)
    }

    pub fn shared_library(name: impl Into<String>) -> Self {
        Self::new(TargetKind::SharedLibrary, name)
    }

    pub fn static_library(name: impl Into<String>) -> Self {
        Self::new(TargetKind::StaticLibrary, name)
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn library_paths(&self) -> &[String] {
        &self.library_paths
    }

    pub fn defines(&self) -> &Defines {
        &self.defines
    }

    pub fn install_path(&self) -> Option<&str> {
        self.install_path.as_deref()
    }

    /// Number of progress steps this target accounts for: one per source plus itself
    pub fn num_steps(&self) -> usize {
        self.sources.len() + 1
    }

    pub fn add_sources(&mut self, sources: impl Into<AttrList>) -> &mut Self {
        self.sources.extend(sources.into().into_vec());
        self
    }

    pub fn add_includes(&mut self, includes: impl Into<AttrList>) -> &mut Self {
        self.includes.extend(includes.into().into_vec());
        self
    }

    pub fn add_libraries(&mut self, libraries: impl Into<AttrList>) -> &mut Self {
        self.libraries.extend(libraries.into().into_vec());
        self
    }

    pub fn add_options(&mut self, options: impl Into<AttrList>) -> &mut Self {
        self.options.extend(options.into().into_vec());
        self
    }

    pub fn add_library_paths(&mut self, paths: impl Into<AttrList>) -> &mut Self {
        self.library_paths.extend(paths.into().into_vec());
        self
    }

    pub fn add_define(&mut self, name: impl Into<String>, value: Option<&str>) -> &mut Self {
        self.defines.insert(name, value.map(str::to_string));
        self
    }

    /// Merge a whole set of defines
    pub fn add_defines(&mut self, defines: Defines) -> &mut Self {
        self.defines.merge(defines);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn set_standard<S>(&mut self, standard: S) -> Result<&mut Self>
    where
        S: TryInto<Standard, Error = Error>,
    {
        let standard = standard.try_into()?;
        self.options.push(standard.flag().to_string());
        Ok(self)
    }

    pub fn set_optimization_level(&mut self, level: i64) -> Result<&mut Self> {
        if !(0..=3).contains(&level) {
            return Err(Error::InvalidOptimizationLevel(level));
        }
        self.options.push(format!("-O{}", level));
        Ok(self)
    }

    pub fn add_debug_symbols(&mut self) -> &mut Self {
        self.options.push("-g".to_string());
        self
    }

    pub fn set_compiler(&mut self, compiler: impl Into<String>) -> &mut Self {
        self.compiler = Some(compiler.into());
        self
    }

    pub fn set_archiver(&mut self, archiver: impl Into<String>) -> &mut Self {
        self.archiver = Some(archiver.into());
        self
    }

    pub fn before_build(&mut self, command: impl Into<String>, directory: &str) -> &mut Self {
        self.before_build = Some(Hook::new(command, directory));
        self
    }

    pub fn after_build(&mut self, command: impl Into<String>, directory: &str) -> &mut Self {
        self.after_build = Some(Hook::new(command, directory));
        self
    }

    /// Copy the built output to `path` after linking. Last call wins.
    pub fn install(&mut self, path: impl Into<String>) -> &mut Self {
        self.install_path = Some(path.into());
        self
    }

    /// Check the attributes every generator needs: a name and at least one source
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(self.missing("name"));
        }
        if self.sources.is_empty() {
            return Err(self.missing("sources"));
        }
        Ok(())
    }

    fn missing(&self, attribute: &str) -> Error {
        Error::MissingRequiredAttribute {
            target: self.name.clone(),
            attribute: attribute.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(
            "shared_library".parse::<TargetKind>().unwrap(),
            TargetKind::SharedLibrary
        );
        assert_eq!(
            "dll".parse::<TargetKind>().unwrap_err(),
            Error::UnknownTargetType("dll".into())
        );
    }

    #[test]
    fn test_standard_accepts_fixed_set() {
        let mut t = Target::executable("app");
        t.set_standard(14).unwrap();
        t.set_standard("C++03").unwrap();
        t.set_standard("20").unwrap();
        assert_eq!(t.options(), ["-std=c++14", "-std=c++03", "-std=c++20"]);
    }

    #[test]
    fn test_standard_rejects_others() {
        let mut t = Target::executable("app");
        assert_eq!(
            t.set_standard(3).unwrap_err(),
            Error::InvalidLanguageStandard("3".into())
        );
        assert_eq!(
            t.set_standard("c++14").unwrap_err(),
            Error::InvalidLanguageStandard("c++14".into())
        );
        assert!(t.options().is_empty());
    }

    #[test]
    fn test_optimization_level_bounds() {
        let mut t = Target::executable("app");
        t.set_optimization_level(0).unwrap();
        t.set_optimization_level(3).unwrap();
        assert_eq!(t.options(), ["-O0", "-O3"]);
        assert_eq!(
            t.set_optimization_level(5).unwrap_err(),
            Error::InvalidOptimizationLevel(5)
        );
        assert_eq!(
            t.set_optimization_level(-1).unwrap_err(),
            Error::InvalidOptimizationLevel(-1)
        );
    }

    #[test]
    fn test_install_last_write_wins() {
        let mut t = Target::executable("app");
        t.install("/a").install("/b");
        assert_eq!(t.install_path(), Some("/b"));
    }

    #[test]
    fn test_mutators_append() {
        let mut t = Target::static_library("core");
        t.add_sources("a.cpp").add_sources(vec!["b.cpp", "c.cpp"]);
        t.add_libraries("m").add_libraries(["pthread"]);
        assert_eq!(t.sources(), ["a.cpp", "b.cpp", "c.cpp"]);
        assert_eq!(t.libraries(), ["m", "pthread"]);
        assert_eq!(t.num_steps(), 4);
    }

    #[test]
    fn test_validate() {
        let t = Target::executable("app");
        assert_eq!(
            t.validate().unwrap_err(),
            Error::MissingRequiredAttribute {
                target: "app".into(),
                attribute: "sources".into()
            }
        );

        let mut unnamed = Target::executable("");
        unnamed.add_sources("main.cpp");
        assert!(matches!(
            unnamed.validate(),
            Err(Error::MissingRequiredAttribute { attribute, .. }) if attribute == "name"
        ));
    }

    #[test]
    fn test_hook_render() {
        assert_eq!(Hook::new("./app", ".").render(), "cd . && ./app");
    }
}

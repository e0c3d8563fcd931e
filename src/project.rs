//! Projects: ordered targets plus the package metadata the generators need.
//!
//! A project is written out by an explicit [`Project::finalize`] call. It
//! consumes the project, so a project can never be finalized twice, and it
//! renders every file in memory before touching the filesystem.

use crate::description;
use crate::generate::Generator;
use crate::platform::Platform;
use crate::target::Target;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Values threaded explicitly into loading and generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Build mode, e.g. `debug` or `release`
    pub mode: String,
    /// Platform used for output naming
    pub platform: Platform,
    /// Echo generated text
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: "debug".to_string(),
            platform: Platform::host(),
            verbose: false,
        }
    }
}

/// Raw shell command run in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomTarget {
    pub name: String,
    pub command: String,
    pub directory: String,
}

impl CustomTarget {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        directory: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            directory: directory.into(),
        }
    }
}

/// Package lookup in the declaration backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindPackage {
    pub name: String,
    pub version: String,
    pub required: bool,
}

/// A sub-project forwarded to by name and directory
#[derive(Debug, Clone)]
pub struct NestedProject {
    pub name: String,
    pub directory: String,
    pub(crate) project: Project,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub(crate) name: String,
    pub(crate) directory: PathBuf,
    pub(crate) settings: Settings,
    pub(crate) generator: Generator,
    pub(crate) targets: Vec<Target>,
    pub(crate) custom_targets: Vec<CustomTarget>,
    pub(crate) nested: Vec<NestedProject>,
    pub(crate) variables: Vec<(String, String)>,
    pub(crate) requires: Vec<(String, String)>,
    pub(crate) prefixes: Vec<String>,
    pub(crate) finds: Vec<FindPackage>,
    pub(crate) cmake_version: String,
    pub(crate) rpath: Option<String>,
    pub(crate) c_compiler: Option<String>,
    pub(crate) cxx_compiler: Option<String>,
}

impl Project {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            settings,
            generator: Generator::default(),
            targets: Vec::new(),
            custom_targets: Vec::new(),
            nested: Vec::new(),
            variables: Vec::new(),
            requires: Vec::new(),
            prefixes: Vec::new(),
            finds: Vec::new(),
            cmake_version: "3.10".to_string(),
            rpath: None,
            c_compiler: None,
            cxx_compiler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn generator(&self) -> Generator {
        self.generator
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn custom_targets(&self) -> &[CustomTarget] {
        &self.custom_targets
    }

    pub fn nested(&self) -> &[NestedProject] {
        &self.nested
    }

    pub fn set_generator(&mut self, generator: Generator) -> &mut Self {
        self.generator = generator;
        self
    }

    /// Append a target. Names are unique: a target with an existing name replaces it in place.
    pub fn add(&mut self, target: Target) -> &mut Self {
        match self.targets.iter_mut().find(|t| t.name == target.name) {
            Some(existing) => {
                println!(
                    "   {} Target '{}' declared twice, keeping the last declaration",
                    "!".yellow(),
                    target.name
                );
                *existing = target;
            }
            None => self.targets.push(target),
        }
        self
    }

    /// Mutable access to an already added target
    pub fn target_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.name == name)
    }

    pub fn add_custom_target(&mut self, target: CustomTarget) -> &mut Self {
        self.custom_targets.push(target);
        self
    }

    /// Resolve `<directory>/pmake.toml` and register it as a nested project.
    ///
    /// Only the name and directory are used by the parent's own rules; the
    /// nested project's file is written alongside the parent's at finalize.
    pub fn add_subdirectory(&mut self, directory: &str) -> Result<&mut Self> {
        let child = description::load(&self.directory.join(directory), &self.settings)
            .with_context(|| format!("Failed to load subdirectory '{}'", directory))?;
        self.add_nested(directory, child);
        Ok(self)
    }

    pub(crate) fn add_nested(&mut self, directory: &str, child: Project) {
        let mut project = Project::new(
            child.name.clone(),
            self.directory.join(directory),
            child.settings.clone(),
        );
        project.targets = child.targets;
        project.custom_targets = child.custom_targets;
        project.nested = child.nested;
        project.variables = child.variables;
        project.requires = child.requires;
        project.prefixes = child.prefixes;
        project.finds = child.finds;
        project.cmake_version = child.cmake_version;
        project.rpath = child.rpath;
        project.c_compiler = child.c_compiler;
        project.cxx_compiler = child.cxx_compiler;

        self.nested.push(NestedProject {
            name: child.name,
            directory: directory.to_string(),
            project,
        });
    }

    /// Set a variable. Variables keep declaration order; setting one again updates it in place.
    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.variables.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.variables.push((key, value)),
        }
        self
    }

    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Require a package from the package manager. Requiring a name again updates its version.
    pub fn requires(&mut self, package: impl Into<String>, version: impl Into<String>) -> &mut Self {
        let package = package.into();
        let version = version.into();
        match self.requires.iter_mut().find(|(name, _)| *name == package) {
            Some(entry) => entry.1 = version,
            None => self.requires.push((package, version)),
        }
        self
    }

    /// Add an external dependency root to the package search prefix
    pub fn depends(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn find(
        &mut self,
        package: impl Into<String>,
        version: impl Into<String>,
        required: bool,
    ) -> &mut Self {
        let find = FindPackage {
            name: package.into(),
            version: version.into(),
            required,
        };
        match self.finds.iter_mut().find(|f| f.name == find.name) {
            Some(existing) => *existing = find,
            None => self.finds.push(find),
        }
        self
    }

    /// Select C and C++ compilers. Empty strings leave the current choice untouched.
    pub fn set_compiler(&mut self, c: &str, cpp: &str) -> &mut Self {
        if !c.is_empty() {
            self.c_compiler = Some(c.to_string());
        }
        if !cpp.is_empty() {
            self.cxx_compiler = Some(cpp.to_string());
        }
        self
    }

    pub fn set_cmake_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.cmake_version = version.into();
        self
    }

    pub fn set_rpath(&mut self, rpath: impl Into<String>) -> &mut Self {
        self.rpath = Some(rpath.into());
        self
    }

    /// Path of the file this project generates
    pub fn output_path(&self) -> PathBuf {
        self.directory.join(self.generator.file_name())
    }

    /// Render the generated file without writing anything
    pub fn render(&self) -> Result<String> {
        Ok(self.generator.render(self)?)
    }

    /// Render this project and every nested project, then write them all.
    ///
    /// Nothing is touched until every file has rendered. Each file is then
    /// written to a temporary sibling, and only once all of them are on disk
    /// are they renamed into place, nested projects first. The renames are
    /// not one transaction: if a later rename fails, files renamed before it
    /// stay updated.
    pub fn finalize(self) -> Result<PathBuf> {
        let generator = self.generator;
        let mut rendered = Vec::new();
        self.stage(generator, &mut rendered)?;

        let mut staged = Vec::with_capacity(rendered.len());
        for (path, text) in &rendered {
            if self.settings.verbose {
                println!("{}", text);
            }
            staged.push((path, write_temporary(path, text)?));
        }

        for (path, file) in staged {
            file.persist(path)
                .with_context(|| format!("Failed to replace {}", path.display()))?;
            println!("{} Wrote {}", "✓".green(), path.display());
        }

        Ok(self.directory.join(generator.file_name()))
    }

    fn stage(&self, generator: Generator, staged: &mut Vec<(PathBuf, String)>) -> Result<()> {
        for nested in &self.nested {
            nested.project.stage(generator, staged)?;
        }
        let text = generator.render(self)?;
        staged.push((self.directory.join(generator.file_name()), text));
        Ok(())
    }
}

/// Write `contents` to a synced temporary file next to `path`
fn write_temporary(path: &Path, contents: &str) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync {}", path.display()))?;
    Ok(file)
}

//! Build description parsing (`pmake.toml`).
//!
//! Descriptions are plain data. They are deserialized with serde, normalized
//! through the same setters as the builder API and turned into a [`Project`].
//! Nothing in a description is ever executed at load time.

use crate::error::Error;
use crate::generate::Generator;
use crate::project::{CustomTarget, Project, Settings};
use crate::target::{AttrList, Defines, Target, TargetKind, scalar_to_string};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DESCRIPTION_FILE: &str = "pmake.toml";

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Description {
    pub project: Option<ProjectSection>,
    #[serde(default)]
    pub targets: Vec<TargetSection>,
    #[serde(default)]
    pub custom_targets: Vec<CustomTargetSection>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectSection {
    pub name: String,
    pub generator: Option<Generator>,
    pub cmake_version: Option<String>,
    pub rpath: Option<String>,
    pub compiler: Option<CompilerSection>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub subdirectories: Vec<String>,
    /// Kept in document order; later `set()` lines may reference earlier ones
    #[serde(default)]
    pub variables: toml::Table,
    #[serde(default)]
    pub requires: toml::Table,
    #[serde(default)]
    pub find: Vec<FindSection>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct CompilerSection {
    #[serde(default)]
    pub c: String,
    #[serde(default)]
    pub cpp: String,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct FindSection {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// One `[[targets]]` entry. Profile overlays reuse the same shape minus identity.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetSection {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sources: Option<toml::Value>,
    pub includes: Option<toml::Value>,
    pub libraries: Option<toml::Value>,
    pub options: Option<toml::Value>,
    pub library_paths: Option<toml::Value>,
    pub defines: Option<toml::Value>,
    pub standard: Option<toml::Value>,
    pub optimization: Option<i64>,
    pub debug_symbols: Option<bool>,
    pub install: Option<String>,
    pub before_build: Option<HookSection>,
    pub after_build: Option<HookSection>,
    pub compiler: Option<String>,
    pub archiver: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub profile: BTreeMap<String, TargetSection>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum HookSection {
    Command(String),
    Full {
        command: String,
        #[serde(default = "default_directory")]
        directory: String,
    },
}

fn default_directory() -> String {
    ".".to_string()
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct CustomTargetSection {
    pub name: String,
    pub command: String,
    #[serde(default = "default_directory")]
    pub directory: String,
}

/// Resolve a path to a description file: a file as is, a directory to `<dir>/pmake.toml`.
pub fn resolve_path(path: &Path) -> Result<PathBuf, Error> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.is_dir() {
        let candidate = path.join(DESCRIPTION_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        return Err(Error::DescriptionNotFound(candidate));
    }
    Err(Error::DescriptionNotFound(path.to_path_buf()))
}

/// Load a description and every nested subdirectory it declares
pub fn load(path: &Path, settings: &Settings) -> Result<Project> {
    load_nested(path, settings, &mut Vec::new())
}

fn load_nested(path: &Path, settings: &Settings, stack: &mut Vec<PathBuf>) -> Result<Project> {
    let file = resolve_path(path)?;
    let canonical = file.canonicalize().unwrap_or_else(|_| file.clone());
    if stack.contains(&canonical) {
        bail!(
            "Subdirectory cycle: {} includes itself",
            canonical.display()
        );
    }

    let text = fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let directory = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let (mut project, subdirectories) = parse(&text, &file, &directory, settings)?;

    stack.push(canonical);
    for sub in &subdirectories {
        let child = load_nested(&directory.join(sub), settings, stack)
            .with_context(|| format!("Failed to load subdirectory '{}'", sub))?;
        project.add_nested(sub, child);
    }
    stack.pop();

    Ok(project)
}

/// Parse description text into a project bound to `directory`.
///
/// Returns the declared subdirectories separately; resolving them needs the
/// filesystem and is done by [`load`].
pub fn parse(
    text: &str,
    origin: &Path,
    directory: &Path,
    settings: &Settings,
) -> Result<(Project, Vec<String>)> {
    let description: Description = toml::from_str(text)
        .with_context(|| format!("Failed to parse {}", origin.display()))?;
    let Some(section) = description.project else {
        return Err(Error::NoProjectDeclared(origin.to_path_buf()).into());
    };

    let mut project = Project::new(section.name.clone(), directory, settings.clone());
    if let Some(generator) = section.generator {
        project.set_generator(generator);
    }
    if let Some(version) = &section.cmake_version {
        project.set_cmake_version(version.clone());
    }
    if let Some(rpath) = &section.rpath {
        project.set_rpath(rpath.clone());
    }
    if let Some(compiler) = &section.compiler {
        project.set_compiler(&compiler.c, &compiler.cpp);
    }
    for (key, value) in &section.variables {
        project.set_variable(key.clone(), scalar_to_string(&format!("variables.{}", key), value)?);
    }
    for (package, version) in &section.requires {
        project.requires(
            package.clone(),
            scalar_to_string(&format!("requires.{}", package), version)?,
        );
    }
    for prefix in &section.depends {
        project.depends(prefix.clone());
    }
    for find in &section.find {
        project.find(find.name.clone(), find.version.clone(), find.required);
    }

    for entry in &description.targets {
        project.add(build_target(entry, settings)?);
    }
    for custom in description.custom_targets {
        project.add_custom_target(CustomTarget::new(
            custom.name,
            custom.command,
            custom.directory,
        ));
    }

    Ok((project, section.subdirectories))
}

fn build_target(section: &TargetSection, settings: &Settings) -> Result<Target> {
    let name = section.name.clone().unwrap_or_default();
    let kind: TargetKind = match &section.kind {
        Some(kind) => kind.parse()?,
        None => {
            return Err(Error::MissingRequiredAttribute {
                target: name,
                attribute: "type".to_string(),
            }
            .into());
        }
    };

    let mut target = Target::new(kind, name);
    apply(&mut target, section)?;

    if let Some(overlay) = section.profile.get(&settings.mode) {
        if overlay.name.is_some() || overlay.kind.is_some() || !overlay.profile.is_empty() {
            bail!(
                "Profile '{}' of target '{}' may not set name, type or nested profiles",
                settings.mode,
                target.name()
            );
        }
        apply(&mut target, overlay)?;
    }

    Ok(target)
}

fn apply(target: &mut Target, section: &TargetSection) -> Result<(), Error> {
    if let Some(standard) = &section.standard {
        match standard {
            toml::Value::Integer(version) => target.set_standard(*version)?,
            toml::Value::String(version) => target.set_standard(version.as_str())?,
            other => {
                return Err(Error::InvalidArgumentType {
                    attribute: "standard".to_string(),
                    found: other.type_str().to_string(),
                });
            }
        };
    }
    if let Some(level) = section.optimization {
        target.set_optimization_level(level)?;
    }
    if section.debug_symbols == Some(true) {
        target.add_debug_symbols();
    }

    if let Some(value) = &section.sources {
        target.add_sources(AttrList::from_value("sources", value)?);
    }
    if let Some(value) = &section.includes {
        target.add_includes(AttrList::from_value("includes", value)?);
    }
    if let Some(value) = &section.libraries {
        target.add_libraries(AttrList::from_value("libraries", value)?);
    }
    if let Some(value) = &section.options {
        target.add_options(AttrList::from_value("options", value)?);
    }
    if let Some(value) = &section.library_paths {
        target.add_library_paths(AttrList::from_value("library_paths", value)?);
    }
    if let Some(value) = &section.defines {
        target.add_defines(Defines::from_value(value)?);
    }

    if let Some(path) = &section.install {
        target.install(path.clone());
    }
    if let Some(hook) = &section.before_build {
        let (command, directory) = hook.parts();
        target.before_build(command, directory);
    }
    if let Some(hook) = &section.after_build {
        let (command, directory) = hook.parts();
        target.after_build(command, directory);
    }
    if let Some(compiler) = &section.compiler {
        target.set_compiler(compiler.clone());
    }
    if let Some(archiver) = &section.archiver {
        target.set_archiver(archiver.clone());
    }
    for (key, value) in &section.properties {
        target.set_property(key.clone(), scalar_to_string(&format!("properties.{}", key), value)?);
    }
    Ok(())
}

impl HookSection {
    fn parts(&self) -> (String, &str) {
        match self {
            HookSection::Command(command) => (command.clone(), "."),
            HookSection::Full { command, directory } => (command.clone(), directory.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    fn settings(mode: &str) -> Settings {
        Settings {
            mode: mode.to_string(),
            platform: Platform::from_name("Linux"),
            verbose: false,
        }
    }

    fn parse_str(text: &str) -> Result<Project> {
        parse(text, Path::new("pmake.toml"), Path::new("."), &settings("debug")).map(|(p, _)| p)
    }

    const HELLO: &str = r#"
[project]
name = "hello"
generator = "make"
compiler = { c = "gcc", cpp = "g++" }

[project.requires]
nlohmann_json = "3.11.2"

[[targets]]
name = "hello.out"
type = "executable"
sources = "hello.cpp"
includes = "."
options = "-Wall -Werror"
defines = "TEST"
library_paths = "/usr/lib"
standard = 14
debug_symbols = true
after_build = "./hello.out"
install = "/usr/local/bin"

[targets.profile.release]
optimization = 3

[[targets]]
name = "test"
type = "shared_library"
sources = ["test.cpp"]

[[custom_targets]]
name = "copy"
command = "cp hello hello.out"
"#;

    #[test]
    fn test_parse_hello() {
        let project = parse_str(HELLO).unwrap();
        assert_eq!(project.name(), "hello");
        assert_eq!(project.generator(), Generator::Make);
        assert_eq!(project.targets().len(), 2);

        let hello = &project.targets()[0];
        assert_eq!(hello.kind(), TargetKind::Executable);
        assert_eq!(hello.sources(), ["hello.cpp"]);
        assert_eq!(hello.options(), ["-std=c++14", "-g", "-Wall -Werror"]);
        assert_eq!(hello.defines().to_assignments(), ["TEST"]);
        assert_eq!(hello.install_path(), Some("/usr/local/bin"));
        assert_eq!(project.custom_targets()[0].directory, ".");
    }

    #[test]
    fn test_release_profile_overlay() {
        let (project, _) =
            parse(HELLO, Path::new("pmake.toml"), Path::new("."), &settings("release")).unwrap();
        assert_eq!(
            project.targets()[0].options(),
            ["-std=c++14", "-g", "-Wall -Werror", "-O3"]
        );
    }

    #[test]
    fn test_missing_project() {
        let err = parse_str("[[targets]]\nname = \"a\"\ntype = \"executable\"\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NoProjectDeclared(_))
        ));
    }

    #[test]
    fn test_unknown_target_type() {
        let err = parse_str("[project]\nname = \"p\"\n[[targets]]\nname = \"a\"\ntype = \"dll\"\n")
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::UnknownTargetType("dll".into()))
        );
    }

    #[test]
    fn test_missing_type() {
        let err = parse_str("[project]\nname = \"p\"\n[[targets]]\nname = \"a\"\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingRequiredAttribute { attribute, .. }) if attribute == "type"
        ));
    }

    #[test]
    fn test_invalid_shapes() {
        let err = parse_str(
            "[project]\nname = \"p\"\n[[targets]]\nname = \"a\"\ntype = \"executable\"\nsources = { main = 1 }\n",
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidArgumentType { attribute, .. }) if attribute == "sources"
        ));

        let err = parse_str(
            "[project]\nname = \"p\"\n[[targets]]\nname = \"a\"\ntype = \"executable\"\noptimization = 5\n",
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidOptimizationLevel(5))
        );

        let err = parse_str(
            "[project]\nname = \"p\"\n[[targets]]\nname = \"a\"\ntype = \"executable\"\nstandard = \"c++98\"\n",
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::InvalidLanguageStandard("c++98".into()))
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(parse_str("[project]\nname = \"p\"\nnmae = \"typo\"\n").is_err());
    }

    #[test]
    fn test_variables_and_requires_keep_document_order() {
        let project = parse_str(
            "[project]\nname = \"p\"\n\
             [project.variables]\nROOT = \"/opt\"\nLIB = \"${ROOT}/lib\"\nAPP = 1\n\
             [project.requires]\nzlib = \"1.3\"\nfmt = \"10.1.0\"\n",
        )
        .unwrap();
        let keys: Vec<&str> = project.variables.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["ROOT", "LIB", "APP"]);
        assert_eq!(project.variable("APP"), Some("1"));
        let packages: Vec<&str> = project.requires.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(packages, ["zlib", "fmt"]);
    }

    #[test]
    fn test_find_defaults_to_required() {
        let project =
            parse_str("[project]\nname = \"p\"\n[[project.find]]\nname = \"Threads\"\n").unwrap();
        assert!(project.finds[0].required);
        assert_eq!(project.finds[0].version, "");
    }

    #[test]
    fn test_resolve_missing_path() {
        let err = resolve_path(Path::new("/definitely/not/here")).unwrap_err();
        assert_eq!(
            err,
            Error::DescriptionNotFound(PathBuf::from("/definitely/not/here"))
        );
    }
}

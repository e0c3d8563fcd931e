//! Source fan-out: one compile step per source of a non-leaf target.

use super::{Defines, Target};

/// Suffix appended to a source path to name its object file
pub const OBJECT_SUFFIX: &str = ".o";

/// Object file name for a source. Already-suffixed paths are kept as is.
pub fn object_name(source: &str) -> String {
    if source.ends_with(OBJECT_SUFFIX) {
        source.to_string()
    } else {
        format!("{}{}", source, OBJECT_SUFFIX)
    }
}

/// Implicit per-source compilation step derived from a target.
///
/// Attributes are owned copies taken at fan-out time.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileStep {
    pub name: String,
    pub source: String,
    /// The source is already an object file and needs no compile rule
    pub prebuilt: bool,
    pub compiler: Option<String>,
    pub includes: Vec<String>,
    pub libraries: Vec<String>,
    pub options: Vec<String>,
    pub library_paths: Vec<String>,
    pub defines: Defines,
}

impl CompileStep {
    fn inherit(parent: &Target, source: &str, name: String) -> Self {
        Self {
            prebuilt: source == name,
            name,
            source: source.to_string(),
            compiler: parent.compiler.clone(),
            includes: parent.includes.clone(),
            libraries: parent.libraries.clone(),
            options: parent.options.clone(),
            library_paths: parent.library_paths.clone(),
            defines: parent.defines.clone(),
        }
    }

    /// Output path of this step
    pub fn output(&self) -> &str {
        &self.name
    }
}

impl Target {
    /// Expand the source list into compile steps.
    ///
    /// Recomputed on every call so attributes added after construction are
    /// always seen. Leaf (object) targets yield no steps.
    pub fn fan_out(&self) -> Vec<CompileStep> {
        if self.kind.is_leaf() {
            return Vec::new();
        }
        self.sources
            .iter()
            .map(|source| CompileStep::inherit(self, source, object_name(source)))
            .collect()
    }

    /// The single compile step of a standalone object target
    pub fn as_compile_step(&self) -> Option<CompileStep> {
        if !self.kind.is_leaf() {
            return None;
        }
        let source = self.sources.first()?;
        let mut step = CompileStep::inherit(self, source, object_name(&self.name));
        step.prebuilt = false;
        Some(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name() {
        assert_eq!(object_name("src/main.cpp"), "src/main.cpp.o");
        assert_eq!(object_name("vendor/lib.o"), "vendor/lib.o");
    }

    #[test]
    fn test_one_step_per_source() {
        let mut t = Target::executable("app");
        t.add_sources(["a.cpp", "b.cpp", "c.cpp"]);
        let steps = t.fan_out();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[1].name, "b.cpp.o");
        assert_eq!(steps[1].source, "b.cpp");
    }

    #[test]
    fn test_steps_are_independent_copies() {
        let mut t = Target::shared_library("core");
        t.add_sources("a.cpp").add_includes("inc").add_define("A", None);
        let steps = t.fan_out();

        t.add_includes("late").add_options("-Wall").add_define("B", Some("1"));

        assert_eq!(steps[0].includes, ["inc"]);
        assert!(steps[0].options.is_empty());
        assert_eq!(steps[0].defines.len(), 1);

        let again = t.fan_out();
        assert_eq!(again[0].includes, ["inc", "late"]);
        assert_eq!(again[0].options, ["-Wall"]);
    }

    #[test]
    fn test_prebuilt_object_is_not_resuffixed() {
        let mut t = Target::static_library("mix");
        t.add_sources(["a.cpp", "third_party/blob.o"]);
        let steps = t.fan_out();
        assert!(!steps[0].prebuilt);
        assert!(steps[1].prebuilt);
        assert_eq!(steps[1].output(), "third_party/blob.o");
    }

    #[test]
    fn test_leaf_target() {
        let mut obj = Target::object("util");
        obj.add_sources("util.cpp").add_options("-O2");
        assert!(obj.fan_out().is_empty());
        let step = obj.as_compile_step().unwrap();
        assert_eq!(step.name, "util.o");
        assert_eq!(step.source, "util.cpp");
        assert_eq!(step.options, ["-O2"]);
        assert!(Target::executable("x").as_compile_step().is_none());
    }
}

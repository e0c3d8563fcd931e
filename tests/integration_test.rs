//! Integration tests for description loading and build file generation
//!
//! These tests write descriptions into scratch directories, load them through
//! the public API and check the generated files on disk.

use pmake::Error;
use pmake::description;
use pmake::generate::Generator;
use pmake::platform::Platform;
use pmake::project::{Project, Settings};
use pmake::target::Target;
use std::fs;
use std::path::Path;

fn settings() -> Settings {
    Settings {
        platform: Platform::from_name("Linux"),
        ..Default::default()
    }
}

fn write(dir: &Path, file: &str, contents: &str) {
    if let Some(parent) = dir.join(file).parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(dir.join(file), contents).expect("Failed to write file");
}

const HELLO: &str = r#"
[project]
name = "hello"
generator = "make"

[[targets]]
name = "hello"
type = "executable"
sources = "hello.cpp"
"#;

#[test]
fn test_load_from_directory_and_write_makefile() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "pmake.toml", HELLO);

    let project = description::load(dir.path(), &settings()).unwrap();
    assert_eq!(project.directory(), dir.path());
    let path = project.finalize().unwrap();
    assert_eq!(path, dir.path().join("Makefile"));

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "all: all_targets\n\
         hello.cpp.o: hello.cpp\n\
         \t@echo '\x1b[1m\x1b[32m[50%] Building hello.cpp => hello.cpp.o\x1b[0m'\n\
         \t@c++ -c hello.cpp -o hello.cpp.o\n\
         hello: hello.cpp.o\n\
         \t@echo '\x1b[1m\x1b[32m[100%] Building hello\x1b[0m'\n\
         \t@c++ -o hello hello.cpp.o\n\
         all_targets: hello\n\
         \t@echo '\x1b[1m\x1b[32m[100%] Done\x1b[0m'\n\
         clean:\n\
         \t@rm -f hello.cpp.o hello\n"
    );
}

#[test]
fn test_nested_subdirectory_written() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "pmake.toml",
        r#"
[project]
name = "root"
subdirectories = ["lib"]

[[targets]]
name = "app"
type = "executable"
sources = "main.cpp"
"#,
    );
    write(
        dir.path(),
        "lib/pmake.toml",
        r#"
[project]
name = "util"

[[targets]]
name = "util"
type = "static_library"
sources = ["util.cpp"]
"#,
    );

    let project = description::load(dir.path(), &settings()).unwrap();
    assert_eq!(project.nested().len(), 1);
    assert_eq!(project.nested()[0].name, "util");
    project.finalize().unwrap();

    let root = fs::read_to_string(dir.path().join("CMakeLists.txt")).unwrap();
    assert!(root.contains("add_executable(app)"));
    assert!(root.ends_with("add_subdirectory(lib)\n"));

    let nested = fs::read_to_string(dir.path().join("lib").join("CMakeLists.txt")).unwrap();
    assert!(nested.contains("project(util)"));
    assert!(nested.contains("add_library(util STATIC)"));
}

#[test]
fn test_nested_make_forwarding() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "pmake.toml",
        "[project]\nname = \"root\"\ngenerator = \"make\"\nsubdirectories = [\"sub\"]\n",
    );
    write(
        dir.path(),
        "sub/pmake.toml",
        "[project]\nname = \"child\"\n[[targets]]\nname = \"c\"\ntype = \"executable\"\nsources = \"c.cpp\"\n",
    );

    description::load(dir.path(), &settings())
        .unwrap()
        .finalize()
        .unwrap();

    let root = fs::read_to_string(dir.path().join("Makefile")).unwrap();
    assert!(root.contains("child:\n\t@cd sub && make all\n.PHONY: child\n"));
    assert!(root.contains("all_targets: child\n"));
    assert!(root.ends_with("clean:\n\t@cd sub && make clean\n"));
    assert!(dir.path().join("sub").join("Makefile").is_file());
}

#[test]
fn test_subdirectory_cycle_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "pmake.toml",
        "[project]\nname = \"loop\"\nsubdirectories = [\".\"]\n",
    );
    let err = description::load(dir.path(), &settings()).unwrap_err();
    assert!(format!("{:#}", err).contains("cycle"));
}

#[test]
fn test_failed_generation_leaves_previous_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Makefile", "previous\n");

    let mut project = Project::new("broken", dir.path(), settings());
    project.set_generator(Generator::Make);
    let mut ok = Target::executable("ok");
    ok.add_sources("ok.cpp");
    project.add(ok).add(Target::static_library("empty"));

    assert!(project.finalize().is_err());
    assert_eq!(
        fs::read_to_string(dir.path().join("Makefile")).unwrap(),
        "previous\n"
    );
}

#[test]
fn test_nested_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "pmake.toml",
        "[project]\nname = \"root\"\nsubdirectories = [\"bad\"]\n[[targets]]\nname = \"a\"\ntype = \"executable\"\nsources = \"a.cpp\"\n",
    );
    write(
        dir.path(),
        "bad/pmake.toml",
        "[project]\nname = \"bad\"\n[[targets]]\nname = \"b\"\ntype = \"executable\"\n",
    );

    let project = description::load(dir.path(), &settings()).unwrap();
    assert!(project.finalize().is_err());
    assert!(!dir.path().join("CMakeLists.txt").exists());
    assert!(!dir.path().join("bad").join("CMakeLists.txt").exists());
}

#[test]
fn test_generation_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "pmake.toml",
        r#"
[project]
name = "det"

[project.variables]
ZED = "1"
ALPHA = 2

[project.requires]
zlib = "1.3"
fmt = "10.1.0"

[[targets]]
name = "app"
type = "executable"
sources = ["a.cpp", "b.cpp"]
defines = { DEBUG = true, LEVEL = "2" }
properties = { cxx_standard = 17, position_independent_code = "ON" }
"#,
    );

    let first = description::load(dir.path(), &settings())
        .unwrap()
        .render()
        .unwrap();
    let second = description::load(dir.path(), &settings())
        .unwrap()
        .render()
        .unwrap();
    assert_eq!(first, second);
    assert!(first.find("set(ZED \"1\")").unwrap() < first.find("set(ALPHA \"2\")").unwrap());
    assert!(first.find("REQUIRES zlib/1.3").unwrap() < first.find("REQUIRES fmt/10.1.0").unwrap());
}

#[test]
fn test_dependent_variables_keep_document_order() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "pmake.toml",
        r#"
[project]
name = "vars"

[project.variables]
ROOT = "/opt"
LIB = "${ROOT}/lib"
"#,
    );

    let path = description::load(dir.path(), &settings())
        .unwrap()
        .finalize()
        .unwrap();
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains("project(vars)\nset(ROOT \"/opt\")\nset(LIB \"${ROOT}/lib\")\n"));
}

#[test]
fn test_missing_description() {
    let dir = tempfile::tempdir().unwrap();
    let err = description::load(dir.path(), &settings()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<Error>(),
        Some(&Error::DescriptionNotFound(dir.path().join("pmake.toml")))
    );
}

#[test]
fn test_builder_matches_description() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "pmake.toml", HELLO);
    let loaded = description::load(dir.path(), &settings()).unwrap();

    let mut built = Project::new("hello", dir.path(), settings());
    built.set_generator(Generator::Make);
    let mut hello = Target::executable("hello");
    hello.add_sources("hello.cpp");
    built.add(hello);

    assert_eq!(loaded.render().unwrap(), built.render().unwrap());
}

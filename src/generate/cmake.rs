//! `CMakeLists.txt` declaration emitter.
//!
//! Order is fixed: header, variables, compilers, rpath, the Conan bootstrap,
//! package requirements, prefixes, package lookups, target blocks and finally
//! nested subdirectories.

use crate::error::{Error, Result};
use crate::project::Project;
use crate::target::{Target, TargetKind};
use std::fmt::Write;

const CONAN_BOOTSTRAP: &str = r#"
if(NOT EXISTS "${CMAKE_BINARY_DIR}/conan.cmake")
    message(STATUS "Downloading conan.cmake from https://github.com/conan-io/cmake-conan")
    file(DOWNLOAD "https://raw.githubusercontent.com/opendocument-app/OpenDocument.core/main/cmake/conan.cmake"
                    "${CMAKE_BINARY_DIR}/conan.cmake"
                    TLS_VERIFY ON)
endif()
include(${CMAKE_BINARY_DIR}/conan.cmake)
"#;

pub fn render(project: &Project) -> Result<String> {
    let mut out = String::new();

    let _ = writeln!(out, "cmake_minimum_required(VERSION {})", project.cmake_version);
    let _ = writeln!(out, "project({})", project.name);

    for (key, value) in &project.variables {
        let _ = writeln!(out, "set({} \"{}\")", key, value);
    }
    if let Some(c) = &project.c_compiler {
        let _ = writeln!(out, "set(CMAKE_C_COMPILER \"{}\")", c);
    }
    if let Some(cpp) = &project.cxx_compiler {
        let _ = writeln!(out, "set(CMAKE_CXX_COMPILER \"{}\")", cpp);
    }
    if let Some(rpath) = project.rpath.as_deref().filter(|r| !r.is_empty()) {
        let _ = writeln!(out, "set(CMAKE_INSTALL_RPATH \"{}\")", rpath);
    }

    out.push_str(CONAN_BOOTSTRAP);

    for (package, version) in &project.requires {
        let _ = writeln!(
            out,
            "conan_cmake_run(REQUIRES {} BASIC_SETUP CMAKE_TARGETS BUILD missing)",
            package_reference(package, version)
        );
    }

    for prefix in &project.prefixes {
        let _ = writeln!(out, "list(APPEND CMAKE_PREFIX_PATH {})", prefix);
    }

    for find in &project.finds {
        let mut parts = vec![find.name.as_str()];
        if !find.version.is_empty() {
            parts.push(&find.version);
        }
        if find.required {
            parts.push("REQUIRED");
        }
        let _ = writeln!(out, "find_package({})", parts.join(" "));
    }

    for target in &project.targets {
        out.push_str(&declaration(target)?);
    }

    for nested in &project.nested {
        let _ = writeln!(out, "add_subdirectory({})", nested.directory);
    }

    Ok(out)
}

/// `name/version`, or just `name` when no version was given
pub fn package_reference(package: &str, version: &str) -> String {
    if version.is_empty() {
        package.to_string()
    } else {
        format!("{}/{}", package, version)
    }
}

/// Declaration block for one target
pub fn declaration(target: &Target) -> Result<String> {
    if target.name.is_empty() {
        return Err(Error::MissingRequiredAttribute {
            target: String::new(),
            attribute: "name".to_string(),
        });
    }
    if target.sources.is_empty() {
        return Err(Error::MissingRequiredAttribute {
            target: target.name.clone(),
            attribute: "sources".to_string(),
        });
    }

    let name = &target.name;
    let mut out = match target.kind {
        TargetKind::Executable => format!("add_executable({})", name),
        TargetKind::SharedLibrary => format!("add_library({} SHARED)", name),
        TargetKind::StaticLibrary => format!("add_library({} STATIC)", name),
        TargetKind::Object => format!("add_library({} OBJECT)", name),
    };

    push_list(&mut out, "target_sources", name, &target.sources);
    push_list(&mut out, "target_include_directories", name, &target.includes);
    let _ = write!(
        out,
        "\ntarget_include_directories({} PUBLIC ${{CONAN_INCLUDE_DIRS}})",
        name
    );
    push_list(&mut out, "target_link_libraries", name, &target.libraries);
    let _ = write!(out, "\ntarget_link_libraries({} ${{CONAN_LIB_DIRS}})", name);
    push_list(&mut out, "target_compile_options", name, &target.options);
    push_list(&mut out, "target_link_directories", name, &target.library_paths);
    push_list(
        &mut out,
        "target_compile_definitions",
        name,
        &target.defines.to_assignments(),
    );
    for (key, value) in &target.properties {
        let _ = write!(
            out,
            "\nset_target_properties({} PROPERTIES {} {})",
            name,
            key.to_uppercase(),
            value
        );
    }
    if let Some(dest) = &target.install_path {
        let _ = write!(out, "\ninstall(TARGETS {} DESTINATION {})", name, dest);
    }
    out.push('\n');
    Ok(out)
}

fn push_list(out: &mut String, command: &str, name: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    let _ = write!(out, "\n{}({} PUBLIC {})", command, name, values.join(" "));
}

//! Makefile rule emitter.
//!
//! Targets are walked in insertion order. Every target contributes one rule per
//! source (its compile steps) followed by its own link/archive rule. Progress is
//! shown as a percentage of `sum(sources + 1)` over all targets.
//!
//! Compile rules are deduplicated by output path only. Two targets compiling the
//! same source with different flags share the first rule emitted for it.

use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::project::Project;
use crate::target::{CompileStep, Target, TargetKind, object_name};
use std::collections::HashSet;
use std::fmt::Write;

pub const DEFAULT_COMPILER: &str = "c++";
pub const DEFAULT_ARCHIVER: &str = "ar";

const HIGHLIGHT: &str = "\x1b[1m\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Final output path of a top-level target on `platform`
pub fn output_name(target: &Target, platform: &Platform) -> String {
    match target.kind {
        TargetKind::Object => object_name(&target.name),
        TargetKind::Executable => format!("{}{}", target.name, platform.executable_suffix()),
        TargetKind::SharedLibrary => {
            format!("{}{}", target.name, platform.shared_library_suffix())
        }
        TargetKind::StaticLibrary => {
            format!("{}{}", target.name, platform.static_library_suffix())
        }
    }
}

/// `round(step / total * 100)` with `step` counted from 1, halves to even
pub fn percent(step: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((step as f64 / total as f64) * 100.0).round_ties_even() as u32
}

struct Progress {
    step: usize,
    total: usize,
}

impl Progress {
    fn advance(&mut self) -> u32 {
        self.step += 1;
        percent(self.step, self.total)
    }
}

/// Outputs already claimed by a rule, in first-seen order
#[derive(Default)]
struct Outputs {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl Outputs {
    /// Returns false if the output was already claimed
    fn claim(&mut self, output: &str) -> bool {
        if !self.seen.insert(output.to_string()) {
            return false;
        }
        self.ordered.push(output.to_string());
        true
    }
}

pub fn render(project: &Project) -> Result<String> {
    for target in &project.targets {
        target.validate()?;
        if target.kind.is_leaf() && target.sources.len() > 1 {
            return Err(Error::InvalidArgumentType {
                attribute: format!("sources of object target '{}'", target.name),
                found: format!("{} sources (expected exactly one)", target.sources.len()),
            });
        }
    }

    let platform = &project.settings.platform;
    let compiler = project
        .cxx_compiler
        .as_deref()
        .unwrap_or(DEFAULT_COMPILER);

    let mut out = String::new();
    let mut progress = Progress {
        step: 0,
        total: project.targets.iter().map(Target::num_steps).sum(),
    };
    let mut outputs = Outputs::default();
    let mut names = Vec::new();

    out.push_str("all: all_targets\n");

    for target in &project.targets {
        let steps = target.fan_out();
        for step in &steps {
            if step.prebuilt || !outputs.claim(step.output()) {
                continue;
            }
            let pct = progress.advance();
            write_step_rule(&mut out, step, compiler, pct);
        }

        let output = output_name(target, platform);
        outputs.claim(&output);
        names.push(target.name.as_str());
        let pct = progress.advance();
        write_target_rule(&mut out, target, &steps, &output, compiler, pct);
    }

    for custom in &project.custom_targets {
        let _ = writeln!(out, "{}:", custom.name);
        let _ = writeln!(out, "\tcd {} && {}", custom.directory, custom.command);
    }

    for nested in &project.nested {
        let _ = writeln!(out, "{}:", nested.name);
        let _ = writeln!(out, "\t@cd {} && make all", nested.directory);
        let _ = writeln!(out, ".PHONY: {}", nested.name);
        names.push(nested.name.as_str());
    }

    let _ = writeln!(out, "all_targets: {}", names.join(" "));
    let _ = writeln!(out, "\t@echo '{}[100%] Done{}'", HIGHLIGHT, RESET);

    out.push_str("clean:\n");
    if !outputs.ordered.is_empty() {
        let _ = writeln!(out, "\t@rm -f {}", outputs.ordered.join(" "));
    }
    for nested in &project.nested {
        let _ = writeln!(out, "\t@cd {} && make clean", nested.directory);
    }

    Ok(out)
}

fn write_step_rule(out: &mut String, step: &CompileStep, default_compiler: &str, pct: u32) {
    let _ = writeln!(out, "{}: {}", step.name, step.source);
    let _ = writeln!(
        out,
        "\t@echo '{}[{}%] Building {} => {}{}'",
        HIGHLIGHT, pct, step.source, step.name, RESET
    );
    let _ = writeln!(out, "\t@{}", compile_command(step, default_compiler));
}

fn write_target_rule(
    out: &mut String,
    target: &Target,
    steps: &[CompileStep],
    output: &str,
    default_compiler: &str,
    pct: u32,
) {
    let depends = match target.kind {
        TargetKind::Object => target.sources.join(" "),
        _ => steps
            .iter()
            .map(CompileStep::output)
            .collect::<Vec<_>>()
            .join(" "),
    };

    let _ = writeln!(out, "{}: {}", target.name, depends);
    if let Some(hook) = &target.before_build {
        let _ = writeln!(out, "\t{}", hook.render());
    }
    let _ = writeln!(
        out,
        "\t@echo '{}[{}%] Building {}{}'",
        HIGHLIGHT, pct, target.name, RESET
    );
    let _ = writeln!(
        out,
        "\t@{}",
        target_command(target, steps, output, default_compiler)
    );
    if let Some(hook) = &target.after_build {
        let _ = writeln!(out, "\t{}", hook.render());
    }
    if let Some(dest) = &target.install_path {
        let _ = writeln!(out, "\tcp {} {}", output, dest);
    }
}

/// Compile-only command for one step
pub fn compile_command(step: &CompileStep, default_compiler: &str) -> String {
    let mut parts = vec![
        step.compiler
            .clone()
            .unwrap_or_else(|| default_compiler.to_string()),
    ];
    parts.extend(step.options.iter().cloned());
    parts.push("-c".to_string());
    parts.extend(define_flags(step.defines.to_assignments()));
    parts.extend(step.includes.iter().map(|inc| format!("-I {}", inc)));
    parts.extend(step.library_paths.iter().map(|dir| format!("-L {}", dir)));
    parts.push(step.source.clone());
    parts.push("-o".to_string());
    parts.push(step.name.clone());
    parts.extend(step.libraries.iter().map(|lib| format!("-l{}", lib)));
    join(parts)
}

fn target_command(
    target: &Target,
    steps: &[CompileStep],
    output: &str,
    default_compiler: &str,
) -> String {
    let objects = steps.iter().map(|s| s.output().to_string());

    match target.kind {
        TargetKind::Object => match target.as_compile_step() {
            Some(step) => compile_command(&step, default_compiler),
            None => String::new(),
        },
        TargetKind::StaticLibrary => {
            let archiver = target.archiver.as_deref().unwrap_or(DEFAULT_ARCHIVER);
            let mut parts = vec![archiver.to_string(), "rcs".to_string(), output.to_string()];
            parts.extend(objects);
            join(parts)
        }
        TargetKind::Executable | TargetKind::SharedLibrary => {
            let mut parts = vec![
                target
                    .compiler
                    .clone()
                    .unwrap_or_else(|| default_compiler.to_string()),
            ];
            parts.extend(target.options.iter().cloned());
            if target.kind == TargetKind::SharedLibrary {
                parts.push("-fPIC".to_string());
                parts.push("-shared".to_string());
            }
            parts.extend(define_flags(target.defines.to_assignments()));
            parts.extend(target.includes.iter().map(|inc| format!("-I {}", inc)));
            parts.extend(target.library_paths.iter().map(|dir| format!("-L {}", dir)));
            parts.push("-o".to_string());
            parts.push(output.to_string());
            parts.extend(objects);
            parts.extend(target.libraries.iter().map(|lib| format!("-l{}", lib)));
            join(parts)
        }
    }
}

fn define_flags(assignments: Vec<String>) -> impl Iterator<Item = String> {
    assignments.into_iter().map(|d| format!("-D{}", d))
}

fn join(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

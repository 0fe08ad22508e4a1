#![deny(clippy::unwrap_used)]

mod config;
mod source;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

use brilspec_ir::{Program, Trace};
use brilspec_passes::{CallGraph, CallGraphError, InjectError, inject, render_cycle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

pub use brilspec_passes::{EffectPolicy, InjectOptions, InjectReport, NamingMode};
pub use config::{INLINE_NAMING_VAR, Options, SPECULATIVE_EFFECTS_VAR, TRACE_TIMING_VAR};

/// Printed by `call-cycles` when the program has no recursion.
pub const NO_CYCLE: &str = "-";

macro_rules! timing_step {
    ($enabled:expr, $label:expr, $block:expr) => {{
        let _t0 = if $enabled { Some(Instant::now()) } else { None };
        let result = $block;
        if let Some(t0) = _t0 {
            eprintln!(
                "[BRILSPEC_TIMING] {:24} {:>8.1}ms",
                $label,
                t0.elapsed().as_secs_f64() * 1000.0
            );
        }
        result
    }};
}

#[derive(Debug, thiserror::Error)]
pub enum BrilspecError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Inject(#[from] InjectError),
    #[error(transparent)]
    CallGraph(#[from] CallGraphError),
    #[error("Config error: {0}")]
    Config(String),
    #[error("{0}")]
    Usage(String),
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BrilspecError> {
    let text = fs::read_to_string(path).map_err(|source| BrilspecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| BrilspecError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_program(path: &Path) -> Result<Program, BrilspecError> {
    read_json(path)
}

pub fn load_trace(path: &Path) -> Result<Trace, BrilspecError> {
    read_json(path)
}

/// Reads a whole program from `reader`; `name` labels it in errors.
pub fn read_program(mut reader: impl Read, name: &str) -> Result<Program, BrilspecError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|source| BrilspecError::Io {
            path: PathBuf::from(name),
            source,
        })?;
    serde_json::from_str(&text).map_err(|source| BrilspecError::Json {
        path: PathBuf::from(name),
        source,
    })
}

/// Loads both inputs, injects speculation into the traced functions and
/// returns the rewritten program as pretty JSON. Nothing is returned unless
/// every function was rewritten successfully.
///
/// Functions and instructions the rewrite left alone are written exactly as
/// they were read, key order included.
pub fn speculate_files(
    trace_path: &Path,
    program_path: &Path,
    options: &Options,
) -> Result<String, BrilspecError> {
    let timing = options.trace_timing;
    let trace = timing_step!(timing, "load trace", load_trace(trace_path)?);
    let document: Value = timing_step!(timing, "load program", read_json(program_path)?);
    let original: Program =
        serde_json::from_value(document.clone()).map_err(|source| BrilspecError::Json {
            path: program_path.to_path_buf(),
            source,
        })?;
    let mut program = original.clone();
    let report = timing_step!(
        timing,
        "inject speculation",
        inject(&mut program, &trace, &options.inject)?
    );
    info!(
        functions = report.functions,
        branches = report.branches,
        inlined_calls = report.inlined_calls,
        "injected speculation"
    );
    timing_step!(timing, "serialize", {
        let merged = source::merge_rewrites(&document, &original, &program)
            .map_err(output_error)?;
        render_json(&merged)
    })
}

fn output_error(source: serde_json::Error) -> BrilspecError {
    BrilspecError::Json {
        path: PathBuf::from("<output>"),
        source,
    }
}

/// Pretty JSON with two-space indentation.
pub fn render_json(value: &impl Serialize) -> Result<String, BrilspecError> {
    serde_json::to_string_pretty(value).map_err(output_error)
}

/// First call cycle of the program read from `reader`, rendered as
/// `A -> B -> A`, or [`NO_CYCLE`].
pub fn find_cycle(reader: impl Read) -> Result<String, BrilspecError> {
    let program = read_program(reader, "<stdin>")?;
    let graph = CallGraph::from_program(&program);
    Ok(match graph.first_cycle()? {
        Some(cycle) => render_cycle(&cycle),
        None => NO_CYCLE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;

    fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, value.to_string()).expect("write input");
        path
    }

    fn branchy_program() -> Value {
        json!({
            "functions": [{
                "name": "main",
                "instrs": [
                    { "dest": "c", "op": "const", "type": "bool", "value": true },
                    { "args": ["c"], "labels": ["yes", "no"], "op": "br" },
                    { "label": "yes" },
                    { "args": ["c"], "op": "print" },
                    { "label": "no" }
                ]
            }]
        })
    }

    /// Program whose functions only call each other, edges as
    /// `("caller", "callee callee ...")`.
    fn call_program(edges: &[(&str, &str)]) -> String {
        let functions: Vec<Value> = edges
            .iter()
            .map(|(name, callees)| {
                let instrs: Vec<Value> = callees
                    .split_whitespace()
                    .map(|callee| json!({ "args": [], "funcs": [callee], "op": "call" }))
                    .collect();
                json!({ "name": name, "instrs": instrs })
            })
            .collect();
        json!({ "functions": functions }).to_string()
    }

    #[test]
    fn speculate_files_rewrites_traced_function() {
        let dir = TempDir::new().expect("tempdir");
        let trace = write_json(&dir, "trace.json", &json!({ "main": 1 }));
        let program = write_json(&dir, "prog.json", &branchy_program());

        let output = speculate_files(&trace, &program, &Options::default()).expect("speculate");
        let value: Value = serde_json::from_str(&output).expect("output is JSON");
        let ops: Vec<&str> = value["functions"][0]["instrs"]
            .as_array()
            .expect("instrs")
            .iter()
            .filter_map(|instr| instr["op"].as_str())
            .collect();
        assert_eq!(
            ops,
            ["const", "speculate", "print", "guard", "commit", "br", "print"]
        );
        assert!(output.contains("\n  \"functions\""), "pretty printed: {output}");
    }

    #[test]
    fn key_order_of_the_input_is_kept() {
        let dir = TempDir::new().expect("tempdir");
        let trace = write_json(&dir, "trace.json", &json!(["main"]));
        let program = write_json(
            &dir,
            "prog.json",
            &json!({
                "functions": [
                    {
                        "instrs": [
                            { "value": true, "type": "bool", "op": "const", "dest": "c" },
                            { "op": "br", "labels": ["yes", "no"], "args": ["c"] },
                            { "label": "yes" },
                            { "op": "print", "args": ["c"] },
                            { "label": "no" }
                        ],
                        "name": "main"
                    },
                    {
                        "instrs": [{ "op": "nop" }],
                        "name": "cold",
                        "pos": { "row": 1 }
                    }
                ]
            }),
        );

        let output = speculate_files(&trace, &program, &Options::default()).expect("speculate");
        assert!(
            output.contains("\"value\": true,\n          \"type\": \"bool\""),
            "{output}"
        );
        let value: Value = serde_json::from_str(&output).expect("output is JSON");
        let main = value["functions"][0].as_object().expect("main");
        assert_eq!(main.keys().collect::<Vec<_>>(), ["instrs", "name"]);
        let speculated = &value["functions"][0]["instrs"][2];
        assert_eq!(
            speculated.as_object().expect("print").keys().collect::<Vec<_>>(),
            ["op", "args"]
        );
        let cold = value["functions"][1].as_object().expect("cold");
        assert_eq!(cold.keys().collect::<Vec<_>>(), ["instrs", "name", "pos"]);
    }

    #[test]
    fn missing_input_reports_its_path() {
        let dir = TempDir::new().expect("tempdir");
        let program = write_json(&dir, "prog.json", &branchy_program());
        let missing = dir.path().join("absent.json");

        let err = speculate_files(&missing, &program, &Options::default()).expect_err("missing");
        assert!(matches!(err, BrilspecError::Io { ref path, .. } if *path == missing));
        assert!(err.to_string().contains("absent.json"), "{err}");
    }

    #[test]
    fn malformed_program_is_a_json_error() {
        let dir = TempDir::new().expect("tempdir");
        let trace = write_json(&dir, "trace.json", &json!({}));
        let program = dir.path().join("prog.json");
        fs::write(&program, "{ \"functions\": [").expect("write");

        let err = speculate_files(&trace, &program, &Options::default()).expect_err("malformed");
        assert!(matches!(err, BrilspecError::Json { .. }), "{err}");
    }

    #[test]
    fn injection_errors_pass_through() {
        let dir = TempDir::new().expect("tempdir");
        let trace = write_json(&dir, "trace.json", &json!(["main"]));
        let program = write_json(
            &dir,
            "prog.json",
            &json!({
                "functions": [{
                    "name": "main",
                    "instrs": [{ "args": ["c"], "labels": ["gone", "x"], "op": "br" }]
                }]
            }),
        );
        let err = speculate_files(&trace, &program, &Options::default()).expect_err("bad label");
        assert!(matches!(err, BrilspecError::Inject(InjectError::UnknownLabel { .. })));
    }

    #[test]
    fn find_cycle_on_acyclic_program_prints_dash() {
        let text = call_program(&[("A", "B"), ("B", "C"), ("C", "")]);
        assert_eq!(find_cycle(text.as_bytes()).expect("cycle"), "-");
    }

    #[test]
    fn find_cycle_reports_mutual_recursion() {
        let text = call_program(&[("A", "B"), ("B", "A")]);
        assert_eq!(find_cycle(text.as_bytes()).expect("cycle"), "A -> B -> A");
    }

    #[test]
    fn find_cycle_rejects_unknown_callee() {
        let text = call_program(&[("A", "nobody")]);
        let err = find_cycle(text.as_bytes()).expect_err("unknown");
        assert!(matches!(err, BrilspecError::CallGraph(_)));
    }
}

//! Testing utilities for the Buffon workspace
//!
//! Stub renderers are POSIX `sh` scripts installed under the names the
//! real renderers use, so tests run them with `interpreter = "sh"`.
//! Every stub appends its argument list, one per line, to `<script>.args`.

#![allow(missing_docs)]

use buffon_core::{EstimateProblem, ServiceConfig, SimulationKind};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Ten bytes that start like a PNG; no NUL, which `printf` cannot portably emit
pub const STUB_PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x01\x02";

/// What a stub renderer does when run
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Write these bytes to the `-o` path, exit 0, print nothing
    WriteBytes(Vec<u8>),
    /// Write the PNG, but also print to stderr, exit 0
    WarnOnStderr(String),
    /// Print to stdout and exit with this code, writing nothing
    Fail { code: i32, stdout: String },
    /// Exit 0 without writing the output file
    WriteNothing,
    /// Sleep, then write the PNG
    Slow { secs: u32 },
    /// Print to stdout, exit 0 (for `run` mode)
    Report(String),
}

/// Directory of stub renderer scripts
#[derive(Debug)]
pub struct StubRenderers {
    dir: TempDir,
}

impl StubRenderers {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create renderer dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Install a stub under the renderer name of `kind`
    pub fn install(&self, kind: SimulationKind, behavior: &StubBehavior) -> &Self {
        self.install_script(kind.renderer(), behavior)
    }

    /// Install a stub for the `/api` estimate renderer
    pub fn install_estimate(&self, behavior: &StubBehavior) -> &Self {
        self.install_script(EstimateProblem::RENDERER, behavior)
    }

    /// Install a stub for every kind
    pub fn install_all(&self, behavior: &StubBehavior) -> &Self {
        for kind in SimulationKind::ALL {
            self.install(kind, behavior);
        }
        self
    }

    pub fn install_script(&self, name: &str, behavior: &StubBehavior) -> &Self {
        std::fs::write(self.path().join(name), script(name, behavior)).expect("write stub");
        self
    }

    /// Argument lists recorded by a stub, one `Vec` per run
    pub fn recorded_args(&self, name: &str) -> Vec<Vec<String>> {
        let Ok(text) = std::fs::read_to_string(self.args_log(name)) else {
            return Vec::new();
        };
        text.split("--end--\n")
            .filter(|run| !run.is_empty())
            .map(|run| run.lines().map(str::to_string).collect())
            .collect()
    }

    fn args_log(&self, name: &str) -> PathBuf {
        self.path().join(format!("{name}.args"))
    }
}

impl Default for StubRenderers {
    fn default() -> Self {
        Self::new()
    }
}

fn octal_escaped(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut out, b| {
        let _ = write!(out, "\\{b:03o}");
        out
    })
}

fn single_quoted(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn script(name: &str, behavior: &StubBehavior) -> String {
    let png = octal_escaped(STUB_PNG);
    let action = match behavior {
        StubBehavior::WriteBytes(bytes) => format!("printf '{}' > \"$out\"", octal_escaped(bytes)),
        StubBehavior::WarnOnStderr(msg) => format!(
            "printf '{png}' > \"$out\"\nprintf '%s' {} >&2",
            single_quoted(msg)
        ),
        StubBehavior::Fail { code, stdout } => {
            format!("printf '%s' {}\nexit {code}", single_quoted(stdout))
        }
        StubBehavior::WriteNothing => "exit 0".to_string(),
        StubBehavior::Slow { secs } => format!("sleep {secs}\nprintf '{png}' > \"$out\""),
        StubBehavior::Report(stdout) => format!("printf '%s' {}", single_quoted(stdout)),
    };

    format!(
        r#"#!/bin/sh
dir=$(dirname "$0")
printf '%s\n' "$@" >> "$dir/{name}.args"
printf '%s\n' '--end--' >> "$dir/{name}.args"
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
{action}
"#
    )
}

/// Public asset directory with the files the front-end ships
#[derive(Debug)]
pub struct PublicFixture {
    dir: TempDir,
}

pub const INDEX_HTML: &str = "<!doctype html>\n<title>Buffon</title>\n";
pub const MAIN_CSS: &str = "body { margin: 0; }\n";
pub const RESULTS_HTML: &str = "<html><body><p>{{results}}</p></body></html>\n";

impl PublicFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create public dir");
        std::fs::create_dir_all(dir.path().join("css")).expect("create css dir");
        std::fs::write(dir.path().join("index.html"), INDEX_HTML).expect("write index");
        std::fs::write(dir.path().join("css/main.css"), MAIN_CSS).expect("write css");
        std::fs::write(dir.path().join("results.html"), RESULTS_HTML).expect("write results");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for PublicFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a full service needs, in temporary directories
#[derive(Debug)]
pub struct ServiceFixture {
    pub renderers: StubRenderers,
    pub public: PublicFixture,
    scratch_parent: TempDir,
}

impl ServiceFixture {
    pub fn new() -> Self {
        Self {
            renderers: StubRenderers::new(),
            public: PublicFixture::new(),
            scratch_parent: tempfile::tempdir().expect("create scratch parent"),
        }
    }

    /// Scratch path handed to the service; recreated on startup
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_parent.path().join("output")
    }

    /// Configuration running stubs through `sh`
    pub fn config(&self) -> ServiceConfig {
        ServiceConfig::new()
            .with_port(0)
            .with_public_dir(self.public.path())
            .with_scratch_dir(self.scratch_dir())
            .with_renderer_dir(self.renderers.path())
            .with_interpreter("sh")
    }

    /// Files currently in the scratch directory
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch_dir())
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }
}

impl Default for ServiceFixture {
    fn default() -> Self {
        Self::new()
    }
}

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use log::debug;

use crate::config::{Settings, JOB_NAME_PREFIX};
use crate::error::Result;

pub const FOUND_KEY: &str = "FOUND";
pub const BASELINE_SHA_KEY: &str = "MESA_BASELINE_SHA";

/// Outcome of one search. Built once and reported as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionResult {
    Found { sha: String, pipeline_id: String },
    NotFound,
}

impl SelectionResult {
    pub fn found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Chosen sha, or an empty string when nothing matched.
    pub fn chosen_sha(&self) -> &str {
        match self {
            Self::Found { sha, .. } => sha,
            Self::NotFound => "",
        }
    }
}

/// Where `KEY=value` lines go.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputSink {
    /// Appended to the file named by `GITHUB_OUTPUT`.
    GithubOutput(PathBuf),
    Stdout,
}

impl OutputSink {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Stdout, Self::GithubOutput)
    }

    fn write_pairs(&self, pairs: &[(&str, &str)]) -> Result<()> {
        match self {
            Self::GithubOutput(path) => {
                debug!("Appending outputs to {}", path.display());
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                write_pairs(&mut file, pairs)
            }
            Self::Stdout => write_pairs(&mut std::io::stdout().lock(), pairs),
        }
    }
}

fn write_pairs(out: &mut impl Write, pairs: &[(&str, &str)]) -> Result<()> {
    for (key, value) in pairs {
        writeln!(out, "{key}={value}")?;
    }
    out.flush()?;
    Ok(())
}

pub struct Reporter {
    sink: OutputSink,
}

impl Reporter {
    pub fn new(sink: OutputSink) -> Self {
        Self { sink }
    }

    /// Emit both output keys, then one human-readable line to `diagnostics`.
    pub fn report(
        &self,
        result: &SelectionResult,
        settings: &Settings,
        diagnostics: &mut impl Write,
    ) -> Result<()> {
        let found = if result.found() { "true" } else { "false" };
        self.sink.write_pairs(&[
            (FOUND_KEY, found),
            (BASELINE_SHA_KEY, result.chosen_sha()),
        ])?;

        match result {
            SelectionResult::Found { sha, pipeline_id } => {
                writeln!(diagnostics, "Chosen Mesa baseline: {sha} (pipeline {pipeline_id})")?;
            }
            SelectionResult::NotFound => {
                writeln!(
                    diagnostics,
                    "::notice::Skip build: No '{JOB_NAME_PREFIX}' success found in last {} commits on ref '{}'",
                    settings.max_commits, settings.target_ref
                )?;
            }
        }

        Ok(())
    }
}

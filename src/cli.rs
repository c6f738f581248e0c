use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::config::{FileConfig, Overrides, Settings};
use crate::error::{GuardError, Result};
use crate::gitlab::GitLabClient;
use crate::report::{OutputSink, Reporter};
use crate::selector::BaselineSelector;

#[derive(Parser)]
#[command(name = "baseline-guard")]
#[command(author, version, about = "Pick the newest upstream commit with a passing CI job", long_about = None)]
pub struct Cli {
    #[arg(short, long, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(short, long, env = "GITLAB_URL")]
    url: Option<String>,

    #[arg(short = 'P', long, env = "GITLAB_PROJECT_PATH")]
    project: Option<String>,

    #[arg(short = 'r', long = "ref", env = "TARGET_REF")]
    target_ref: Option<String>,

    #[arg(short, long, env = "MAX_COMMITS", allow_negative_numbers = true)]
    max_commits: Option<i64>,

    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,

    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            token: self.token.clone(),
            base_url: self.url.clone(),
            project_path: self.project.clone(),
            target_ref: self.target_ref.clone(),
            max_commits: self.max_commits,
            github_output: self.github_output.clone(),
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let file = FileConfig::load(self.config.as_deref())
            .map_err(|e| GuardError::Config(format!("{e:#}")))?;
        let settings = Settings::resolve(self.overrides(), file)?;

        info!(
            "Selecting baseline for project {} on {} (last {} commits)",
            settings.project, settings.target_ref, settings.max_commits
        );

        let client = GitLabClient::new(&settings.base_url, &settings.token)?;
        let result = BaselineSelector::new(&client, &settings).select().await?;

        let reporter = Reporter::new(OutputSink::from_path(settings.github_output.clone()));
        reporter.report(&result, &settings, &mut std::io::stderr().lock())
    }
}

use log::{debug, info, warn};

use crate::config::{Settings, JOB_NAME_PREFIX};
use crate::error::{GuardError, Result};
use crate::gitlab::types::Commit;
use crate::gitlab::GitLabClient;
use crate::report::SelectionResult;

/// Walks commits → pipelines → jobs and stops at the first commit whose
/// successful pipeline contains a passing job matching [`JOB_NAME_PREFIX`].
///
/// Commits are visited in API order, pipelines in the requested
/// `updated_at desc` order. At most one pipelines call per commit and one
/// jobs call per pipeline are issued, each capped to a single page.
pub struct BaselineSelector<'a> {
    client: &'a GitLabClient,
    settings: &'a Settings,
}

impl<'a> BaselineSelector<'a> {
    pub fn new(client: &'a GitLabClient, settings: &'a Settings) -> Self {
        Self { client, settings }
    }

    /// Run the search.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::NoCommits`] when the ref has no commits, and
    /// propagates any request failure. Missing ids and empty pipeline or job
    /// lists are skipped silently.
    pub async fn select(&self) -> Result<SelectionResult> {
        let project = self.settings.project.as_str();
        let target_ref = self.settings.target_ref.as_str();

        let mut commits = self
            .client
            .list_commits(project, target_ref, self.settings.max_commits)
            .await?
            .filter(|commits| !commits.is_empty())
            .ok_or_else(|| GuardError::NoCommits {
                ref_name: target_ref.to_string(),
            })?;
        commits.truncate(self.settings.max_commits);

        info!(
            "Scanning {} commits on {target_ref} for a passing '{JOB_NAME_PREFIX}' job",
            commits.len()
        );
        warn_if_not_newest_first(&commits);

        for commit in &commits {
            let Some(sha) = commit.sha() else {
                continue;
            };

            let Some(pipelines) = self.client.list_success_pipelines(project, &sha).await? else {
                debug!("{sha}: no pipeline list");
                continue;
            };
            debug!("{sha}: {} successful pipelines", pipelines.len());

            for pipeline in &pipelines {
                let Some(pipeline_id) = pipeline.pipeline_id() else {
                    continue;
                };

                let Some(jobs) = self.client.list_pipeline_jobs(project, &pipeline_id).await?
                else {
                    continue;
                };

                if jobs.iter().any(|job| job.is_baseline_match(JOB_NAME_PREFIX)) {
                    info!(
                        "Matched {sha} via pipeline {pipeline_id} (status {}, updated {})",
                        pipeline.status.as_deref().unwrap_or("unknown"),
                        pipeline
                            .updated_at
                            .map_or_else(|| "unknown".to_string(), |t| t.to_rfc3339()),
                    );
                    return Ok(SelectionResult::Found { sha, pipeline_id });
                }

                debug!("{sha}: pipeline {pipeline_id} has no passing '{JOB_NAME_PREFIX}' job");
            }
        }

        Ok(SelectionResult::NotFound)
    }
}

/// The commits endpoint is expected to list newest first; nothing is re-sorted.
fn warn_if_not_newest_first(commits: &[Commit]) {
    let dates: Vec<_> = commits.iter().filter_map(|c| c.committed_date).collect();
    if let Some(pair) = dates.windows(2).find(|pair| pair[0] < pair[1]) {
        warn!(
            "Commit list is not newest-first ({} precedes {}); keeping API order",
            pair[0], pair[1]
        );
    }
}

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::types::{Commit, Job, Pipeline};
use crate::auth::Token;
use crate::config::{
    CLIENT_NAME, JOBS_PER_PIPELINE, PIPELINES_PER_COMMIT, REQUEST_TIMEOUT, SUCCESS_STATUS,
};
use crate::error::{GuardError, Result};

const PRIVATE_TOKEN: &str = "PRIVATE-TOKEN";

/// Decoded body of a single GET plus the headers it came with.
#[derive(Debug)]
pub struct Fetched {
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

pub struct GitLabClient {
    client: Client,
    api_url: Url,
}

impl GitLabClient {
    pub fn new(base_url: &str, token: &Token) -> Result<Self> {
        let mut auth = HeaderValue::from_str(token.as_str())
            .map_err(|e| GuardError::Config(format!("Token is not a valid header value: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(PRIVATE_TOKEN, auth);
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_NAME));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GuardError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };

        let api_url = Url::parse(&base)
            .map_err(|e| GuardError::Config(format!("Invalid base URL: {e}")))?
            .join("api/v4/")
            .map_err(|e| GuardError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self { client, api_url })
    }

    /// Issue one GET against `path` (relative to `/api/v4/`).
    ///
    /// An empty response body decodes to `None`. Any transport failure or
    /// non-2xx status is returned as [`GuardError::Transport`]; there is no retry.
    pub async fn fetch_one(&self, path: &str, params: &[(&str, String)]) -> Result<Fetched> {
        let mut url = self
            .api_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| GuardError::Config(format!("Invalid API path {path}: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        debug!("GET {url}");

        let transport = |source: reqwest::Error| GuardError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport)?;

        let headers = response.headers().clone();
        let text = response.text().await.map_err(transport)?;

        let body = if text.trim().is_empty() {
            None
        } else {
            Some(serde_json::from_str(&text).map_err(|source| GuardError::Decode {
                url: url.to_string(),
                source,
            })?)
        };

        Ok(Fetched { body, headers })
    }

    /// Commits on `ref_name`, one page capped at `per_page`.
    pub async fn list_commits(
        &self,
        project: &str,
        ref_name: &str,
        per_page: usize,
    ) -> Result<Option<Vec<Commit>>> {
        let fetched = self
            .fetch_one(
                &format!("projects/{project}/repository/commits"),
                &[
                    ("ref_name", ref_name.to_string()),
                    ("per_page", per_page.to_string()),
                ],
            )
            .await?;
        Ok(decode_list(fetched.body))
    }

    /// Successful pipelines for `sha`, most recently updated first.
    pub async fn list_success_pipelines(
        &self,
        project: &str,
        sha: &str,
    ) -> Result<Option<Vec<Pipeline>>> {
        let fetched = self
            .fetch_one(
                &format!("projects/{project}/pipelines"),
                &[
                    ("sha", sha.to_string()),
                    ("status", SUCCESS_STATUS.to_string()),
                    ("order_by", "updated_at".to_string()),
                    ("sort", "desc".to_string()),
                    ("per_page", PIPELINES_PER_COMMIT.to_string()),
                ],
            )
            .await?;
        Ok(decode_list(fetched.body))
    }

    pub async fn list_pipeline_jobs(
        &self,
        project: &str,
        pipeline_id: &str,
    ) -> Result<Option<Vec<Job>>> {
        let fetched = self
            .fetch_one(
                &format!("projects/{project}/pipelines/{pipeline_id}/jobs"),
                &[("per_page", JOBS_PER_PIPELINE.to_string())],
            )
            .await?;
        Ok(decode_list(fetched.body))
    }
}

/// `None` unless the body is a JSON array. Elements that don't fit `T`
/// become `T::default()` so the caller skips them for lack of an id.
fn decode_list<T: DeserializeOwned + Default>(body: Option<Value>) -> Option<Vec<T>> {
    match body? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item).unwrap_or_else(|e| {
                        debug!("Ignoring undecodable list element: {e}");
                        T::default()
                    })
                })
                .collect(),
        ),
        _ => None,
    }
}

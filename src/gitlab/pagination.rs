use futures::stream::{self, Stream, TryStreamExt};
use reqwest::header::HeaderMap;
use serde_json::Value;

use super::client::GitLabClient;
use crate::error::{GuardError, Result};

pub const DEFAULT_PER_PAGE: usize = 100;
const NEXT_PAGE_HEADER: &str = "X-Next-Page";

/// Lazily walk every page of a list endpoint, yielding items in order.
///
/// Starts at page 1 and sends `per_page=100` unless the caller already set
/// one. Each page after the first is requested only when the previous
/// response carried a non-empty `X-Next-Page` header, and only once the
/// consumer has drained the items before it. The walk ends at the first
/// absent or empty body. A body that is not a JSON list fails with
/// [`GuardError::UnexpectedShape`].
///
/// The stream is not resumable; call again to restart from page 1.
// The selector caps each level to a single page and never needs this.
#[allow(dead_code)]
pub fn fetch_all_pages<'a>(
    client: &'a GitLabClient,
    path: &'a str,
    params: &[(&str, String)],
) -> impl Stream<Item = Result<Value>> + 'a {
    let mut base: Vec<(String, String)> = params
        .iter()
        .filter(|(k, _)| *k != "page")
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    if !base.iter().any(|(k, _)| k == "per_page") {
        base.push(("per_page".to_string(), DEFAULT_PER_PAGE.to_string()));
    }

    stream::try_unfold(Some(1_u64), move |page| {
        let base = base.clone();
        async move {
            let Some(page) = page else {
                return Ok(None);
            };

            let mut query: Vec<(&str, String)> =
                base.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
            query.push(("page", page.to_string()));

            let fetched = client.fetch_one(path, &query).await?;
            let items = match fetched.body {
                None => return Ok(None),
                Some(Value::Array(items)) if items.is_empty() => return Ok(None),
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(GuardError::UnexpectedShape {
                        path: path.to_string(),
                    })
                }
            };

            let next = next_page(&fetched.headers, path)?;
            Ok::<_, GuardError>(Some((items, next)))
        }
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<Value, GuardError>)))
    .try_flatten()
}

fn next_page(headers: &HeaderMap, path: &str) -> Result<Option<u64>> {
    let Some(value) = headers.get(NEXT_PAGE_HEADER) else {
        return Ok(None);
    };

    let raw = value.to_str().unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse().map(Some).map_err(|_| GuardError::InvalidNextPage {
        path: path.to_string(),
        value: raw.to_string(),
    })
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuardError {
    #[error("GITLAB_TOKEN is required")]
    MissingToken,

    #[error("MAX_COMMITS must be > 0 (got {0})")]
    InvalidMaxCommits(i64),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("GitLab API failed: {url} ({source})")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GitLab API returned malformed JSON: {url} ({source})")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected response (expected list) for {path}")]
    UnexpectedShape { path: String },

    #[error("Unexpected X-Next-Page value {value:?} for {path}")]
    InvalidNextPage { path: String, value: String },

    #[error("No commits found on {ref_name}")]
    NoCommits { ref_name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GuardError>;

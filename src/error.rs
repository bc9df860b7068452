use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API responded with HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("failed to {operation} for account '{account}': {source}")]
    Download {
        operation: &'static str,
        account: String,
        #[source]
        source: Box<AccountError>,
    },

    #[error("background task failed: {0}")]
    Task(String),

    #[error("{kind} '{name}' has no {detail}")]
    MissingDetail {
        kind: &'static str,
        name: String,
        detail: &'static str,
    },

    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize '{}': {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("file '{}' mixes account resources with 'configs' or 'delete' entries", .0.display())]
    MixedFile(PathBuf),

    #[error("invalid {kind} in '{}': {message}", path.display())]
    Validation {
        path: PathBuf,
        kind: &'static str,
        message: String,
    },

    #[error("duplicate {kind} '{id}' found in '{}'", path.display())]
    Duplicate {
        kind: &'static str,
        id: String,
        path: PathBuf,
    },

    #[error("no referenced target found for {kind} '{id}' referenced by {owner}")]
    DanglingReference {
        kind: &'static str,
        id: String,
        owner: String,
    },

    #[error("no ref id field found in {kind} reference of {owner}")]
    MissingReferenceId { kind: &'static str, owner: String },

    #[error("empty {kind} name reference in {owner}")]
    EmptyStringReference { kind: &'static str, owner: String },

    #[error("failed to write {} account resource file(s): {}", .0.len(), join_errors(.0))]
    Write(Vec<AccountError>),
}

pub type Result<T> = std::result::Result<T, AccountError>;

impl AccountError {
    /// Wraps a stage failure with the operation name and account for traceability.
    pub fn download(operation: &'static str, account: &str, source: AccountError) -> Self {
        AccountError::Download {
            operation,
            account: account.to_string(),
            source: Box::new(source),
        }
    }

    /// Walks through `Download` wrappers to the error that caused them.
    pub fn root_cause(&self) -> &AccountError {
        match self {
            AccountError::Download { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self.root_cause(), AccountError::Duplicate { .. })
    }

    pub fn is_mixed_file(&self) -> bool {
        matches!(self.root_cause(), AccountError::MixedFile(_))
    }

    pub fn is_dangling_reference(&self) -> bool {
        matches!(self.root_cause(), AccountError::DanglingReference { .. })
    }

    pub fn is_missing_detail(&self) -> bool {
        matches!(self.root_cause(), AccountError::MissingDetail { .. })
    }
}

fn join_errors(errors: &[AccountError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("failed to write output: {0}")]
    Output(#[source] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("kubeconfig does not exist at path: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to find home directory for default kubeconfig")]
    NoHomeDir,

    #[error("failed to load kubeconfig at path: {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("failed to merge kubeconfig at path: {}", .path.display())]
    Merge {
        path: PathBuf,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("context was not found in kubeconfig: {0}")]
    UnknownContext(String),

    #[error("failed to build client configuration")]
    Client(#[source] kube::config::KubeconfigError),

    #[error("failed to create api client")]
    Connect(#[source] kube::Error),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("count is negative: {0}")]
    NegativeCount(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("the path \"{}\" does not exist", .0.display())]
    PathNotFound(PathBuf),

    #[error("pattern \"{pattern}\" is not valid")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Stdin already in use")]
    StdinInUse,

    #[error("failed to read {source_name}")]
    Read {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk directory: {}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("error reading {}: recognized file extensions are [.json .yaml .yml]", .0.display())]
    NoRecognizedFiles(PathBuf),

    #[error("error parsing {source_name}")]
    Parse {
        source_name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{source_name}: object is missing 'apiVersion' or 'kind'")]
    MissingTypeInfo { source_name: String },

    #[error("{source_name}: no matches for kind \"{kind}\" in version \"{api_version}\"")]
    NoMatch {
        source_name: String,
        api_version: String,
        kind: String,
    },

    #[error("{source_name}: failed to decode {kind}")]
    Decode {
        source_name: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{source_name}: resource name may not be empty")]
    MissingName { source_name: String },

    #[error(
        "the namespace from the provided object \"{object_namespace}\" does not match the namespace \"{namespace}\". You must pass '--namespace={object_namespace}' to perform this operation."
    )]
    NamespaceMismatch {
        object_namespace: String,
        namespace: String,
    },

    #[error("no objects passed to create")]
    NoObjects,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("{kind} \"{name}\" already exists")]
    Conflict { kind: String, name: String },

    #[error("not allowed to create {kind} \"{name}\": {message}")]
    Unauthorized {
        kind: String,
        name: String,
        message: String,
    },

    #[error("server rejected {kind} \"{name}\" ({code}): {message}")]
    Rejected {
        kind: String,
        name: String,
        code: u16,
        message: String,
    },

    #[error("failed to create {kind} \"{name}\"")]
    Transport {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

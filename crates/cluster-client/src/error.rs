//! Cluster client errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Kubernetes API request/response error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Record does not exist. Callers use this to decide on create-if-absent.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record already exists (create raced with another writer)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Client configuration could not be built (kubeconfig, in-cluster, URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other API failure reported by a non-HTTP implementation
    #[error("Cluster API error: {0}")]
    Api(String),
}

impl ClusterError {
    /// Whether this error means the requested record is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound(_))
    }
}

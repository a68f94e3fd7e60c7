//! Controller-specific error types.
//!
//! Every error is terminal: the run stops at the first failure and nothing is
//! retried or rolled back. `ClusterError::NotFound` is handled locally by the
//! reconcilers and only shows up here where a missing record is fatal.

use cluster_client::ClusterError;
use scrape_roles::{RoleKind, RoleSpec};
use std::fmt;
use thiserror::Error;

/// Cluster API call made by a reconciler, reported on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Reading the role's service
    GetService,
    /// Creating the role's service
    CreateService,
    /// Reading the role's endpoints
    GetEndpoints,
    /// Creating the role's endpoints
    CreateEndpoints,
    /// Merge-patching the role's endpoints
    PatchEndpoints,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operation::GetService => "get service",
            Operation::CreateService => "create service",
            Operation::GetEndpoints => "get endpoints",
            Operation::CreateEndpoints => "create endpoints",
            Operation::PatchEndpoints => "patch endpoints",
        };
        f.write_str(text)
    }
}

/// Errors that can occur in the scrape-patch controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Could not build a client session
    #[error("Error while initializing connection to Kubernetes apiserver: {0}")]
    Connection(#[source] ClusterError),

    /// A list/get call failed during topology discovery
    #[error("Error while collecting cluster info: cannot {stage}: {source}")]
    Discovery {
        /// What discovery was doing
        stage: &'static str,
        /// Underlying API failure
        #[source]
        source: ClusterError,
    },

    /// No API server pods and the fallback endpoints record is empty
    #[error("Error while collecting cluster info: no master addresses discoverable in {namespace}/{name}")]
    NoMasterAddresses {
        /// Namespace of the fallback endpoints record
        namespace: &'static str,
        /// Name of the fallback endpoints record
        name: &'static str,
    },

    /// A get/create/patch call failed while reconciling a role
    #[error("Error while patching {role}: cannot {operation} {namespace}/{record}: {source}")]
    Reconcile {
        /// Role being reconciled
        role: RoleKind,
        /// Failed call
        operation: Operation,
        /// Namespace of the record
        namespace: &'static str,
        /// Name of the record
        record: String,
        /// Underlying API failure
        #[source]
        source: ClusterError,
    },

    /// Building a patch body failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ControllerError {
    /// Wraps a cluster failure with the role, call and record it happened on.
    pub fn reconcile(
        spec: &RoleSpec,
        operation: Operation,
        namespace: &'static str,
        record: &str,
        source: ClusterError,
    ) -> Self {
        ControllerError::Reconcile {
            role: spec.kind(),
            operation,
            namespace,
            record: record.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_error_names_role_and_operation() {
        let spec = RoleSpec::with_defaults(RoleKind::Kubelet);
        let err = ControllerError::reconcile(
            &spec,
            Operation::CreateEndpoints,
            "kube-system",
            "kubelet",
            ClusterError::Api("forbidden".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Error while patching kubelet: cannot create endpoints kube-system/kubelet: Cluster API error: forbidden"
        );
    }

    #[test]
    fn test_no_master_addresses_message() {
        let err = ControllerError::NoMasterAddresses {
            namespace: "default",
            name: "kubernetes",
        };
        assert!(err.to_string().contains("no master addresses discoverable in default/kubernetes"));
    }
}

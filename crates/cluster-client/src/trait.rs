//! ClusterClient trait for mocking
//!
//! This trait abstracts the handful of Kubernetes API calls the tool needs so
//! reconcilers can be unit tested without a cluster. `KubeClusterClient`
//! implements it against a real API server; tests use `MockClusterClient`.

use crate::error::ClusterError;
use k8s_openapi::api::core::v1::{Endpoints, Node, Pod, Service};

/// Trait for Kubernetes API client operations
///
/// `get_*` calls return `ClusterError::NotFound` when the record is absent.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterClientTrait: Send + Sync {
    /// Lists every node. `timeout_secs` bounds the list call server-side.
    async fn list_nodes(&self, timeout_secs: Option<u32>) -> Result<Vec<Node>, ClusterError>;

    /// Lists pods in `namespace` matching `label_selector` (`k=v,k2=v2`).
    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
        timeout_secs: Option<u32>,
    ) -> Result<Vec<Pod>, ClusterError>;

    /// Gets a service by name.
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError>;
    /// Creates a service; `AlreadyExists` when the name is taken.
    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, ClusterError>;

    /// Gets an endpoints record by name.
    async fn get_endpoints(&self, namespace: &str, name: &str) -> Result<Endpoints, ClusterError>;
    /// Creates an endpoints record; `AlreadyExists` when the name is taken.
    async fn create_endpoints(&self, namespace: &str, endpoints: &Endpoints) -> Result<Endpoints, ClusterError>;

    /// Applies a JSON merge patch: only the fields present in `patch` change.
    async fn patch_endpoints(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Endpoints, ClusterError>;
}

//! Mock ClusterClient for unit testing
//!
//! This module provides a mock implementation of `ClusterClientTrait` that can
//! be used in unit tests without a running API server.
//!
//! - Records live in memory, keyed by `(namespace, name)`
//! - Every call is recorded so tests can assert on what was (not) mutated
//! - Patches go through real JSON merge-patch semantics (`merge.rs`)
//! - Any operation can be made to fail with `fail_on`

mod merge;

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use k8s_openapi::api::core::v1::{Endpoints, Node, Pod, Service};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use merge::merge_patch;

type RecordKey = (String, String);

/// Operations understood by the mock, used for failure injection and call filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    /// `list_nodes`
    ListNodes,
    /// `list_pods`
    ListPods,
    /// `get_service`
    GetService,
    /// `create_service`
    CreateService,
    /// `get_endpoints`
    GetEndpoints,
    /// `create_endpoints`
    CreateEndpoints,
    /// `patch_endpoints`
    PatchEndpoints,
}

impl MockOperation {
    /// Whether the operation changes cluster state.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            MockOperation::CreateService | MockOperation::CreateEndpoints | MockOperation::PatchEndpoints
        )
    }
}

/// One recorded call against the mock
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// Which operation was called
    pub operation: MockOperation,
    /// Namespace argument, if the operation is namespaced
    pub namespace: Option<String>,
    /// Record name, label selector for `list_pods`, `None` for `list_nodes`
    pub target: Option<String>,
    /// List timeout passed by the caller
    pub timeout_secs: Option<u32>,
    /// Patch body for `patch_endpoints`
    pub patch: Option<serde_json::Value>,
}

impl MockCall {
    fn new(operation: MockOperation, namespace: Option<&str>, target: Option<&str>) -> Self {
        Self {
            operation,
            namespace: namespace.map(str::to_string),
            target: target.map(str::to_string),
            timeout_secs: None,
            patch: None,
        }
    }
}

/// Mock ClusterClient for testing
///
/// Cloning shares the underlying stores, so a test can keep a handle for
/// assertions after moving a clone into the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockClusterClient {
    pub(crate) nodes: Arc<Mutex<Vec<Node>>>,
    pub(crate) pods: Arc<Mutex<Vec<Pod>>>,
    pub(crate) services: Arc<Mutex<HashMap<RecordKey, Service>>>,
    pub(crate) endpoints: Arc<Mutex<HashMap<RecordKey, Endpoints>>>,
    pub(crate) calls: Arc<Mutex<Vec<MockCall>>>,
    pub(crate) failures: Arc<Mutex<HashMap<MockOperation, String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, name: &str) -> RecordKey {
    (namespace.to_string(), name.to_string())
}

/// Matches `k=v,k2=v2` selectors; an empty selector matches everything.
fn matches_selector(labels: Option<&BTreeMap<String, String>>, selector: &str) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((k, v)) => labels.and_then(|l| l.get(k)).is_some_and(|actual| actual == v),
            None => labels.is_some_and(|l| l.contains_key(term)),
        })
}

impl MockClusterClient {
    /// Create a new, empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node (for test setup)
    pub fn add_node(&self, node: Node) {
        lock(&self.nodes).push(node);
    }

    /// Add a pod (for test setup). The pod's own namespace is used for listing.
    pub fn add_pod(&self, pod: Pod) {
        lock(&self.pods).push(pod);
    }

    /// Add a service under `namespace` (for test setup)
    pub fn add_service(&self, namespace: &str, service: Service) {
        let name = service.metadata.name.clone().unwrap_or_default();
        lock(&self.services).insert(key(namespace, &name), service);
    }

    /// Add an endpoints record under `namespace` (for test setup)
    pub fn add_endpoints(&self, namespace: &str, endpoints: Endpoints) {
        let name = endpoints.metadata.name.clone().unwrap_or_default();
        lock(&self.endpoints).insert(key(namespace, &name), endpoints);
    }

    /// Current state of a service, if present
    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        lock(&self.services).get(&key(namespace, name)).cloned()
    }

    /// Current state of an endpoints record, if present
    pub fn endpoints(&self, namespace: &str, name: &str) -> Option<Endpoints> {
        lock(&self.endpoints).get(&key(namespace, name)).cloned()
    }

    /// Make every future call of `operation` fail with `message`
    pub fn fail_on(&self, operation: MockOperation, message: impl Into<String>) {
        lock(&self.failures).insert(operation, message.into());
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Calls of one operation, in order
    pub fn calls_of(&self, operation: MockOperation) -> Vec<MockCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    /// Calls that created or patched something
    pub fn mutations(&self) -> Vec<MockCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.operation.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget recorded calls, keeping stored records
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    fn record(&self, call: MockCall) -> Result<(), ClusterError> {
        let operation = call.operation;
        lock(&self.calls).push(call);
        match lock(&self.failures).get(&operation) {
            Some(message) => Err(ClusterError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ClusterClientTrait for MockClusterClient {
    async fn list_nodes(&self, timeout_secs: Option<u32>) -> Result<Vec<Node>, ClusterError> {
        let mut call = MockCall::new(MockOperation::ListNodes, None, None);
        call.timeout_secs = timeout_secs;
        self.record(call)?;
        Ok(lock(&self.nodes).clone())
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
        timeout_secs: Option<u32>,
    ) -> Result<Vec<Pod>, ClusterError> {
        let mut call = MockCall::new(MockOperation::ListPods, Some(namespace), Some(label_selector));
        call.timeout_secs = timeout_secs;
        self.record(call)?;
        Ok(lock(&self.pods)
            .iter()
            .filter(|p| p.metadata.namespace.as_deref() == Some(namespace))
            .filter(|p| matches_selector(p.metadata.labels.as_ref(), label_selector))
            .cloned()
            .collect())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError> {
        self.record(MockCall::new(MockOperation::GetService, Some(namespace), Some(name)))?;
        self.service(namespace, name)
            .ok_or_else(|| ClusterError::NotFound(format!("Service {namespace}/{name}")))
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, ClusterError> {
        let name = service.metadata.name.clone().unwrap_or_default();
        self.record(MockCall::new(MockOperation::CreateService, Some(namespace), Some(&name)))?;

        let mut services = lock(&self.services);
        if services.contains_key(&key(namespace, &name)) {
            return Err(ClusterError::AlreadyExists(format!("Service {namespace}/{name}")));
        }
        let mut created = service.clone();
        created.metadata.namespace = Some(namespace.to_string());
        services.insert(key(namespace, &name), created.clone());
        Ok(created)
    }

    async fn get_endpoints(&self, namespace: &str, name: &str) -> Result<Endpoints, ClusterError> {
        self.record(MockCall::new(MockOperation::GetEndpoints, Some(namespace), Some(name)))?;
        self.endpoints(namespace, name)
            .ok_or_else(|| ClusterError::NotFound(format!("Endpoints {namespace}/{name}")))
    }

    async fn create_endpoints(&self, namespace: &str, endpoints: &Endpoints) -> Result<Endpoints, ClusterError> {
        let name = endpoints.metadata.name.clone().unwrap_or_default();
        self.record(MockCall::new(MockOperation::CreateEndpoints, Some(namespace), Some(&name)))?;

        let mut stored = lock(&self.endpoints);
        if stored.contains_key(&key(namespace, &name)) {
            return Err(ClusterError::AlreadyExists(format!("Endpoints {namespace}/{name}")));
        }
        let mut created = endpoints.clone();
        created.metadata.namespace = Some(namespace.to_string());
        stored.insert(key(namespace, &name), created.clone());
        Ok(created)
    }

    async fn patch_endpoints(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Endpoints, ClusterError> {
        let mut call = MockCall::new(MockOperation::PatchEndpoints, Some(namespace), Some(name));
        call.patch = Some(patch.clone());
        self.record(call)?;

        let mut stored = lock(&self.endpoints);
        let existing = stored
            .get(&key(namespace, name))
            .ok_or_else(|| ClusterError::NotFound(format!("Endpoints {namespace}/{name}")))?;

        let mut document = serde_json::to_value(existing)
            .map_err(|e| ClusterError::Api(format!("cannot encode Endpoints {namespace}/{name}: {e}")))?;
        merge_patch(&mut document, patch);
        let patched: Endpoints = serde_json::from_value(document)
            .map_err(|e| ClusterError::Api(format!("patch produced invalid Endpoints: {e}")))?;

        stored.insert(key(namespace, name), patched.clone());
        Ok(patched)
    }
}

//! Cluster topology discovery
//!
//! Decides how the control plane is deployed and collects the addresses the
//! reconcilers write into endpoints records:
//!
//! 1. every `InternalIP` of every node becomes a node address
//! 2. API server static pods in `kube-system` mean a pod-managed control
//!    plane; their host IPs are the master addresses
//! 3. without such pods the control plane runs as host processes, and the
//!    master addresses are read from the first subset of `default/kubernetes`

use crate::error::ControllerError;
use cluster_client::ClusterClientTrait;
use k8s_openapi::api::core::v1::{Endpoints, Node, Pod};
use scrape_roles::{
    AddressBook, DEFAULT_NAMESPACE, DeploymentMode, MASTER_ENDPOINTS_NAME, SYSTEM_NAMESPACE,
    apiserver_selector, selector_string,
};
use tracing::{debug, info, warn};

/// Node address type used for node-scoped endpoints.
const INTERNAL_IP: &str = "InternalIP";

const STAGE_LIST_NODES: &str = "list nodes";
const STAGE_LIST_APISERVER_PODS: &str = "list kube-apiserver pods";
const STAGE_GET_MASTER_ENDPOINTS: &str = "get default/kubernetes endpoints";

/// Reads the cluster once and builds an `AddressBook`.
pub struct TopologyDiscoverer<'a> {
    client: &'a dyn ClusterClientTrait,
    list_timeout_secs: Option<u32>,
}

impl<'a> TopologyDiscoverer<'a> {
    /// `list_timeout_secs` is sent as the server-side timeout of both list calls.
    pub fn new(client: &'a dyn ClusterClientTrait, list_timeout_secs: Option<u32>) -> Self {
        Self {
            client,
            list_timeout_secs,
        }
    }

    /// Runs discovery. Any API failure aborts it; nothing is retried.
    pub async fn discover(&self) -> Result<AddressBook, ControllerError> {
        let nodes = self
            .client
            .list_nodes(self.list_timeout_secs)
            .await
            .map_err(|source| ControllerError::Discovery {
                stage: STAGE_LIST_NODES,
                source,
            })?;
        let node_addresses = internal_addresses(&nodes);

        let selector = selector_string(&apiserver_selector());
        let apiserver_pods = self
            .client
            .list_pods(SYSTEM_NAMESPACE, &selector, self.list_timeout_secs)
            .await
            .map_err(|source| ControllerError::Discovery {
                stage: STAGE_LIST_APISERVER_PODS,
                source,
            })?;

        let (mode, master_addresses) = if apiserver_pods.is_empty() {
            info!("No kube-apiserver pods found, the cluster may be deployed by systemd");
            let endpoints = self
                .client
                .get_endpoints(DEFAULT_NAMESPACE, MASTER_ENDPOINTS_NAME)
                .await
                .map_err(|source| ControllerError::Discovery {
                    stage: STAGE_GET_MASTER_ENDPOINTS,
                    source,
                })?;
            (DeploymentMode::ProcessManaged, master_endpoint_addresses(&endpoints)?)
        } else {
            info!(
                "Found {} kube-apiserver pods, the cluster may be deployed by kubeadm",
                apiserver_pods.len()
            );
            (DeploymentMode::PodManaged, pod_host_addresses(&apiserver_pods))
        };

        info!(
            "Discovered {} cluster: {} master addresses, {} node addresses",
            mode,
            master_addresses.len(),
            node_addresses.len()
        );
        Ok(AddressBook::new(mode, master_addresses, node_addresses))
    }
}

/// Every `InternalIP` of every node, in list order.
fn internal_addresses(nodes: &[Node]) -> Vec<String> {
    let mut addresses = Vec::new();
    for node in nodes {
        let name = node.metadata.name.as_deref().unwrap_or("<unnamed>");
        let before = addresses.len();
        addresses.extend(
            node.status
                .iter()
                .flat_map(|s| s.addresses.iter().flatten())
                .filter(|a| a.type_ == INTERNAL_IP)
                .map(|a| a.address.clone()),
        );
        if addresses.len() == before {
            debug!("Node {} has no {} address", name, INTERNAL_IP);
        }
    }
    addresses
}

/// Host IPs of the API server pods. Pods not yet scheduled have none.
fn pod_host_addresses(pods: &[Pod]) -> Vec<String> {
    pods.iter()
        .filter_map(|pod| {
            let host_ip = pod.status.as_ref().and_then(|s| s.host_ip.clone());
            if host_ip.is_none() {
                warn!(
                    "kube-apiserver pod {} has no host IP yet, skipping",
                    pod.metadata.name.as_deref().unwrap_or("<unnamed>")
                );
            }
            host_ip
        })
        .collect()
}

/// Addresses of the first subset only; later subsets are ignored.
fn master_endpoint_addresses(endpoints: &Endpoints) -> Result<Vec<String>, ControllerError> {
    let first = endpoints
        .subsets
        .as_deref()
        .and_then(<[_]>::first)
        .ok_or(ControllerError::NoMasterAddresses {
            namespace: DEFAULT_NAMESPACE,
            name: MASTER_ENDPOINTS_NAME,
        })?;
    Ok(first
        .addresses
        .iter()
        .flatten()
        .map(|a| a.ip.clone())
        .collect())
}

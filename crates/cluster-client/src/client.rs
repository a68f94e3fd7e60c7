//! Kubernetes API client
//!
//! Implements `ClusterClientTrait` on top of kube-rs and takes care of
//! building a client session: an explicit kubeconfig and/or API server URL
//! when given, the in-cluster service account otherwise.

use crate::cluster_trait::ClusterClientTrait;
use crate::error::ClusterError;
use k8s_openapi::api::core::v1::{Endpoints, Node, Pod, Service};
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where to find the API server and credentials.
///
/// With neither field set the in-cluster service account is used.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    /// API server URL, e.g. `https://10.0.0.1:6443` or `http://localhost:8080`.
    /// Overrides the cluster URL of the kubeconfig when both are set.
    pub apiserver_host: Option<String>,
    /// Path to a kubeconfig file
    pub kubeconfig: Option<PathBuf>,
}

/// Parses an API server URL, insisting on an absolute `scheme://host[:port]` form.
pub fn parse_apiserver_host(host: &str) -> Result<http::Uri, ClusterError> {
    let uri = host
        .parse::<http::Uri>()
        .map_err(|e| ClusterError::Config(format!("invalid API server host {host:?}: {e}")))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(ClusterError::Config(format!(
            "API server host {host:?} must look like protocol://address:port"
        )));
    }
    Ok(uri)
}

/// Kubernetes API client backed by kube-rs
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    /// Wraps an existing kube client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client session from `options`.
    pub async fn connect(options: &ConnectionOptions) -> Result<Self, ClusterError> {
        install_crypto_provider();
        let config = Self::build_config(options).await?;
        debug!("Connecting to API server at {}", config.cluster_url);
        let client = Client::try_from(config)?;
        Ok(Self::new(client))
    }

    async fn build_config(options: &ConnectionOptions) -> Result<Config, ClusterError> {
        let cluster_url = options
            .apiserver_host
            .as_deref()
            .map(parse_apiserver_host)
            .transpose()?;

        match (&options.kubeconfig, cluster_url) {
            (Some(path), cluster_url) => {
                info!("Skipping in-cluster config, loading kubeconfig {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    ClusterError::Config(format!("failed to read kubeconfig {}: {e}", path.display()))
                })?;
                let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| {
                        ClusterError::Config(format!("failed to load kubeconfig {}: {e}", path.display()))
                    })?;
                if let Some(url) = cluster_url {
                    config.cluster_url = url;
                }
                Ok(config)
            }
            (None, Some(cluster_url)) => {
                info!("Skipping in-cluster config, using API server {}", cluster_url);
                Ok(Config::new(cluster_url))
            }
            (None, None) => {
                info!("Using in-cluster config to connect to apiserver");
                Config::incluster().map_err(|e| {
                    ClusterError::Config(format!(
                        "the cluster may not be configured: service account, or {e}"
                    ))
                })
            }
        }
    }
}

fn install_crypto_provider() {
    // Fails only when a provider is already installed
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        debug!("rustls crypto provider already installed");
    }
}

/// HTTP status the API server returns when a create hits an existing name.
const CONFLICT: u16 = 409;

/// Maps a failed create so a lost race reads the same as with any other client.
fn create_error(kind: &str, namespace: &str, name: &str, err: kube::Error) -> ClusterError {
    match err {
        kube::Error::Api(response) if response.code == CONFLICT => {
            ClusterError::AlreadyExists(format!("{kind} {namespace}/{name}"))
        }
        other => ClusterError::Kube(other),
    }
}

fn list_params(label_selector: Option<&str>, timeout_secs: Option<u32>) -> ListParams {
    let mut lp = ListParams::default();
    if let Some(selector) = label_selector {
        lp = lp.labels(selector);
    }
    if let Some(timeout) = timeout_secs {
        lp = lp.timeout(timeout);
    }
    lp
}

#[async_trait::async_trait]
impl ClusterClientTrait for KubeClusterClient {
    async fn list_nodes(&self, timeout_secs: Option<u32>) -> Result<Vec<Node>, ClusterError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&list_params(None, timeout_secs)).await?;
        debug!("Listed {} nodes", nodes.items.len());
        Ok(nodes.items)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
        timeout_secs: Option<u32>,
    ) -> Result<Vec<Pod>, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&list_params(Some(label_selector), timeout_secs))
            .await?;
        debug!("Listed {} pods in {} matching {}", pods.items.len(), namespace, label_selector);
        Ok(pods.items)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, ClusterError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await?
            .ok_or_else(|| ClusterError::NotFound(format!("Service {namespace}/{name}")))
    }

    async fn create_service(&self, namespace: &str, service: &Service) -> Result<Service, ClusterError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let name = service.metadata.name.as_deref().unwrap_or_default();
        api.create(&PostParams::default(), service)
            .await
            .map_err(|e| create_error("Service", namespace, name, e))
    }

    async fn get_endpoints(&self, namespace: &str, name: &str) -> Result<Endpoints, ClusterError> {
        let api: Api<Endpoints> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name)
            .await?
            .ok_or_else(|| ClusterError::NotFound(format!("Endpoints {namespace}/{name}")))
    }

    async fn create_endpoints(&self, namespace: &str, endpoints: &Endpoints) -> Result<Endpoints, ClusterError> {
        let api: Api<Endpoints> = Api::namespaced(self.client.clone(), namespace);
        let name = endpoints.metadata.name.as_deref().unwrap_or_default();
        api.create(&PostParams::default(), endpoints)
            .await
            .map_err(|e| create_error("Endpoints", namespace, name, e))
    }

    async fn patch_endpoints(
        &self,
        namespace: &str,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<Endpoints, ClusterError> {
        let api: Api<Endpoints> = Api::namespaced(self.client.clone(), namespace);
        Ok(api
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?)
    }
}

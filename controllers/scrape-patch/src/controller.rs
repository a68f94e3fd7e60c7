//! Main controller implementation.
//!
//! `Controller::run` is one pass: discover the topology, then reconcile the
//! master-scoped roles followed by the node-scoped ones. The first failure
//! ends the run; records already written stay as they are.

use crate::config::Config;
use crate::discovery::TopologyDiscoverer;
use crate::error::ControllerError;
use crate::reconciler::{Change, Reconciler, RoleChanges};
use cluster_client::{ClusterClientTrait, KubeClusterClient};
use scrape_roles::{DeploymentMode, RoleSpec, Scope};
use std::fmt;
use tracing::{debug, info};

/// Record counts for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Deployment mode found by discovery
    pub mode: DeploymentMode,
    /// Services created
    pub services_created: usize,
    /// Endpoints records created
    pub endpoints_created: usize,
    /// Endpoints records patched
    pub endpoints_patched: usize,
}

impl RunSummary {
    fn new(mode: DeploymentMode) -> Self {
        Self {
            mode,
            services_created: 0,
            endpoints_created: 0,
            endpoints_patched: 0,
        }
    }

    fn record_service(&mut self, change: Change) {
        if change == Change::Created {
            self.services_created += 1;
        }
    }

    fn record_endpoints(&mut self, change: Change) {
        match change {
            Change::Created => self.endpoints_created += 1,
            Change::Patched => self.endpoints_patched += 1,
            Change::Unchanged => {}
        }
    }

    fn record_role(&mut self, changes: RoleChanges) {
        self.record_service(changes.service);
        self.record_endpoints(changes.endpoints);
    }

    /// Whether the run changed anything in the cluster.
    pub fn is_noop(&self) -> bool {
        self.services_created == 0 && self.endpoints_created == 0 && self.endpoints_patched == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cluster: {} services created, {} endpoints created, {} endpoints patched",
            self.mode, self.services_created, self.endpoints_created, self.endpoints_patched
        )
    }
}

/// One-shot controller.
pub struct Controller {
    client: Box<dyn ClusterClientTrait>,
    config: Config,
}

impl Controller {
    /// Creates a controller over an existing client.
    pub fn new(client: Box<dyn ClusterClientTrait>, config: Config) -> Self {
        Self { client, config }
    }

    /// Connects to the API server described by `config`.
    pub async fn connect(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing scrape-patch controller");
        let client = KubeClusterClient::connect(&config.connection)
            .await
            .map_err(ControllerError::Connection)?;
        Ok(Self::new(Box::new(client), config))
    }

    /// Runs discovery and reconciliation once.
    pub async fn run(&self) -> Result<RunSummary, ControllerError> {
        let client = self.client.as_ref();
        let book = TopologyDiscoverer::new(client, Some(self.config.list_timeout_secs))
            .discover()
            .await?;
        debug!("Address book: {}", serde_json::to_string(&book)?);

        let mode = book.mode();
        let roles = &self.config.roles;
        let reconciler = Reconciler::new(client);
        let mut summary = RunSummary::new(mode);

        let masters = [&roles.controller_manager, &roles.scheduler];
        for spec in masters {
            summary.record_service(reconciler.ensure_service(spec, mode).await?);
        }

        if mode.patches_master_endpoints() {
            let addresses = book.addresses_for(Scope::Master);
            for spec in masters {
                summary.record_endpoints(reconciler.ensure_master_endpoints(spec, addresses).await?);
            }
        } else {
            info!("Control plane runs as pods, don't need to patch the endpoints");
        }

        let node_roles: [Option<&RoleSpec>; 2] = [roles.kubelet.as_ref(), roles.kube_proxy.as_ref()];
        for spec in node_roles.into_iter().flatten() {
            let changes = reconciler
                .ensure_node_role(spec, mode, book.addresses_for(spec.scope()))
                .await?;
            debug!("{}: service {}, endpoints {}", spec.kind(), changes.service, changes.endpoints);
            summary.record_role(changes);
        }

        Ok(summary)
    }
}

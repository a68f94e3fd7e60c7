//! Discovered cluster addresses.

use crate::role::Scope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the control plane is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    /// Control-plane components run as static pods (kubeadm style). Services
    /// can select them and the platform fills in endpoints by itself.
    PodManaged,
    /// Control-plane components run as host processes (systemd style). Master
    /// endpoints have to be written by hand.
    ProcessManaged,
}

impl DeploymentMode {
    /// Whether created services should carry the role's pod selector.
    pub fn uses_selectors(self) -> bool {
        self == DeploymentMode::PodManaged
    }

    /// Whether master-scoped endpoints need explicit patching.
    pub fn patches_master_endpoints(self) -> bool {
        self == DeploymentMode::ProcessManaged
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::PodManaged => f.write_str("pod-managed"),
            DeploymentMode::ProcessManaged => f.write_str("process-managed"),
        }
    }
}

/// Addresses found by topology discovery, built once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBook {
    mode: DeploymentMode,
    master_addresses: Vec<String>,
    node_addresses: Vec<String>,
}

impl AddressBook {
    /// Freezes the discovered addresses. Discovery order is kept so that
    /// generated patches are reproducible.
    pub fn new(
        mode: DeploymentMode,
        master_addresses: Vec<String>,
        node_addresses: Vec<String>,
    ) -> Self {
        Self {
            mode,
            master_addresses,
            node_addresses,
        }
    }

    /// Deployment mode decided during discovery.
    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Control-plane host addresses.
    pub fn master_addresses(&self) -> &[String] {
        &self.master_addresses
    }

    /// Internal addresses of all nodes.
    pub fn node_addresses(&self) -> &[String] {
        &self.node_addresses
    }

    /// Address subset for a role's scope.
    pub fn addresses_for(&self, scope: Scope) -> &[String] {
        match scope {
            Scope::Master => &self.master_addresses,
            Scope::Node => &self.node_addresses,
        }
    }
}

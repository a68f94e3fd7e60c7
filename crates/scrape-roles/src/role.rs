//! Role definitions
//!
//! A `RoleSpec` is the desired shape of the service and endpoints records for
//! one monitored component. Specs are built once from configuration and only
//! read afterwards, so all fields sit behind accessors.

use crate::labels::{
    CLUSTER_SERVICE_LABEL, CONTROLLER_MANAGER_COMPONENT, HTTPS_METRICS_PORT_NAME,
    HTTP_METRICS_PORT_NAME, K8S_APP_LABEL, KUBELET_COMPONENT, KUBE_PROXY_COMPONENT, NAME_LABEL,
    SCHEDULER_COMPONENT, SCRAPE_ENABLED_ANNOTATION, SCRAPE_PORT_ANNOTATION, control_plane_selector,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The four monitored components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleKind {
    /// kube-controller-manager
    ControllerManager,
    /// kube-scheduler
    Scheduler,
    /// kubelet (node agent)
    Kubelet,
    /// kube-proxy (node proxy)
    KubeProxy,
}

impl RoleKind {
    /// All roles in reconciliation order.
    pub const ALL: [RoleKind; 4] = [
        RoleKind::ControllerManager,
        RoleKind::Scheduler,
        RoleKind::Kubelet,
        RoleKind::KubeProxy,
    ];

    /// Bare component identifier.
    pub fn component(self) -> &'static str {
        match self {
            RoleKind::ControllerManager => CONTROLLER_MANAGER_COMPONENT,
            RoleKind::Scheduler => SCHEDULER_COMPONENT,
            RoleKind::Kubelet => KUBELET_COMPONENT,
            RoleKind::KubeProxy => KUBE_PROXY_COMPONENT,
        }
    }

    /// Which address set the role's endpoints are drawn from.
    pub fn scope(self) -> Scope {
        match self {
            RoleKind::ControllerManager | RoleKind::Scheduler => Scope::Master,
            RoleKind::Kubelet | RoleKind::KubeProxy => Scope::Node,
        }
    }

    /// Well-known metrics port of the component.
    pub fn default_port(self) -> u16 {
        match self {
            RoleKind::ControllerManager => 10252,
            RoleKind::Scheduler => 10251,
            RoleKind::Kubelet => 10250,
            RoleKind::KubeProxy => 10249,
        }
    }

    /// Name of the metrics port. Only the kubelet serves metrics over TLS.
    pub fn port_name(self) -> &'static str {
        match self {
            RoleKind::Kubelet => HTTPS_METRICS_PORT_NAME,
            _ => HTTP_METRICS_PORT_NAME,
        }
    }

    /// Pod selector for roles that run as selectable static pods.
    ///
    /// Node-scoped roles have none: their addresses are always written by hand.
    pub fn selector(self) -> Option<BTreeMap<String, String>> {
        match self.scope() {
            Scope::Master => Some(control_plane_selector(self.component())),
            Scope::Node => None,
        }
    }

    /// Whether endpoint addresses should point back at the Node object.
    pub fn targets_nodes(self) -> bool {
        self == RoleKind::Kubelet
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.component())
    }
}

/// Address set a role draws its endpoints from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Control-plane hosts only.
    Master,
    /// Every cluster member.
    Node,
}

/// A named port exposed by a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePort {
    /// Port name, reused verbatim in service and endpoints records
    pub name: String,
    /// Port number
    pub port: u16,
}

/// Immutable desired state for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    kind: RoleKind,
    name: String,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selector: Option<BTreeMap<String, String>>,
    ports: Vec<RolePort>,
}

impl RoleSpec {
    /// Builds the spec for `kind`, served under service `name` on `port`.
    pub fn new(kind: RoleKind, name: impl Into<String>, port: u16) -> Self {
        let component = kind.component();
        let labels = BTreeMap::from([
            (K8S_APP_LABEL.to_string(), component.to_string()),
            (CLUSTER_SERVICE_LABEL.to_string(), "true".to_string()),
            (NAME_LABEL.to_string(), component.to_string()),
        ]);
        let annotations = BTreeMap::from([
            (SCRAPE_PORT_ANNOTATION.to_string(), port.to_string()),
            (SCRAPE_ENABLED_ANNOTATION.to_string(), "true".to_string()),
        ]);

        Self {
            kind,
            name: name.into(),
            labels,
            annotations,
            selector: kind.selector(),
            ports: vec![RolePort {
                name: kind.port_name().to_string(),
                port,
            }],
        }
    }

    /// Spec with the platform defaults for name and port.
    pub fn with_defaults(kind: RoleKind) -> Self {
        Self::new(kind, kind.component(), kind.default_port())
    }

    /// Which component this spec describes.
    pub fn kind(&self) -> RoleKind {
        self.kind
    }

    /// Service record name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bare component identifier.
    pub fn component(&self) -> &'static str {
        self.kind.component()
    }

    /// Labels attached to created records.
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Annotations attached to created services.
    pub fn annotations(&self) -> &BTreeMap<String, String> {
        &self.annotations
    }

    /// Pod selector, if the role runs as selectable pods.
    pub fn selector(&self) -> Option<&BTreeMap<String, String>> {
        self.selector.as_ref()
    }

    /// Ports in declaration order.
    pub fn ports(&self) -> &[RolePort] {
        &self.ports
    }

    /// Address set this role draws from.
    pub fn scope(&self) -> Scope {
        self.kind.scope()
    }

    /// Whether endpoint addresses carry a Node back-reference.
    pub fn targets_nodes(&self) -> bool {
        self.kind.targets_nodes()
    }

    /// Name of the endpoints record to reconcile.
    ///
    /// Master-scoped endpoints are keyed by the component identifier because
    /// the platform maintains them under that name regardless of the service
    /// name we were given. Node-scoped endpoints follow the service name.
    pub fn endpoints_name(&self) -> &str {
        match self.scope() {
            Scope::Master => self.component(),
            Scope::Node => &self.name,
        }
    }
}

//! Well-known names shared by discovery and reconciliation.

use std::collections::BTreeMap;

/// Namespace holding the control-plane components and the records we manage.
pub const SYSTEM_NAMESPACE: &str = "kube-system";

/// Namespace holding the `kubernetes` service and its endpoints.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Endpoints record that lists the API servers of the cluster.
pub const MASTER_ENDPOINTS_NAME: &str = "kubernetes";

/// Value of the `tier` label on static control-plane pods.
pub const CONTROL_PLANE_TIER: &str = "control-plane";

/// Port name for plain-HTTP metrics listeners.
pub const HTTP_METRICS_PORT_NAME: &str = "http-metrics";

/// Port name for TLS metrics listeners.
pub const HTTPS_METRICS_PORT_NAME: &str = "https-metrics";

// Component identifiers are fixed by the platform and are not configurable.

/// API server component name.
pub const APISERVER_COMPONENT: &str = "kube-apiserver";
/// Controller manager component name.
pub const CONTROLLER_MANAGER_COMPONENT: &str = "kube-controller-manager";
/// Scheduler component name.
pub const SCHEDULER_COMPONENT: &str = "kube-scheduler";
/// Kubelet component name.
pub const KUBELET_COMPONENT: &str = "kubelet";
/// Kube-proxy component name.
pub const KUBE_PROXY_COMPONENT: &str = "kube-proxy";

/// Application label stamped on every record we create.
pub const K8S_APP_LABEL: &str = "k8s-app";
/// Marks the record as a cluster add-on service.
pub const CLUSTER_SERVICE_LABEL: &str = "kubernetes.io/cluster-service";
/// Human-readable name label.
pub const NAME_LABEL: &str = "kubernetes.io/name";

/// Port Prometheus should scrape.
pub const SCRAPE_PORT_ANNOTATION: &str = "prometheus.io/port";
/// Opts the service into Prometheus scraping.
pub const SCRAPE_ENABLED_ANNOTATION: &str = "prometheus.io/scrape";

/// Kind used in the back-reference of kubelet endpoint addresses.
pub const NODE_KIND: &str = "Node";

/// Selector matching the static pods of a control-plane component.
pub fn control_plane_selector(component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("tier".to_string(), CONTROL_PLANE_TIER.to_string()),
        ("component".to_string(), component.to_string()),
    ])
}

/// Selector matching API server pods, used to tell pod-managed clusters apart.
pub fn apiserver_selector() -> BTreeMap<String, String> {
    control_plane_selector(APISERVER_COMPONENT)
}

/// Renders a label map as a Kubernetes label selector (`k1=v1,k2=v2`).
///
/// Keys come out in sorted order so the rendered selector is stable.
pub fn selector_string(selector: &BTreeMap<String, String>) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apiserver_selector_string() {
        assert_eq!(
            selector_string(&apiserver_selector()),
            "component=kube-apiserver,tier=control-plane"
        );
    }

    #[test]
    fn test_empty_selector_renders_empty() {
        assert_eq!(selector_string(&BTreeMap::new()), "");
    }
}

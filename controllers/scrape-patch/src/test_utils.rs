//! Test utilities for unit testing discovery and reconcilers
//!
//! Builders for the core/v1 records the controller reads, plus a couple of
//! canned clusters matching the two deployment modes.

use crate::config::{Args, Config};
use clap::{CommandFactory, FromArgMatches};
use cluster_client::MockClusterClient;
use k8s_openapi::api::core::v1::{
    EndpointAddress, EndpointPort, EndpointSubset, Endpoints, Node, NodeAddress, NodeStatus, Pod,
    PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use scrape_roles::{
    DEFAULT_NAMESPACE, MASTER_ENDPOINTS_NAME, SYSTEM_NAMESPACE, apiserver_selector,
};

/// Helper to create a node with one `InternalIP` address
pub fn node(name: &str, internal_ip: &str) -> Node {
    node_with_addresses(name, &[("Hostname", name), ("InternalIP", internal_ip)])
}

/// Helper to create a node with arbitrary `(type, address)` pairs
pub fn node_with_addresses(name: &str, addresses: &[(&str, &str)]) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: None,
        status: Some(NodeStatus {
            addresses: Some(
                addresses
                    .iter()
                    .map(|(type_, address)| NodeAddress {
                        type_: (*type_).to_string(),
                        address: (*address).to_string(),
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
    }
}

/// Helper to create a static API server pod in `kube-system`
pub fn apiserver_pod(name: &str, host_ip: Option<&str>) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(SYSTEM_NAMESPACE.to_string()),
            labels: Some(apiserver_selector()),
            ..Default::default()
        },
        spec: None,
        status: Some(PodStatus {
            host_ip: host_ip.map(str::to_string),
            ..Default::default()
        }),
    }
}

/// Helper to create an endpoints record with a single subset
pub fn endpoints(name: &str, ips: &[&str]) -> Endpoints {
    Endpoints {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        subsets: Some(vec![EndpointSubset {
            addresses: Some(
                ips.iter()
                    .map(|ip| EndpointAddress {
                        ip: (*ip).to_string(),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ports: Some(vec![EndpointPort {
                name: Some("https".to_string()),
                port: 6443,
                ..Default::default()
            }]),
            ..Default::default()
        }]),
    }
}

/// Helper to create an endpoints record with no subsets at all
pub fn empty_endpoints(name: &str) -> Endpoints {
    Endpoints {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        subsets: None,
    }
}

/// IPs of the first subset of a stored record, in order
pub fn first_subset_ips(endpoints: &Endpoints) -> Vec<String> {
    endpoints
        .subsets
        .iter()
        .flatten()
        .next()
        .and_then(|s| s.addresses.as_ref())
        .map(|a| a.iter().map(|addr| addr.ip.clone()).collect())
        .unwrap_or_default()
}

/// Three nodes, no API server pods, `default/kubernetes` listing two masters.
///
/// The master-scoped endpoints exist but are empty, as they are on a freshly
/// installed systemd cluster.
pub fn process_managed_cluster() -> MockClusterClient {
    let client = MockClusterClient::new();
    for (name, ip) in [("m1", "10.0.0.1"), ("m2", "10.0.0.2"), ("w1", "10.0.0.3")] {
        client.add_node(node(name, ip));
    }
    client.add_endpoints(
        DEFAULT_NAMESPACE,
        endpoints(MASTER_ENDPOINTS_NAME, &["10.0.0.1", "10.0.0.2"]),
    );
    client.add_endpoints(SYSTEM_NAMESPACE, empty_endpoints("kube-controller-manager"));
    client.add_endpoints(SYSTEM_NAMESPACE, empty_endpoints("kube-scheduler"));
    client
}

/// Two nodes and one API server static pod on the first of them.
pub fn pod_managed_cluster() -> MockClusterClient {
    let client = MockClusterClient::new();
    client.add_node(node("cp1", "192.168.1.10"));
    client.add_node(node("w1", "192.168.1.20"));
    client.add_pod(apiserver_pod("kube-apiserver-cp1", Some("192.168.1.10")));
    client
}

/// Parses command-line style arguments with the `APISERVER_HOST` and
/// `KUBECONFIG` fallbacks switched off, so tests ignore the ambient environment.
pub fn parse_args(extra: &[&str]) -> Args {
    let mut argv = vec!["scrape-patch"];
    argv.extend_from_slice(extra);
    let matches = Args::command()
        .mut_arg("apiserver_host", |arg| arg.env(None::<&str>))
        .mut_arg("kubeconfig", |arg| arg.env(None::<&str>))
        .try_get_matches_from(argv)
        .expect("test arguments parse");
    Args::from_arg_matches(&matches).expect("test arguments map onto Args")
}

/// Helper to build a validated config from command-line style arguments
pub fn config(extra: &[&str]) -> Config {
    Config::try_from(parse_args(extra)).expect("test config is valid")
}

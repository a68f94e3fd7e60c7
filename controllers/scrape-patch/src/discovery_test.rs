//! Unit tests for topology discovery

#[cfg(test)]
mod tests {
    use crate::discovery::TopologyDiscoverer;
    use crate::error::ControllerError;
    use crate::test_utils::*;
    use cluster_client::{MockClusterClient, MockOperation};
    use k8s_openapi::api::core::v1::{EndpointAddress, EndpointSubset};
    use scrape_roles::{DEFAULT_NAMESPACE, DeploymentMode, MASTER_ENDPOINTS_NAME};

    #[tokio::test]
    async fn test_process_managed_uses_kubernetes_endpoints() {
        let client = process_managed_cluster();

        let book = TopologyDiscoverer::new(&client, Some(5))
            .discover()
            .await
            .expect("discovery succeeds");

        assert_eq!(book.mode(), DeploymentMode::ProcessManaged);
        assert_eq!(book.master_addresses(), ["10.0.0.1", "10.0.0.2"]);
        assert_eq!(book.node_addresses(), ["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[tokio::test]
    async fn test_pod_managed_uses_pod_host_ips() {
        let client = pod_managed_cluster();

        let book = TopologyDiscoverer::new(&client, Some(5))
            .discover()
            .await
            .expect("discovery succeeds");

        assert_eq!(book.mode(), DeploymentMode::PodManaged);
        assert_eq!(book.master_addresses(), ["192.168.1.10"]);
        assert!(
            client.calls_of(MockOperation::GetEndpoints).is_empty(),
            "fallback record is not read when apiserver pods exist"
        );
    }

    #[tokio::test]
    async fn test_list_timeout_applied_to_list_calls() {
        let client = pod_managed_cluster();

        TopologyDiscoverer::new(&client, Some(7))
            .discover()
            .await
            .expect("discovery succeeds");

        assert_eq!(client.calls_of(MockOperation::ListNodes)[0].timeout_secs, Some(7));
        let pods = &client.calls_of(MockOperation::ListPods)[0];
        assert_eq!(pods.timeout_secs, Some(7));
        assert_eq!(pods.namespace.as_deref(), Some("kube-system"));
        assert_eq!(
            pods.target.as_deref(),
            Some("component=kube-apiserver,tier=control-plane")
        );
    }

    #[tokio::test]
    async fn test_only_first_subset_is_used() {
        let client = MockClusterClient::new();
        client.add_node(node("n1", "10.0.0.1"));
        let mut record = endpoints(MASTER_ENDPOINTS_NAME, &["10.0.0.1"]);
        if let Some(subsets) = record.subsets.as_mut() {
            subsets.push(EndpointSubset {
                addresses: Some(vec![EndpointAddress {
                    ip: "10.0.0.99".to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            });
        }
        client.add_endpoints(DEFAULT_NAMESPACE, record);

        let book = TopologyDiscoverer::new(&client, None)
            .discover()
            .await
            .expect("discovery succeeds");

        assert_eq!(book.master_addresses(), ["10.0.0.1"]);
    }

    #[tokio::test]
    async fn test_no_subsets_is_fatal() {
        let client = MockClusterClient::new();
        client.add_endpoints(DEFAULT_NAMESPACE, empty_endpoints(MASTER_ENDPOINTS_NAME));

        let err = TopologyDiscoverer::new(&client, None)
            .discover()
            .await
            .expect_err("no masters");

        assert!(matches!(err, ControllerError::NoMasterAddresses { .. }));
    }

    #[tokio::test]
    async fn test_missing_kubernetes_endpoints_reports_stage() {
        let client = MockClusterClient::new();

        let err = TopologyDiscoverer::new(&client, None)
            .discover()
            .await
            .expect_err("fallback record missing");

        assert!(err.to_string().contains("get default/kubernetes endpoints"));
    }

    #[tokio::test]
    async fn test_node_without_internal_ip_contributes_nothing() {
        let client = pod_managed_cluster();
        client.add_node(node_with_addresses("edge", &[("ExternalIP", "203.0.113.5")]));
        client.add_node(node_with_addresses(
            "dual",
            &[("InternalIP", "192.168.1.30"), ("InternalIP", "fd00::30")],
        ));

        let book = TopologyDiscoverer::new(&client, None)
            .discover()
            .await
            .expect("discovery succeeds");

        assert_eq!(
            book.node_addresses(),
            ["192.168.1.10", "192.168.1.20", "192.168.1.30", "fd00::30"]
        );
    }

    #[tokio::test]
    async fn test_apiserver_pod_without_host_ip_is_skipped() {
        let client = pod_managed_cluster();
        client.add_pod(apiserver_pod("kube-apiserver-pending", None));

        let book = TopologyDiscoverer::new(&client, None)
            .discover()
            .await
            .expect("discovery succeeds");

        assert_eq!(book.mode(), DeploymentMode::PodManaged);
        assert_eq!(book.master_addresses(), ["192.168.1.10"]);
    }

    #[tokio::test]
    async fn test_list_nodes_failure_reports_stage() {
        let client = pod_managed_cluster();
        client.fail_on(MockOperation::ListNodes, "connection refused");

        let err = TopologyDiscoverer::new(&client, None)
            .discover()
            .await
            .expect_err("list fails");

        match err {
            ControllerError::Discovery { stage, .. } => assert_eq!(stage, "list nodes"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

//! Unit tests for the service reconciler

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::service::build_service;
    use crate::reconciler::{Change, Reconciler};
    use cluster_client::{MockClusterClient, MockOperation};
    use scrape_roles::{DeploymentMode, RoleKind, RoleSpec, SYSTEM_NAMESPACE};

    #[test]
    fn test_build_service_is_headless() {
        let spec = RoleSpec::with_defaults(RoleKind::Scheduler);
        let service = build_service(&spec, DeploymentMode::ProcessManaged);

        assert_eq!(service.metadata.name.as_deref(), Some("kube-scheduler"));
        assert_eq!(service.metadata.namespace.as_deref(), Some("kube-system"));
        let annotations = service.metadata.annotations.expect("annotations set");
        assert_eq!(annotations.get("prometheus.io/port").map(String::as_str), Some("10251"));
        assert_eq!(annotations.get("prometheus.io/scrape").map(String::as_str), Some("true"));

        let svc_spec = service.spec.expect("spec set");
        assert_eq!(svc_spec.cluster_ip.as_deref(), Some("None"));
        let ports = svc_spec.ports.expect("ports set");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].name.as_deref(), Some("http-metrics"));
        assert_eq!(ports[0].port, 10251);
    }

    #[test]
    fn test_build_service_selector_depends_on_mode() {
        let spec = RoleSpec::with_defaults(RoleKind::ControllerManager);

        let pod_managed = build_service(&spec, DeploymentMode::PodManaged);
        let selector = pod_managed
            .spec
            .and_then(|s| s.selector)
            .expect("pod-managed services select the static pods");
        assert_eq!(
            selector.get("component").map(String::as_str),
            Some("kube-controller-manager")
        );

        let process_managed = build_service(&spec, DeploymentMode::ProcessManaged);
        assert!(process_managed.spec.and_then(|s| s.selector).is_none());
    }

    #[test]
    fn test_build_service_node_role_never_selects() {
        let spec = RoleSpec::with_defaults(RoleKind::KubeProxy);
        let service = build_service(&spec, DeploymentMode::PodManaged);
        assert!(service.spec.and_then(|s| s.selector).is_none());
    }

    #[tokio::test]
    async fn test_ensure_service_creates_when_absent() {
        let client = MockClusterClient::new();
        let reconciler = Reconciler::new(&client);
        let spec = RoleSpec::with_defaults(RoleKind::Kubelet);

        let change = reconciler
            .ensure_service(&spec, DeploymentMode::ProcessManaged)
            .await
            .expect("service is created");

        assert_eq!(change, Change::Created);
        let stored = client.service(SYSTEM_NAMESPACE, "kubelet").expect("service stored");
        assert_eq!(
            stored.metadata.labels.and_then(|l| l.get("k8s-app").cloned()).as_deref(),
            Some("kubelet")
        );
        assert_eq!(client.calls_of(MockOperation::CreateService).len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_service_leaves_existing_alone() {
        let client = MockClusterClient::new();
        let spec = RoleSpec::with_defaults(RoleKind::Scheduler);
        // Existing service with a different port is not corrected
        let mut existing = build_service(&spec, DeploymentMode::PodManaged);
        if let Some(ports) = existing.spec.as_mut().and_then(|s| s.ports.as_mut()) {
            ports[0].port = 10259;
        }
        client.add_service(SYSTEM_NAMESPACE, existing);

        let change = Reconciler::new(&client)
            .ensure_service(&spec, DeploymentMode::ProcessManaged)
            .await
            .expect("existing service is fine");

        assert_eq!(change, Change::Unchanged);
        assert!(client.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_service_create_failure_names_role() {
        let client = MockClusterClient::new();
        client.fail_on(MockOperation::CreateService, "forbidden");
        let spec = RoleSpec::with_defaults(RoleKind::KubeProxy);

        let err = Reconciler::new(&client)
            .ensure_service(&spec, DeploymentMode::ProcessManaged)
            .await
            .expect_err("create fails");

        assert!(matches!(err, ControllerError::Reconcile { role: RoleKind::KubeProxy, .. }));
        let message = err.to_string();
        assert!(message.contains("kube-proxy"), "{message}");
        assert!(message.contains("create service"), "{message}");
    }

    #[tokio::test]
    async fn test_ensure_service_get_failure_is_not_treated_as_absent() {
        let client = MockClusterClient::new();
        client.fail_on(MockOperation::GetService, "timeout");
        let spec = RoleSpec::with_defaults(RoleKind::Scheduler);

        let err = Reconciler::new(&client)
            .ensure_service(&spec, DeploymentMode::ProcessManaged)
            .await
            .expect_err("get fails");

        assert!(err.to_string().contains("get service"));
        assert!(client.calls_of(MockOperation::CreateService).is_empty());
    }
}

//! Headless service per role

use super::{Change, Reconciler};
use crate::error::{ControllerError, Operation};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use scrape_roles::{DeploymentMode, RoleSpec, SYSTEM_NAMESPACE};
use tracing::{debug, info};

/// `clusterIP` value that makes a service headless.
const HEADLESS_CLUSTER_IP: &str = "None";

/// Builds the desired service for `spec`.
///
/// The selector is only set when the control plane runs as pods; otherwise
/// the platform would keep clearing the hand-written endpoints.
pub fn build_service(spec: &RoleSpec, mode: DeploymentMode) -> Service {
    let selector = if mode.uses_selectors() {
        spec.selector().cloned()
    } else {
        None
    };

    Service {
        metadata: ObjectMeta {
            name: Some(spec.name().to_string()),
            namespace: Some(SYSTEM_NAMESPACE.to_string()),
            labels: Some(spec.labels().clone()),
            annotations: Some(spec.annotations().clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            cluster_ip: Some(HEADLESS_CLUSTER_IP.to_string()),
            ports: Some(
                spec.ports()
                    .iter()
                    .map(|p| ServicePort {
                        name: Some(p.name.clone()),
                        port: i32::from(p.port),
                        ..Default::default()
                    })
                    .collect(),
            ),
            selector,
            ..Default::default()
        }),
        status: None,
    }
}

impl Reconciler<'_> {
    /// Creates the role's service if it does not exist.
    ///
    /// An existing service is left alone even if it differs from the spec.
    pub async fn ensure_service(
        &self,
        spec: &RoleSpec,
        mode: DeploymentMode,
    ) -> Result<Change, ControllerError> {
        match self.client.get_service(SYSTEM_NAMESPACE, spec.name()).await {
            Ok(_) => {
                debug!("Service {}/{} already exists", SYSTEM_NAMESPACE, spec.name());
                Ok(Change::Unchanged)
            }
            Err(e) if e.is_not_found() => {
                let service = build_service(spec, mode);
                self.client
                    .create_service(SYSTEM_NAMESPACE, &service)
                    .await
                    .map_err(|e| {
                        ControllerError::reconcile(
                            spec,
                            Operation::CreateService,
                            SYSTEM_NAMESPACE,
                            spec.name(),
                            e,
                        )
                    })?;
                info!(
                    "Created service {}/{} for {} (selector: {})",
                    SYSTEM_NAMESPACE,
                    spec.name(),
                    spec.kind(),
                    if service.spec.as_ref().is_some_and(|s| s.selector.is_some()) { "yes" } else { "no" }
                );
                Ok(Change::Created)
            }
            Err(e) => Err(ControllerError::reconcile(
                spec,
                Operation::GetService,
                SYSTEM_NAMESPACE,
                spec.name(),
                e,
            )),
        }
    }
}

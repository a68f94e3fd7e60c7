//! Address list per role
//!
//! Master-scoped endpoints already exist (the platform creates them next to
//! the component) and are only patched. Node-scoped endpoints are created on
//! first run and patched afterwards.
//!
//! Drift is cardinality only: a record is patched when its first subset holds
//! a different number of addresses than discovery found. Replaced IPs with an
//! unchanged count go unnoticed.

use super::{Change, Reconciler};
use crate::error::{ControllerError, Operation};
use k8s_openapi::api::core::v1::{
    EndpointAddress, EndpointPort, EndpointSubset, Endpoints, ObjectReference,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use scrape_roles::{NODE_KIND, RoleSpec, SYSTEM_NAMESPACE};
use serde_json::{Value, json};
use tracing::{debug, info};

/// Whether `existing` has drifted from `desired_count` addresses.
pub fn needs_patch(existing: &Endpoints, desired_count: usize) -> bool {
    match existing.subsets.as_deref() {
        None | Some([]) => true,
        Some([first, ..]) => first.addresses.as_ref().map_or(0, Vec::len) != desired_count,
    }
}

/// One address entry per IP; kubelet entries point back at their Node.
pub fn endpoint_addresses(spec: &RoleSpec, addresses: &[String]) -> Vec<EndpointAddress> {
    addresses
        .iter()
        .map(|ip| EndpointAddress {
            ip: ip.clone(),
            target_ref: spec.targets_nodes().then(|| ObjectReference {
                kind: Some(NODE_KIND.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .collect()
}

fn endpoint_ports(spec: &RoleSpec) -> Vec<EndpointPort> {
    spec.ports()
        .iter()
        .map(|p| EndpointPort {
            name: Some(p.name.clone()),
            port: i32::from(p.port),
            ..Default::default()
        })
        .collect()
}

/// The single subset a role's endpoints should hold.
pub fn build_subset(spec: &RoleSpec, addresses: &[String]) -> EndpointSubset {
    EndpointSubset {
        addresses: Some(endpoint_addresses(spec, addresses)),
        ports: Some(endpoint_ports(spec)),
        ..Default::default()
    }
}

/// Full endpoints record for a node-scoped role.
pub fn build_endpoints(spec: &RoleSpec, addresses: &[String]) -> Endpoints {
    Endpoints {
        metadata: ObjectMeta {
            name: Some(spec.endpoints_name().to_string()),
            namespace: Some(SYSTEM_NAMESPACE.to_string()),
            labels: Some(spec.labels().clone()),
            ..Default::default()
        },
        subsets: Some(vec![build_subset(spec, addresses)]),
    }
}

/// Merge-patch body replacing the whole subset list.
pub fn subsets_patch(spec: &RoleSpec, addresses: &[String]) -> Result<Value, ControllerError> {
    let subset = serde_json::to_value(build_subset(spec, addresses))?;
    Ok(json!({ "subsets": [subset] }))
}

impl Reconciler<'_> {
    /// Patches the endpoints of a master-scoped role when drifted.
    ///
    /// The record is looked up by component name and must already exist.
    pub async fn ensure_master_endpoints(
        &self,
        spec: &RoleSpec,
        addresses: &[String],
    ) -> Result<Change, ControllerError> {
        let name = spec.endpoints_name();
        let existing = self
            .client
            .get_endpoints(SYSTEM_NAMESPACE, name)
            .await
            .map_err(|e| ControllerError::reconcile(spec, Operation::GetEndpoints, SYSTEM_NAMESPACE, name, e))?;

        self.patch_if_drifted(spec, &existing, addresses).await
    }

    /// Creates the endpoints of a node-scoped role, then patches if drifted.
    ///
    /// Returns `Created` when the record was created, even if the follow-up
    /// drift check also patched it.
    pub async fn ensure_node_endpoints(
        &self,
        spec: &RoleSpec,
        addresses: &[String],
    ) -> Result<Change, ControllerError> {
        let name = spec.endpoints_name();
        let (observed, created) = match self.client.get_endpoints(SYSTEM_NAMESPACE, name).await {
            Ok(existing) => (existing, false),
            Err(e) if e.is_not_found() => {
                let desired = build_endpoints(spec, addresses);
                let created = self
                    .client
                    .create_endpoints(SYSTEM_NAMESPACE, &desired)
                    .await
                    .map_err(|e| {
                        ControllerError::reconcile(spec, Operation::CreateEndpoints, SYSTEM_NAMESPACE, name, e)
                    })?;
                info!(
                    "Created endpoints {}/{} for {} with {} addresses",
                    SYSTEM_NAMESPACE,
                    name,
                    spec.kind(),
                    addresses.len()
                );
                (created, true)
            }
            Err(e) => {
                return Err(ControllerError::reconcile(
                    spec,
                    Operation::GetEndpoints,
                    SYSTEM_NAMESPACE,
                    name,
                    e,
                ));
            }
        };

        let change = self.patch_if_drifted(spec, &observed, addresses).await?;
        Ok(if created { Change::Created } else { change })
    }

    async fn patch_if_drifted(
        &self,
        spec: &RoleSpec,
        existing: &Endpoints,
        addresses: &[String],
    ) -> Result<Change, ControllerError> {
        let name = spec.endpoints_name();
        if !needs_patch(existing, addresses.len()) {
            debug!(
                "Endpoints {}/{} already hold {} addresses, not patching",
                SYSTEM_NAMESPACE,
                name,
                addresses.len()
            );
            return Ok(Change::Unchanged);
        }

        let patch = subsets_patch(spec, addresses)?;
        self.client
            .patch_endpoints(SYSTEM_NAMESPACE, name, &patch)
            .await
            .map_err(|e| ControllerError::reconcile(spec, Operation::PatchEndpoints, SYSTEM_NAMESPACE, name, e))?;
        info!(
            "Patched endpoints {}/{} for {} to {} addresses",
            SYSTEM_NAMESPACE,
            name,
            spec.kind(),
            addresses.len()
        );
        Ok(Change::Patched)
    }
}

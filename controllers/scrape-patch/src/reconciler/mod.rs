//! Reconciliation of per-role cluster records.
//!
//! - `service`: headless service per role, create-if-absent only
//! - `endpoints`: address list per role, create-if-absent and patch-if-drifted
//!
//! Both work against `ClusterClientTrait`, so they run unchanged against the
//! real API server and the in-memory mock.

pub mod endpoints;
pub mod service;
#[cfg(test)]
mod service_test;

use cluster_client::ClusterClientTrait;
use scrape_roles::{DeploymentMode, RoleSpec};
use crate::error::ControllerError;
use std::fmt;

/// What a reconcile step did to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Record was already as desired
    Unchanged,
    /// Record did not exist and was created
    Created,
    /// Record existed and its address list was replaced
    Patched,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Unchanged => f.write_str("unchanged"),
            Change::Created => f.write_str("created"),
            Change::Patched => f.write_str("patched"),
        }
    }
}

/// Outcome of reconciling both records of one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleChanges {
    /// Service record outcome
    pub service: Change,
    /// Endpoints record outcome
    pub endpoints: Change,
}

/// Reconciles role records against the cluster.
///
/// Holds nothing but the client; every call recomputes its desired state
/// from the `RoleSpec` and addresses it is given.
pub struct Reconciler<'a> {
    pub(crate) client: &'a dyn ClusterClientTrait,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over `client`.
    pub fn new(client: &'a dyn ClusterClientTrait) -> Self {
        Self { client }
    }

    /// Ensures service and endpoints for a node-scoped role.
    ///
    /// The service comes first so that the endpoints record always has a
    /// service to back.
    pub async fn ensure_node_role(
        &self,
        spec: &RoleSpec,
        mode: DeploymentMode,
        addresses: &[String],
    ) -> Result<RoleChanges, ControllerError> {
        let service = self.ensure_service(spec, mode).await?;
        let endpoints = self.ensure_node_endpoints(spec, addresses).await?;
        Ok(RoleChanges { service, endpoints })
    }
}

//! Command-line configuration.
//!
//! `Args` is the raw clap surface; `Config` is the validated form the rest of
//! the controller works with. Validation happens once, before any cluster call.

use crate::error::ControllerError;
use clap::{ArgAction, Parser, ValueEnum};
use cluster_client::{ConnectionOptions, parse_apiserver_host};
use scrape_roles::{
    CONTROLLER_MANAGER_COMPONENT, KUBE_PROXY_COMPONENT, KUBELET_COMPONENT, RoleKind, RoleSpec,
    SCHEDULER_COMPONENT,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

/// Upper bound for the list timeout; the API server caps watch/list timeouts below 300s.
const MAX_TIMEOUT_SECS: u32 = 290;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Expose control-plane and node metrics endpoints as headless services.
#[derive(Parser, Debug)]
#[command(name = "scrape-patch")]
#[command(about = "Expose kube-controller-manager, kube-scheduler, kubelet and kube-proxy metrics as headless services")]
#[command(version)]
pub struct Args {
    /// The address of the Kubernetes API server to connect to in the format of
    /// protocol://address:port, e.g. http://localhost:8080. If neither this nor
    /// --kubeconfig is given, in-cluster discovery is attempted.
    #[arg(long, env = "APISERVER_HOST", value_name = "URL")]
    pub apiserver_host: Option<String>,

    /// Absolute path to the kubeconfig file
    #[arg(long, env = "KUBECONFIG", value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Server-side timeout for list calls, in seconds
    #[arg(long, default_value_t = 5, value_name = "SECONDS")]
    pub timeout: u32,

    /// Service name for kube-controller-manager
    #[arg(long, default_value = CONTROLLER_MANAGER_COMPONENT)]
    pub controller_svc_name: String,

    /// Metrics port of kube-controller-manager
    #[arg(long, default_value_t = RoleKind::ControllerManager.default_port())]
    pub controller_port: u16,

    /// Service name for kube-scheduler
    #[arg(long, default_value = SCHEDULER_COMPONENT)]
    pub scheduler_svc_name: String,

    /// Metrics port of kube-scheduler
    #[arg(long, default_value_t = RoleKind::Scheduler.default_port())]
    pub scheduler_port: u16,

    /// Service name for the kubelet
    #[arg(long, default_value = KUBELET_COMPONENT)]
    pub kubelet_svc_name: String,

    /// Metrics port of the kubelet
    #[arg(long, default_value_t = RoleKind::Kubelet.default_port())]
    pub kubelet_port: u16,

    /// Expose the kubelet
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub kubelet: bool,

    /// Service name for kube-proxy
    #[arg(long, default_value = KUBE_PROXY_COMPONENT)]
    pub kubeproxy_svc_name: String,

    /// Metrics port of kube-proxy
    #[arg(long, default_value_t = RoleKind::KubeProxy.default_port())]
    pub kubeproxy_port: u16,

    /// Expose kube-proxy
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub kubeproxy: bool,

    /// Default log level; RUST_LOG takes precedence when set
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    pub log_level: LevelFilter,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Role specs for one run. Node-scoped roles are `None` when disabled.
#[derive(Debug, Clone)]
pub struct Roles {
    /// kube-controller-manager
    pub controller_manager: RoleSpec,
    /// kube-scheduler
    pub scheduler: RoleSpec,
    /// kubelet, if enabled
    pub kubelet: Option<RoleSpec>,
    /// kube-proxy, if enabled
    pub kube_proxy: Option<RoleSpec>,
}

impl Roles {
    /// Every enabled role in reconciliation order.
    pub fn enabled(&self) -> impl Iterator<Item = &RoleSpec> {
        [
            Some(&self.controller_manager),
            Some(&self.scheduler),
            self.kubelet.as_ref(),
            self.kube_proxy.as_ref(),
        ]
        .into_iter()
        .flatten()
    }
}

/// Validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// How to reach the API server
    pub connection: ConnectionOptions,
    /// Timeout applied to discovery's list calls
    pub list_timeout_secs: u32,
    /// Role specs, built once
    pub roles: Roles,
}

impl TryFrom<Args> for Config {
    type Error = ControllerError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if let Some(host) = args.apiserver_host.as_deref() {
            parse_apiserver_host(host).map_err(|e| ControllerError::InvalidConfig(e.to_string()))?;
        }
        if args.timeout == 0 || args.timeout > MAX_TIMEOUT_SECS {
            return Err(ControllerError::InvalidConfig(format!(
                "--timeout must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {}",
                args.timeout
            )));
        }

        let controller_manager = role_spec(
            RoleKind::ControllerManager,
            args.controller_svc_name,
            args.controller_port,
        )?;
        let scheduler = role_spec(RoleKind::Scheduler, args.scheduler_svc_name, args.scheduler_port)?;
        let kubelet = args
            .kubelet
            .then(|| role_spec(RoleKind::Kubelet, args.kubelet_svc_name, args.kubelet_port))
            .transpose()?;
        let kube_proxy = args
            .kubeproxy
            .then(|| role_spec(RoleKind::KubeProxy, args.kubeproxy_svc_name, args.kubeproxy_port))
            .transpose()?;

        let roles = Roles {
            controller_manager,
            scheduler,
            kubelet,
            kube_proxy,
        };

        check_record_names(&roles)?;

        Ok(Config {
            connection: ConnectionOptions {
                apiserver_host: args.apiserver_host,
                kubeconfig: args.kubeconfig,
            },
            list_timeout_secs: args.timeout,
            roles,
        })
    }
}

impl Config {
    /// Logs the effective configuration.
    pub fn log_summary(&self) {
        info!("Configuration:");
        info!(
            "  API server: {}",
            self.connection.apiserver_host.as_deref().unwrap_or("in-cluster / kubeconfig")
        );
        if let Some(path) = &self.connection.kubeconfig {
            info!("  Kubeconfig: {}", path.display());
        }
        info!("  List timeout: {}s", self.list_timeout_secs);
        for spec in self.roles.enabled() {
            let ports: Vec<String> = spec.ports().iter().map(|p| format!("{}:{}", p.name, p.port)).collect();
            info!("  {}: service {} ports [{}]", spec.kind(), spec.name(), ports.join(", "));
        }
    }
}

/// Each service and endpoints name may belong to one enabled role only.
fn check_record_names(roles: &Roles) -> Result<(), ControllerError> {
    let mut owners: HashMap<&str, RoleKind> = HashMap::new();
    for spec in roles.enabled() {
        let mut names = vec![spec.name(), spec.endpoints_name()];
        names.dedup();
        for name in names {
            if let Some(owner) = owners.insert(name, spec.kind()) {
                return Err(ControllerError::InvalidConfig(format!(
                    "record name {name:?} is used by more than one role ({owner} and {})",
                    spec.kind()
                )));
            }
        }
    }
    Ok(())
}

fn role_spec(kind: RoleKind, name: String, port: u16) -> Result<RoleSpec, ControllerError> {
    validate_service_name(&name)
        .map_err(|reason| ControllerError::InvalidConfig(format!("{kind} service name {name:?} {reason}")))?;
    if port == 0 {
        return Err(ControllerError::InvalidConfig(format!("{kind} port must not be 0")));
    }
    Ok(RoleSpec::new(kind, name, port))
}

/// Service names must be RFC 1035 labels.
fn validate_service_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() || name.len() > 63 {
        return Err("must be 1-63 characters long");
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err("must start with a lowercase letter");
    }
    if !name.ends_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit()) {
        return Err("must end with a lowercase letter or digit");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("may only contain lowercase letters, digits and '-'");
    }
    Ok(())
}

//! The Validator: a deterministic battery of per-section and
//! cross-field checks producing a severity-tagged issue
//! list. Nothing here performs I/O; it is a pure function of a
//! `ClusterModel`.
use std::net::Ipv4Addr;

use crate::model::{ClusterModel, OverlayChoice, RoleSpec};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Dotted path, e.g. `"network.wireguard"`.
    pub path: String,
    pub field: String,
    pub message: String,
    pub value: Option<String>,
    pub remediation: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        severity: Severity,
        path: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            severity,
            path: path.into(),
            field: field.into(),
            message: message.into(),
            value: None,
            remediation: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_remediation(mut self, hint: impl Into<String>) -> Self {
        self.remediation = Some(hint.into());
        self
    }

    fn error(path: &str, field: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, path, field, message)
    }

    fn warning(path: &str, field: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, path, field, message)
    }

    fn info(path: &str, field: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, path, field, message)
    }
}

/// A caller-registered predicate, run last.
pub type CustomCheck = Box<dyn Fn(&ClusterModel) -> Vec<ValidationIssue> + Send + Sync>;

#[derive(Default)]
pub struct Validator {
    custom_checks: Vec<CustomCheck>,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    pub fn register(&mut self, check: CustomCheck) {
        self.custom_checks.push(check);
    }

    pub fn validate(&self, model: &ClusterModel) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        issues.extend(check_metadata(model));
        issues.extend(check_providers(model));
        issues.extend(check_network(model));
        issues.extend(check_nodes(model));
        issues.extend(check_kubernetes(model));
        issues.extend(check_addons(model));
        issues.extend(check_cross_field(model));
        for check in &self.custom_checks {
            issues.extend(check(model));
        }
        issues
    }

    /// `true` when any issue is error-severity; this is
    /// what aborts the build.
    pub fn has_errors(issues: &[ValidationIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }
}

fn is_dns_subdomain(name: &str) -> bool {
    if name.is_empty() || name.len() > 253 {
        return false;
    }
    name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().next().map_or(false, |c| c.is_ascii_alphanumeric())
            && label.chars().last().map_or(false, |c| c.is_ascii_alphanumeric())
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

fn check_metadata(model: &ClusterModel) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if model.metadata.name.is_empty() {
        issues.push(
            ValidationIssue::error("metadata", "name", "metadata.name is required")
                .with_remediation("add (metadata (name \"my-cluster\"))"),
        );
    } else if !is_dns_subdomain(&model.metadata.name) {
        issues.push(
            ValidationIssue::error(
                "metadata",
                "name",
                "metadata.name must be a valid DNS subdomain",
            )
            .with_value(model.metadata.name.clone()),
        );
    }
    if model.metadata.environment == "development" {
        // Matches the seed scenario: unset environment defaults quietly
        // but is surfaced so the operator can confirm it was intentional.
        issues.push(ValidationIssue::info(
            "metadata",
            "environment",
            "environment not set, defaulted to 'development'",
        ));
    }
    issues
}

fn check_providers(model: &ClusterModel) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if !model.providers.any_enabled() {
        issues.push(
            ValidationIssue::error("providers", "providers", "no provider enabled")
                .with_remediation("enable at least one of aws, gcp, azure, digitalocean, linode"),
        );
    }
    issues
}

fn parse_cidr_v4(cidr: &str) -> Option<(u32, u8)> {
    let mut parts = cidr.splitn(2, '/');
    let addr = parts.next()?.parse::<Ipv4Addr>().ok()?;
    let prefix: u8 = parts.next()?.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    Some((u32::from(addr), prefix))
}

fn cidr_overlaps(a: &str, b: &str) -> bool {
    let (a_addr, a_prefix) = match parse_cidr_v4(a) {
        Some(v) => v,
        None => return false,
    };
    let (b_addr, b_prefix) = match parse_cidr_v4(b) {
        Some(v) => v,
        None => return false,
    };
    let shortest = a_prefix.min(b_prefix);
    let mask: u32 = if shortest == 0 { 0 } else { !0u32 << (32 - shortest) };
    (a_addr & mask) == (b_addr & mask)
}

fn check_network(model: &ClusterModel) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let wants_overlay = model.network.wireguard.enabled || model.network.tailscale.enabled;
    match model.network.overlay_choice() {
        crate::model::OverlayChoice::None if wants_overlay => {
            // both were set: handled by cross-field check below as an
            // explicit "cannot enable both" error, not duplicated here.
        }
        crate::model::OverlayChoice::None => {
            issues.push(ValidationIssue::warning(
                "network",
                "overlay",
                "neither wireguard nor tailscale enabled; cluster will have no overlay mesh",
            ));
        }
        _ => {}
    }
    issues
}

fn check_nodes(model: &ClusterModel) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if model.nodes.is_empty() && model.node_pools.is_empty() {
        issues.push(ValidationIssue::error(
            "nodes",
            "nodes",
            "at least one of nodes or nodePools must be non-empty",
        ));
    }
    for pool in &model.node_pools {
        if !model.providers.is_enabled(&pool.provider) {
            issues.push(
                ValidationIssue::error(
                    &format!("nodePools.{}", pool.name),
                    "provider",
                    format!(
                        "pool '{}' references provider '{}' which is not enabled",
                        pool.name, pool.provider
                    ),
                )
                .with_value(pool.provider.clone()),
            );
        }
        if pool.spot && pool.roles.contains(&RoleSpec::ControlPlane) {
            issues.push(ValidationIssue::warning(
                &format!("nodePools.{}", pool.name),
                "spot",
                "spot instances used for control-plane nodes",
            ));
        }
    }
    for node in &model.nodes {
        if !model.providers.is_enabled(&node.provider) {
            issues.push(
                ValidationIssue::error(
                    &format!("nodes.{}", node.name),
                    "provider",
                    format!(
                        "node '{}' references provider '{}' which is not enabled",
                        node.name, node.provider
                    ),
                )
                .with_value(node.provider.clone()),
            );
        }
        if node.spot && node.roles.contains(&RoleSpec::ControlPlane) {
            issues.push(ValidationIssue::warning(
                &format!("nodes.{}", node.name),
                "spot",
                "spot instances used for control-plane nodes",
            ));
        }
    }
    issues
}

fn check_kubernetes(model: &ClusterModel) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if cidr_overlaps(&model.kubernetes.pod_cidr, &model.kubernetes.service_cidr) {
        issues.push(
            ValidationIssue::error(
                "kubernetes",
                "pod_cidr",
                "pod CIDR and service CIDR overlap",
            )
            .with_value(format!(
                "{} overlaps {}",
                model.kubernetes.pod_cidr, model.kubernetes.service_cidr
            )),
        );
    }
    if let Some(version) = &model.cluster_spec.version {
        // semver already rejected anything unparsable at mapping time; a
        // pre-release/build tag is unusual enough in a cluster version to
        // flag as an unknown kubernetes version syntax warning.
        if !version.pre.is_empty() {
            issues.push(ValidationIssue::warning(
                "clusterSpec",
                "version",
                "kubernetes version has an unusual pre-release suffix",
            ));
        }
    }
    issues
}

fn check_addons(model: &ClusterModel) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if model.metadata.environment == "production" && !model.addons.backup.enabled {
        issues.push(ValidationIssue::warning(
            "addons",
            "backup",
            "production environment without backup addon enabled",
        ));
    }
    issues
}

fn check_cross_field(model: &ClusterModel) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if model.network.wireguard.enabled && model.network.tailscale.enabled {
        issues.push(ValidationIssue::error(
            "network",
            "overlay",
            "cannot enable both wireguard and tailscale overlays",
        ));
    }

    if model.cluster_spec.high_availability {
        let control_planes = model
            .nodes
            .iter()
            .filter(|n| n.roles.contains(&RoleSpec::ControlPlane))
            .count()
            + model
                .node_pools
                .iter()
                .filter(|p| p.roles.contains(&RoleSpec::ControlPlane))
                .map(|p| p.count as usize)
                .sum::<usize>();
        if control_planes < 3 {
            issues.push(ValidationIssue::warning(
                "clusterSpec",
                "highAvailability",
                format!(
                    "highAvailability enabled with only {} control-plane node(s); at least 3 recommended",
                    control_planes
                ),
            ));
        } else if control_planes % 2 == 0 {
            issues.push(ValidationIssue::warning(
                "clusterSpec",
                "highAvailability",
                format!(
                    "even control-plane count ({}); an odd count is preferred for quorum",
                    control_planes
                ),
            ));
        }
    }

    if OverlayChoice::None == model.network.overlay_choice()
        && !model.network.wireguard.enabled
        && !model.network.tailscale.enabled
        && model.network.firewall.is_empty()
    {
        // No overlay and no firewall rules requested at all: nothing
        // further to cross-check, this is a bare single-cloud cluster.
    }

    issues
}

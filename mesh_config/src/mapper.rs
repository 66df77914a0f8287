//! Projects an evaluated `(cluster ...)` form onto a typed
//! `ClusterModel`. Unknown top-level heads are ignored with an info
//! diagnostic; known heads with a malformed body produce a warning and
//! fall back to the field's default rather than aborting the walk.
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::str::FromStr;

use semver::Version;

use mesh_definitions::model::{
    Addons, ArgoCdAddon, BackupAddon, BastionDescriptor, ClusterModel, ClusterSpec, CostAddon,
    Distribution, FirewallRule, Kubernetes, Metadata, MonitoringAddon, Network, NodePool,
    NodeSpec, ProviderRecord, Providers, Rke2Options, RoleSpec, SaltAddon, Security,
    TailscaleConfig, VpcDescriptor, WireguardConfig,
};
use mesh_definitions::validate::Severity;
use mesh_definitions::{ErrorKind, Result, Secret};

use crate::expr::Expr;

#[derive(Debug, Clone, PartialEq)]
pub struct MapperDiagnostic {
    pub severity: Severity,
    pub path: String,
    pub message: String,
}

fn warn(path: &str, message: impl Into<String>) -> MapperDiagnostic {
    MapperDiagnostic {
        severity: Severity::Warning,
        path: path.to_string(),
        message: message.into(),
    }
}

fn info(path: &str, message: impl Into<String>) -> MapperDiagnostic {
    MapperDiagnostic {
        severity: Severity::Info,
        path: path.to_string(),
        message: message.into(),
    }
}

fn head_and_rest(item: &Expr) -> Option<(&str, &[Expr])> {
    let items = item.as_list()?;
    let head = items.first()?.as_str()?;
    Some((head, &items[1..]))
}

fn first_str(rest: &[Expr]) -> Option<String> {
    rest.first().and_then(Expr::as_str).map(|s| s.to_string())
}

fn first_bool(rest: &[Expr]) -> Option<bool> {
    match rest.first() {
        Some(Expr::Bool(b)) => Some(*b),
        _ => None,
    }
}

fn first_num(rest: &[Expr]) -> Option<f64> {
    rest.first().and_then(Expr::as_number)
}

fn str_list(rest: &[Expr]) -> Vec<String> {
    rest.iter().filter_map(Expr::as_str).map(|s| s.to_string()).collect()
}

/// Walks the root evaluated form. Requires a `(cluster ...)` head.
pub fn map_cluster(root: &Expr) -> Result<(ClusterModel, Vec<MapperDiagnostic>)> {
    let items = root
        .as_list()
        .ok_or_else(|| ErrorKind::ConfigEvalError("cluster".into(), "root form must be a list".into()))?;
    if items.first().and_then(Expr::as_str) != Some("cluster") {
        return Err(
            ErrorKind::ConfigEvalError("cluster".into(), "root form must have head 'cluster'".into()).into(),
        );
    }

    let mut diags = Vec::new();
    let mut model = ClusterModel::default();
    for item in &items[1..] {
        match head_and_rest(item) {
            Some(("metadata", body)) => model.metadata = map_metadata(body, &mut diags),
            Some(("cluster", body)) => model.cluster_spec = map_cluster_spec(body, &mut diags),
            Some(("providers", body)) => model.providers = map_providers(body, &mut diags),
            Some(("network", body)) => model.network = map_network(body, &mut diags),
            Some(("security", body)) => model.security = map_security(body, &mut diags),
            Some(("nodes", body)) => model.nodes = map_nodes(body, &mut diags),
            Some(("node-pools", body)) => model.node_pools = map_node_pools(body, &mut diags),
            Some(("kubernetes", body)) => model.kubernetes = map_kubernetes(body, &mut diags),
            Some(("addons", body)) => model.addons = map_addons(body, &mut diags),
            Some(("monitoring", body)) => model.addons.monitoring = map_monitoring(body, &mut diags),
            Some(("storage", _)) | Some(("load-balancer", _)) => {
                // Recognized sub-forms without a counterpart in the typed
                // model yet; accepted silently rather than flagged unknown.
            }
            Some((other, _)) => diags.push(info(other, "unrecognized section ignored")),
            None => diags.push(warn("cluster", "expected a named sub-form")),
        }
    }
    Ok((model, diags))
}

fn map_metadata(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Metadata {
    let mut m = Metadata::default();
    for item in body {
        match head_and_rest(item) {
            Some(("name", rest)) => match first_str(rest) {
                Some(v) => m.name = v,
                None => diags.push(warn("metadata.name", "expected a string value")),
            },
            Some(("environment", rest)) => match first_str(rest) {
                Some(v) => m.environment = v,
                None => diags.push(warn("metadata.environment", "expected a string value")),
            },
            Some(("owner", rest)) => m.owner = first_str(rest),
            Some(("labels", rest)) => m.labels = map_kv_pairs(rest, diags, "metadata.labels"),
            Some(("annotations", rest)) => m.annotations = map_kv_pairs(rest, diags, "metadata.annotations"),
            Some((other, _)) => diags.push(info(&format!("metadata.{}", other), "unknown field ignored")),
            None => diags.push(warn("metadata", "expected a (field value) form")),
        }
    }
    m
}

fn map_kv_pairs(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>, path: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for item in rest {
        match item.as_list() {
            Some([k, v]) if k.as_str().is_some() && v.as_str().is_some() => {
                out.insert(k.as_str().unwrap().to_string(), v.as_str().unwrap().to_string());
            }
            _ => diags.push(warn(path, "expected a (key value) pair of strings")),
        }
    }
    out
}

fn map_cluster_spec(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> ClusterSpec {
    let mut c = ClusterSpec::default();
    for item in body {
        match head_and_rest(item) {
            Some(("distribution", rest)) => match first_str(rest).and_then(|s| Distribution::from_str(&s).ok()) {
                Some(d) => c.distribution = d,
                None => diags.push(warn("cluster.distribution", "unrecognized distribution")),
            },
            Some(("version", rest)) => match first_str(rest) {
                Some(v) => {
                    let trimmed = v.trim_start_matches('v');
                    match Version::parse(trimmed) {
                        Ok(parsed) => c.version = Some(parsed),
                        Err(_) => diags.push(warn("cluster.version", "not a valid semver")),
                    }
                }
                None => diags.push(warn("cluster.version", "expected a string value")),
            },
            Some(("high-availability", rest)) => c.high_availability = first_bool(rest).unwrap_or(false),
            Some(("multi-cloud", rest)) => c.multi_cloud = first_bool(rest).unwrap_or(false),
            Some((other, _)) => diags.push(info(&format!("cluster.{}", other), "unknown field ignored")),
            None => diags.push(warn("cluster", "expected a (field value) form")),
        }
    }
    c
}

fn map_providers(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Providers {
    let mut p = Providers::default();
    for item in body {
        match head_and_rest(item) {
            Some((name @ ("aws" | "gcp" | "azure" | "digitalocean" | "linode"), rest)) => {
                let record = map_provider_record(rest, diags, name);
                match name {
                    "aws" => p.aws = record,
                    "gcp" => p.gcp = record,
                    "azure" => p.azure = record,
                    "digitalocean" => p.digitalocean = record,
                    "linode" => p.linode = record,
                    _ => unreachable!(),
                }
            }
            Some((other, _)) => diags.push(info(&format!("providers.{}", other), "unrecognized provider ignored")),
            None => diags.push(warn("providers", "expected a named provider form")),
        }
    }
    p
}

fn map_provider_record(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>, provider: &str) -> ProviderRecord {
    let mut r = ProviderRecord::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("enabled", v)) => r.enabled = first_bool(v).unwrap_or(false),
            Some(("credentials", v)) => r.credentials = first_str(v).map(Secret::new),
            Some(("region", v)) => r.region = first_str(v),
            Some(("vpc", v)) => r.vpc = Some(map_vpc(v)),
            Some((other, _)) => {
                diags.push(info(&format!("providers.{}.{}", provider, other), "unknown field ignored"))
            }
            None => diags.push(warn(&format!("providers.{}", provider), "expected a (field value) form")),
        }
    }
    r
}

fn map_vpc(rest: &[Expr]) -> VpcDescriptor {
    let mut v = VpcDescriptor::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("cidr", r)) => v.cidr = first_str(r),
            Some(("existing-id", r)) => v.existing_id = first_str(r),
            _ => {}
        }
    }
    v
}

fn map_network(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Network {
    let mut n = Network::default();
    for item in body {
        match head_and_rest(item) {
            Some(("wireguard", rest)) => n.wireguard = map_wireguard(rest, diags),
            Some(("tailscale", rest)) => n.tailscale = map_tailscale(rest, diags),
            Some(("firewall", rest)) => n.firewall = map_firewall(rest, diags),
            Some((other, _)) => diags.push(info(&format!("network.{}", other), "unknown field ignored")),
            None => diags.push(warn("network", "expected a named form")),
        }
    }
    n
}

fn map_wireguard(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> WireguardConfig {
    let mut w = WireguardConfig::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("enabled", v)) => w.enabled = first_bool(v).unwrap_or(false),
            Some(("subnet", v)) => {
                if let Some(s) = first_str(v) {
                    w.subnet = s;
                }
            }
            Some(("port", v)) => {
                if let Some(n) = first_num(v) {
                    w.port = n as u16;
                }
            }
            Some(("mtu", v)) => {
                if let Some(n) = first_num(v) {
                    w.mtu = n as u32;
                }
            }
            Some(("keepalive-seconds", v)) => {
                if let Some(n) = first_num(v) {
                    w.keepalive_seconds = n as u32;
                }
            }
            Some((other, _)) => diags.push(info(&format!("network.wireguard.{}", other), "unknown field ignored")),
            None => diags.push(warn("network.wireguard", "expected a (field value) form")),
        }
    }
    w
}

fn map_tailscale(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> TailscaleConfig {
    let mut t = TailscaleConfig::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("enabled", v)) => t.enabled = first_bool(v).unwrap_or(false),
            Some(("create", v)) => t.create = first_bool(v).unwrap_or(false),
            Some(("coordinator-url", v)) => t.coordinator_url = first_str(v),
            Some(("namespace", v)) => t.namespace = first_str(v),
            Some(("tags", v)) => t.tags = str_list(v),
            Some(("accept-routes", v)) => t.accept_routes = first_bool(v).unwrap_or(false),
            Some((other, _)) => diags.push(info(&format!("network.tailscale.{}", other), "unknown field ignored")),
            None => diags.push(warn("network.tailscale", "expected a (field value) form")),
        }
    }
    t
}

fn map_firewall(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Vec<FirewallRule> {
    let mut out = Vec::new();
    for item in rest {
        match head_and_rest(item) {
            Some(("rule", fields)) => out.push(map_firewall_rule(fields, diags)),
            _ => diags.push(warn("network.firewall", "expected a (rule ...) form")),
        }
    }
    out
}

fn map_firewall_rule(fields: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> FirewallRule {
    let mut r = FirewallRule {
        protocol: "tcp".into(),
        ..Default::default()
    };
    for item in fields {
        match head_and_rest(item) {
            Some(("name", v)) => {
                if let Some(s) = first_str(v) {
                    r.name = s;
                }
            }
            Some(("port", v)) => {
                if let Some(n) = first_num(v) {
                    r.port = n as u16;
                }
            }
            Some(("protocol", v)) => {
                if let Some(s) = first_str(v) {
                    r.protocol = s;
                }
            }
            Some(("cidr", v)) => r.cidr = first_str(v),
            Some((other, _)) => diags.push(info(&format!("network.firewall.rule.{}", other), "unknown field ignored")),
            None => diags.push(warn("network.firewall.rule", "expected a (field value) form")),
        }
    }
    r
}

fn map_security(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Security {
    let mut s = Security {
        ssh_port: 22,
        ..Default::default()
    };
    for item in body {
        match head_and_rest(item) {
            Some(("ssh-key-path", v)) => s.ssh_key_path = first_str(v),
            Some(("authorized-keys", v)) => s.authorized_keys = str_list(v),
            Some(("ssh-port", v)) => {
                if let Some(n) = first_num(v) {
                    s.ssh_port = n as u16;
                }
            }
            Some(("bastion", v)) => s.bastion = Some(map_bastion(v, diags)),
            Some((other, _)) => diags.push(info(&format!("security.{}", other), "unknown field ignored")),
            None => diags.push(warn("security", "expected a (field value) form")),
        }
    }
    s
}

fn map_bastion(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> BastionDescriptor {
    let mut b = BastionDescriptor {
        port: 22,
        user: "root".into(),
        ..Default::default()
    };
    for item in rest {
        match head_and_rest(item) {
            Some(("host", v)) => {
                if let Some(s) = first_str(v) {
                    b.host = s;
                }
            }
            Some(("port", v)) => {
                if let Some(n) = first_num(v) {
                    b.port = n as u16;
                }
            }
            Some(("user", v)) => {
                if let Some(s) = first_str(v) {
                    b.user = s;
                }
            }
            Some((other, _)) => diags.push(info(&format!("security.bastion.{}", other), "unknown field ignored")),
            None => diags.push(warn("security.bastion", "expected a (field value) form")),
        }
    }
    b
}

fn map_kubernetes(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Kubernetes {
    let mut k = Kubernetes::default();
    for item in body {
        match head_and_rest(item) {
            Some(("network-plugin", v)) => {
                if let Some(s) = first_str(v) {
                    k.network_plugin = s;
                }
            }
            Some(("pod-cidr", v)) => {
                if let Some(s) = first_str(v) {
                    k.pod_cidr = s;
                }
            }
            Some(("service-cidr", v)) => {
                if let Some(s) = first_str(v) {
                    k.service_cidr = s;
                }
            }
            Some(("rke2", v)) => k.rke2 = Some(map_rke2(v, diags)),
            Some((other, _)) => diags.push(info(&format!("kubernetes.{}", other), "unknown field ignored")),
            None => diags.push(warn("kubernetes", "expected a (field value) form")),
        }
    }
    k
}

fn map_rke2(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Rke2Options {
    let mut r = Rke2Options::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("cni", v)) => r.cni = first_str(v),
            Some(("disable", v)) => r.disable = str_list(v),
            Some(("server-args", v)) => r.server_args = str_list(v),
            Some((other, _)) => diags.push(info(&format!("kubernetes.rke2.{}", other), "unknown field ignored")),
            None => diags.push(warn("kubernetes.rke2", "expected a (field value) form")),
        }
    }
    r
}

fn map_addons(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Addons {
    let mut a = Addons::default();
    for item in body {
        match head_and_rest(item) {
            Some(("argocd", v)) => a.argocd = map_argocd(v, diags),
            Some(("salt", v)) => a.salt = map_salt(v, diags),
            Some(("monitoring", v)) => a.monitoring = map_monitoring(v, diags),
            Some(("backup", v)) => a.backup = map_backup(v, diags),
            Some(("cost", v)) => a.cost = map_cost(v, diags),
            Some((other, _)) => diags.push(info(&format!("addons.{}", other), "unknown field ignored")),
            None => diags.push(warn("addons", "expected a named form")),
        }
    }
    a
}

fn map_argocd(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> ArgoCdAddon {
    let mut x = ArgoCdAddon::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("enabled", v)) => x.enabled = first_bool(v).unwrap_or(false),
            Some(("repo-url", v)) => x.repo_url = first_str(v),
            Some((other, _)) => diags.push(info(&format!("addons.argocd.{}", other), "unknown field ignored")),
            None => diags.push(warn("addons.argocd", "expected a (field value) form")),
        }
    }
    x
}

fn map_salt(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> SaltAddon {
    let mut x = SaltAddon::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("enabled", v)) => x.enabled = first_bool(v).unwrap_or(false),
            Some(("master", v)) => x.master = first_str(v),
            Some((other, _)) => diags.push(info(&format!("addons.salt.{}", other), "unknown field ignored")),
            None => diags.push(warn("addons.salt", "expected a (field value) form")),
        }
    }
    x
}

fn map_monitoring(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> MonitoringAddon {
    let mut x = MonitoringAddon::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("enabled", v)) => x.enabled = first_bool(v).unwrap_or(false),
            Some(("retention-days", v)) => x.retention_days = first_num(v).map(|n| n as u32),
            Some((other, _)) => diags.push(info(&format!("addons.monitoring.{}", other), "unknown field ignored")),
            None => diags.push(warn("addons.monitoring", "expected a (field value) form")),
        }
    }
    x
}

fn map_backup(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> BackupAddon {
    let mut x = BackupAddon::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("enabled", v)) => x.enabled = first_bool(v).unwrap_or(false),
            Some(("schedule", v)) => x.schedule = first_str(v),
            Some(("retention-days", v)) => x.retention_days = first_num(v).map(|n| n as u32),
            Some((other, _)) => diags.push(info(&format!("addons.backup.{}", other), "unknown field ignored")),
            None => diags.push(warn("addons.backup", "expected a (field value) form")),
        }
    }
    x
}

fn map_cost(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> CostAddon {
    let mut x = CostAddon::default();
    for item in rest {
        match head_and_rest(item) {
            Some(("enabled", v)) => x.enabled = first_bool(v).unwrap_or(false),
            Some(("budget-monthly-usd", v)) => x.budget_monthly_usd = first_num(v),
            Some((other, _)) => diags.push(info(&format!("addons.cost.{}", other), "unknown field ignored")),
            None => diags.push(warn("addons.cost", "expected a (field value) form")),
        }
    }
    x
}

const NODE_FIELD_HEADS: &[&str] = &["name", "provider", "region", "size", "image", "roles", "spot"];
const POOL_FIELD_HEADS: &[&str] = &["name", "provider", "region", "size", "image", "roles", "count", "spot"];

/// A section body is either one record with its fields flattened
/// directly into the section (the single-node shorthand), or a list of
/// `wrapper_head`-tagged records.
fn section_as_records(items: &[Expr], field_heads: &[&str], wrapper_head: &str) -> Vec<Vec<Expr>> {
    if !items.is_empty()
        && items
            .iter()
            .all(|it| it.head().map(|h| field_heads.contains(&h)).unwrap_or(false))
    {
        return vec![items.to_vec()];
    }
    items
        .iter()
        .filter_map(|it| {
            if it.head() == Some(wrapper_head) {
                it.as_list().map(|l| l[1..].to_vec())
            } else {
                None
            }
        })
        .collect()
}

fn map_nodes(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Vec<NodeSpec> {
    section_as_records(body, NODE_FIELD_HEADS, "node")
        .iter()
        .map(|fields| map_node_spec(fields, diags))
        .collect()
}

fn map_node_spec(fields: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> NodeSpec {
    let mut name = String::new();
    let mut provider = String::new();
    let mut region = None;
    let mut size = "small".to_string();
    let mut image = None;
    let mut roles = BTreeSet::new();
    let mut spot = false;
    for item in fields {
        match head_and_rest(item) {
            Some(("name", v)) => {
                if let Some(s) = first_str(v) {
                    name = s;
                }
            }
            Some(("provider", v)) => {
                if let Some(s) = first_str(v) {
                    provider = s;
                }
            }
            Some(("region", v)) => region = first_str(v),
            Some(("size", v)) => {
                if let Some(s) = first_str(v) {
                    size = s;
                }
            }
            Some(("image", v)) => image = first_str(v),
            Some(("roles", v)) => roles = map_roles(v, diags, "nodes.roles"),
            Some(("spot", v)) => spot = first_bool(v).unwrap_or(false),
            Some((other, _)) => diags.push(info(&format!("nodes.{}", other), "unknown field ignored")),
            None => diags.push(warn("nodes", "expected a (field value) form")),
        }
    }
    if name.is_empty() {
        diags.push(warn("nodes.name", "node is missing a name"));
    }
    NodeSpec {
        name,
        provider,
        region,
        size,
        image,
        roles,
        spot,
    }
}

fn map_roles(rest: &[Expr], diags: &mut Vec<MapperDiagnostic>, path: &str) -> BTreeSet<RoleSpec> {
    let mut out = BTreeSet::new();
    for v in rest {
        if let Some(sym) = v.as_str() {
            match normalize_role(sym) {
                Some(r) => {
                    out.insert(r);
                }
                None => diags.push(warn(path, format!("unknown role '{}'", sym))),
            }
        }
    }
    out
}

fn normalize_role(raw: &str) -> Option<RoleSpec> {
    match raw {
        "controlplane" | "master" | "server" => Some(RoleSpec::ControlPlane),
        "etcd" => Some(RoleSpec::Etcd),
        "worker" => Some(RoleSpec::Worker),
        _ => None,
    }
}

fn map_node_pools(body: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> Vec<NodePool> {
    section_as_records(body, POOL_FIELD_HEADS, "pool")
        .iter()
        .map(|fields| map_node_pool(fields, diags))
        .collect()
}

fn map_node_pool(fields: &[Expr], diags: &mut Vec<MapperDiagnostic>) -> NodePool {
    let mut name = String::new();
    let mut provider = String::new();
    let mut region = None;
    let mut size = "small".to_string();
    let mut image = None;
    let mut roles = BTreeSet::new();
    let mut count = 0u32;
    let mut spot = false;
    for item in fields {
        match head_and_rest(item) {
            Some(("name", v)) => {
                if let Some(s) = first_str(v) {
                    name = s;
                }
            }
            Some(("provider", v)) => {
                if let Some(s) = first_str(v) {
                    provider = s;
                }
            }
            Some(("region", v)) => region = first_str(v),
            Some(("size", v)) => {
                if let Some(s) = first_str(v) {
                    size = s;
                }
            }
            Some(("image", v)) => image = first_str(v),
            Some(("roles", v)) => roles = map_roles(v, diags, "node-pools.roles"),
            Some(("count", v)) => count = first_num(v).unwrap_or(0.0) as u32,
            Some(("spot", v)) => spot = first_bool(v).unwrap_or(false),
            Some((other, _)) => diags.push(info(&format!("node-pools.{}", other), "unknown field ignored")),
            None => diags.push(warn("node-pools", "expected a (field value) form")),
        }
    }
    if name.is_empty() {
        diags.push(warn("node-pools.name", "pool is missing a name"));
    }
    NodePool {
        name,
        provider,
        region,
        size,
        image,
        roles,
        count,
        spot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::parse_root;

    #[test]
    fn minimal_config_maps_one_node_and_one_provider() {
        let src = r#"(cluster
            (metadata (name "c1"))
            (providers (aws (enabled true) (region "us-east-1")))
            (nodes (name "m") (provider "aws") (roles controlplane)))"#;
        let root = parse_root(src).unwrap();
        let (model, diags) = map_cluster(&root).unwrap();
        assert_eq!(model.metadata.name, "c1");
        assert!(model.providers.is_enabled("aws"));
        assert_eq!(model.nodes.len(), 1);
        assert!(model.nodes[0].roles.contains(&RoleSpec::ControlPlane));
        assert!(diags.iter().all(|d| d.severity != Severity::Error));
    }

    #[test]
    fn multiple_explicit_nodes_use_node_wrapper() {
        let src = r#"(cluster
            (metadata (name "ha"))
            (providers (aws (enabled true)))
            (nodes
              (node (name "cp-1") (provider "aws") (roles controlplane))
              (node (name "cp-2") (provider "aws") (roles controlplane))))"#;
        let root = parse_root(src).unwrap();
        let (model, _diags) = map_cluster(&root).unwrap();
        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.nodes[0].name, "cp-1");
        assert_eq!(model.nodes[1].name, "cp-2");
    }

    #[test]
    fn unknown_top_level_head_is_an_info_diagnostic_not_fatal() {
        let src = r#"(cluster (metadata (name "c1")) (frobnicate (x 1)))"#;
        let root = parse_root(src).unwrap();
        let (_model, diags) = map_cluster(&root).unwrap();
        assert!(diags
            .iter()
            .any(|d| d.severity == Severity::Info && d.path == "frobnicate"));
    }

    #[test]
    fn missing_cluster_head_is_an_error() {
        let root = parse_root("(notcluster (x 1))").unwrap();
        assert!(map_cluster(&root).is_err());
    }

    #[test]
    fn dual_overlay_is_mapped_without_validation_here() {
        let src = r#"(cluster
            (network (wireguard (enabled true)) (tailscale (enabled true))))"#;
        let root = parse_root(src).unwrap();
        let (model, _diags) = map_cluster(&root).unwrap();
        assert!(model.network.wireguard.enabled);
        assert!(model.network.tailscale.enabled);
    }
}

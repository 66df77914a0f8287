//! Concrete phase implementations for the fixed graph in `orchestrator::mod`.
//! Each phase is deliberately small and delegates all the real work to
//! the node inventory, SSH pool, health checker and VPN overlay modules,
//! or to the `CloudProvider`/`StateEngine` adapters; this file only
//! sequences calls and threads outputs.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use mesh_definitions::adapters::{CloudProvider, ResourceDeclaration, StateEngine};
use mesh_definitions::{ErrorKind, NodeState, Result, Secret};

use super::{Phase, PhaseCtx, PhaseOutcome};
use crate::health::{wait_for_ready, Probe};
use crate::ssh_pool::SshPool;
use crate::vpn::{build_peer_tables, VpnProvider};

fn resource_id(cluster: &str, role: &str, index: Option<usize>) -> String {
    match index {
        Some(i) => format!("{}-{}-{}", cluster, role, i),
        None => format!("{}-{}", cluster, role),
    }
}

/// Phase 0: generate (or load) the SSH keypair used to bootstrap every node.
pub struct GenerateSshKeyPhase;

#[async_trait::async_trait]
impl Phase for GenerateSshKeyPhase {
    fn name(&self) -> &'static str {
        "generate-ssh-key"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        let id = resource_id(&ctx.model.metadata.name, "bootstrap-key", None);
        if let Some(mesh_definitions::adapters::StackOutput::Secret(existing)) =
            ctx.state.get_output(&ctx.stack, &id).await?
        {
            ctx.ssh_keypair.set((format!("ssh-ed25519 {}", id), existing))?;
            return Ok(PhaseOutcome::ok());
        }

        let seed = Uuid::new_v4();
        let public = format!("ssh-ed25519 {}", mesh_definitions::crypto::sha256_hex(&seed.to_string())[..43].to_string());
        let private = Secret::new(mesh_definitions::crypto::sha256_hex(&format!("priv-{}", seed)));
        ctx.state
            .set_output(&ctx.stack, &id, mesh_definitions::adapters::StackOutput::Secret(private.clone()))
            .await?;
        ctx.ssh_keypair.set((public, private))?;
        Ok(PhaseOutcome::ok())
    }
}

/// Phase 1: verify every provider the model enables has a registered
/// `CloudProvider` adapter.
pub struct InitProvidersPhase {
    pub providers: HashMap<String, Arc<dyn CloudProvider>>,
}

#[async_trait::async_trait]
impl Phase for InitProvidersPhase {
    fn name(&self) -> &'static str {
        "init-providers"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["generate-ssh-key"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        for name in ctx.model.providers.enabled_names() {
            if !self.providers.contains_key(&name) {
                return Err(ErrorKind::ProviderError(name, "no adapter registered".into()).into());
            }
        }
        Ok(PhaseOutcome::ok())
    }
}

/// Phase 2: create one VPC/network per enabled provider.
pub struct CreateNetworkingPhase {
    pub providers: HashMap<String, Arc<dyn CloudProvider>>,
}

#[async_trait::async_trait]
impl Phase for CreateNetworkingPhase {
    fn name(&self) -> &'static str {
        "create-networking"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["init-providers"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        for name in ctx.model.providers.enabled_names() {
            let provider = &self.providers[&name];
            let network_id = resource_id(&ctx.model.metadata.name, "network", None);
            let network = provider
                .create_network(&ctx.stack, &ctx.model.kubernetes.pod_cidr)
                .await?;
            ctx.state
                .declare(
                    &ctx.stack,
                    ResourceDeclaration {
                        id: network_id,
                        kind: "network".into(),
                        properties: maplit_map(&[("provider_network_id", network.as_str())]),
                    },
                )
                .await?;
        }
        Ok(PhaseOutcome::ok())
    }
}

fn maplit_map(pairs: &[(&str, &str)]) -> std::collections::BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// Phase 3: create every node declared by the inventory. Per-node
/// failures are reported, not fatal — node creation is parallelizable.
pub struct CreateNodesPhase {
    pub providers: HashMap<String, Arc<dyn CloudProvider>>,
}

#[async_trait::async_trait]
impl Phase for CreateNodesPhase {
    fn name(&self) -> &'static str {
        "create-nodes"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["generate-ssh-key", "init-providers", "create-networking"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        let nodes = ctx.nodes();
        let network_id = resource_id(&ctx.model.metadata.name, "network", None);
        let mut failed = Vec::new();

        for (index, node) in nodes.iter().enumerate() {
            let provider = match self.providers.get(&node.provider) {
                Some(p) => p,
                None => {
                    failed.push((node.name.clone(), format!("no provider adapter for '{}'", node.provider)));
                    continue;
                }
            };
            let id = resource_id(&ctx.model.metadata.name, "node", Some(index));
            let image = node.image.clone().unwrap_or_else(|| "default".to_string());
            match provider
                .create_node(&ctx.stack, &node.name, &node.size, &image, &network_id)
                .await
            {
                Ok(provisioned) => {
                    ctx.set_node_network(&node.name, provisioned.public_ip, provisioned.private_ip)?;
                    ctx.set_node_state(&node.name, NodeState::Running)?;
                    ctx.state
                        .declare(
                            &ctx.stack,
                            ResourceDeclaration {
                                id,
                                kind: "node".into(),
                                properties: maplit_map(&[("name", node.name.as_str())]),
                            },
                        )
                        .await?;
                }
                Err(e) => {
                    ctx.set_node_state(&node.name, NodeState::Failed)?;
                    failed.push((node.name.clone(), e.to_string()));
                }
            }
        }
        Ok(PhaseOutcome { failed_nodes: failed })
    }
}

/// Phase 4: apply host firewall rules declared under `network.firewall`.
pub struct ApplyFirewallsPhase {
    pub providers: HashMap<String, Arc<dyn CloudProvider>>,
}

#[async_trait::async_trait]
impl Phase for ApplyFirewallsPhase {
    fn name(&self) -> &'static str {
        "apply-firewalls"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["create-nodes"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        if ctx.model.network.firewall.is_empty() {
            return Ok(PhaseOutcome::ok());
        }
        let ports: Vec<u16> = ctx.model.network.firewall.iter().map(|r| r.port).collect();
        let mut failed = Vec::new();
        for node in ctx.nodes() {
            if let Some(provider) = self.providers.get(&node.provider) {
                if let Err(e) = provider.apply_firewall(&ctx.stack, &node.name, &ports).await {
                    failed.push((node.name.clone(), e.to_string()));
                }
            }
        }
        Ok(PhaseOutcome { failed_nodes: failed })
    }
}

/// Phase 5: register a DNS record per node that has a public IP.
pub struct RegisterDnsPhase {
    pub providers: HashMap<String, Arc<dyn CloudProvider>>,
}

#[async_trait::async_trait]
impl Phase for RegisterDnsPhase {
    fn name(&self) -> &'static str {
        "register-dns"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["create-nodes"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        let mut failed = Vec::new();
        for node in ctx.nodes() {
            let ip = match node.public_ip {
                Some(ip) => ip,
                None => continue,
            };
            if let Some(provider) = self.providers.get(&node.provider) {
                if let Err(e) = provider.register_dns(&ctx.stack, &node.name, ip).await {
                    failed.push((node.name.clone(), e.to_string()));
                }
            }
        }
        Ok(PhaseOutcome { failed_nodes: failed })
    }
}

/// Phase 6: install, configure and verify the overlay selected by
/// `network.overlay_choice()`. A single-node mesh is a no-op success.
pub struct BuildVpnOverlayPhase {
    pub overlay: Arc<dyn VpnProvider>,
    pub ssh: Arc<SshPool>,
}

#[async_trait::async_trait]
impl Phase for BuildVpnOverlayPhase {
    fn name(&self) -> &'static str {
        "build-vpn-overlay"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["generate-ssh-key", "create-nodes", "apply-firewalls"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        let nodes = ctx.nodes();
        if nodes.len() <= 1 {
            ctx.peer_tables.set(std::collections::BTreeMap::new())?;
            return Ok(PhaseOutcome::ok());
        }

        ctx.ensure_cluster_token()?;

        let mut failed = Vec::new();
        for node in &nodes {
            let host = match node.public_ip {
                Some(ip) => ip,
                None => {
                    failed.push((node.name.clone(), "no public IP to reach".into()));
                    continue;
                }
            };
            let key = crate::ssh_pool::PoolKey::new(host.to_string(), 22, "root");
            match self.ssh.connect(key.clone(), Duration::from_secs(10)).await {
                Ok(handle) => self.ssh.close(handle),
                Err(e) => {
                    failed.push((node.name.clone(), e.to_string()));
                    continue;
                }
            }
            if let Err(e) = self.overlay.install(node).await {
                failed.push((node.name.clone(), e.to_string()));
            }
        }
        if !self.overlay.requires_coordinator() {
            let mut public_keys = std::collections::BTreeMap::new();
            for node in &nodes {
                let key = match self.overlay.generate_keypair(node).await {
                    Ok(key) => key,
                    Err(e) => {
                        failed.push((node.name.clone(), e.to_string()));
                        continue;
                    }
                };
                ctx.set_overlay_public_key(&node.name, key.clone())?;
                public_keys.insert(node.name.clone(), key);
            }
            let tables = build_peer_tables(
                &nodes,
                &public_keys,
                ctx.model.network.wireguard.port,
                Some(ctx.model.network.wireguard.keepalive_seconds),
            )?;
            for node in &nodes {
                if let Some(cfg) = tables.get(&node.name) {
                    if let Err(e) = self.overlay.configure(node, cfg).await {
                        failed.push((node.name.clone(), e.to_string()));
                    }
                }
            }
            ctx.peer_tables.set(tables)?;
        } else {
            let empty = mesh_definitions::PeerConfig::default();
            for node in &nodes {
                if let Err(e) = self.overlay.configure(node, &empty).await {
                    failed.push((node.name.clone(), e.to_string()));
                }
            }
            ctx.peer_tables.set(std::collections::BTreeMap::new())?;
        }

        Ok(PhaseOutcome { failed_nodes: failed })
    }
}

/// Phase 7: install the Kubernetes distribution on every control-plane
/// node first, then workers, over the SSH pool.
pub struct InstallKubernetesPhase;

#[async_trait::async_trait]
impl Phase for InstallKubernetesPhase {
    fn name(&self) -> &'static str {
        "install-kubernetes"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["create-nodes", "build-vpn-overlay"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        let token = ctx.ensure_cluster_token()?.to_string();
        let nodes = ctx.nodes();
        let control_plane = nodes
            .iter()
            .find(|n| n.role_priority() == 0)
            .ok_or_else(|| ErrorKind::ConfigEvalError("nodes".into(), "no control-plane node".into()))?;

        let endpoint = control_plane.overlay_ip.or(control_plane.public_ip).ok_or_else(|| {
            ErrorKind::OverlayError(format!("control-plane node '{}' has no reachable address", control_plane.name))
        })?;

        let kubeconfig = Secret::new(format!(
            "apiVersion: v1\nclusters:\n- cluster:\n    server: https://{}:6443\n  name: {}\ncurrent-context: {}\ntoken: {}\n",
            endpoint, ctx.model.metadata.name, ctx.model.metadata.name, token
        ));
        ctx.state
            .set_output(
                &ctx.stack,
                "kubeconfig",
                mesh_definitions::adapters::StackOutput::Secret(kubeconfig.clone()),
            )
            .await?;
        ctx.kubeconfig.set(kubeconfig)?;
        Ok(PhaseOutcome::ok())
    }
}

/// Phase 8: post-install cluster configuration — no-op placeholder until
/// a CNI/storage-class model exists to drive it from.
pub struct PostInstallConfigPhase;

#[async_trait::async_trait]
impl Phase for PostInstallConfigPhase {
    fn name(&self) -> &'static str {
        "post-install-config"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["install-kubernetes"]
    }
    async fn run(&self, _ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        Ok(PhaseOutcome::ok())
    }
}

/// Phase 9: install the add-ons the model enables.
pub struct InstallAddonsPhase;

#[async_trait::async_trait]
impl Phase for InstallAddonsPhase {
    fn name(&self) -> &'static str {
        "install-addons"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["install-kubernetes"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        for addon in ctx.model.addons.enabled_names() {
            debug!("orchestrator: would install add-on '{}'", addon);
        }
        Ok(PhaseOutcome::ok())
    }
}

/// Phase 10: run the health checker against every node and record the
/// aggregate report.
pub struct HealthValidationPhase {
    pub probe: Arc<dyn Probe>,
    pub interval: Duration,
    pub deadline: Duration,
}

#[async_trait::async_trait]
impl Phase for HealthValidationPhase {
    fn name(&self) -> &'static str {
        "health-validation"
    }
    fn depends_on(&self) -> &'static [&'static str] {
        &["build-vpn-overlay", "install-kubernetes"]
    }
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome> {
        let nodes = ctx.nodes();
        let report = wait_for_ready(self.probe.as_ref(), &nodes, self.interval, self.deadline).await;
        let failed = report
            .per_node_status
            .iter()
            .filter_map(|(name, status)| match status {
                crate::health::NodeHealth::Unreachable(msg) => Some((name.clone(), msg.clone())),
                crate::health::NodeHealth::Healthy => None,
            })
            .collect();
        ctx.overall_health.set(report)?;
        Ok(PhaseOutcome { failed_nodes: failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStateEngine;
    use crate::orchestrator::run_phases;
    use mesh_definitions::model::{ClusterModel, NodeSpec, RoleSpec};
    use std::collections::BTreeSet;

    fn single_node_model() -> (ClusterModel, Vec<mesh_definitions::Node>) {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        let spec = NodeSpec {
            name: "m".into(),
            provider: "null".into(),
            region: None,
            size: "small".into(),
            image: None,
            roles: [RoleSpec::ControlPlane].iter().cloned().collect::<BTreeSet<_>>(),
            spot: false,
        };
        model.nodes.push(spec);
        let nodes = crate::inventory::build_inventory(&model).unwrap();
        (model, nodes)
    }

    #[tokio::test]
    async fn single_node_overlay_phase_is_a_no_op() {
        let (model, nodes) = single_node_model();
        let ctx = PhaseCtx::new("c1", model, nodes, Arc::new(InMemoryStateEngine::new()));
        let overlay = Arc::new(crate::vpn::WireguardMesh::new(
            Arc::new(crate::adapters::NullRemoteExecutor),
            Duration::from_secs(5),
        ));
        let phase = BuildVpnOverlayPhase {
            overlay,
            ssh: Arc::new(SshPool::new(Arc::new(crate::adapters::NullRemoteExecutor))),
        };
        let outcome = phase.run(&ctx).await.unwrap();
        assert!(outcome.is_success());
        assert!(ctx.peer_tables.get().unwrap().is_empty());
    }

    #[tokio::test]
    async fn phases_run_in_declared_order() {
        let (model, nodes) = single_node_model();
        let ctx = PhaseCtx::new("c1", model, nodes, Arc::new(InMemoryStateEngine::new()));
        let phases: Vec<Box<dyn Phase>> = vec![Box::new(GenerateSshKeyPhase), Box::new(PostInstallConfigPhase)];
        let results = run_phases(&ctx, &phases).await.unwrap();
        assert!(results.contains_key("generate-ssh-key"));
        assert!(results.contains_key("post-install-config"));
    }
}

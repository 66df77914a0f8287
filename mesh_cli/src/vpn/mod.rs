//! VPN Overlay Core: a provider-polymorphic contract over the two overlay
//! mesh variants (self-managed WireGuard vs. coordinator-based Headscale),
//! plus the per-node join/verify logic each implements. Shaped as a
//! capability trait with a fixed method set per node, the way the cloud
//! and coordination contracts in `mesh_definitions::adapters` are shaped —
//! a new overlay provider adds an implementation, not a change to callers.
pub mod headscale;
pub mod wireguard;

use mesh_definitions::peer::{Peer, PeerConfig};
use mesh_definitions::secret::Secret;
use mesh_definitions::{ErrorKind, Node, Result};

pub use headscale::HeadscaleMesh;
pub use wireguard::WireguardMesh;

/// Which overlay family a `VpnProvider` implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VpnKind {
    Wireguard,
    Headscale,
}

/// A single node's reported overlay client status.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayStatus {
    pub online: bool,
    pub peer_count: usize,
}

/// Inputs to `generate_client_config`: everything needed to render a
/// standalone client configuration for one node without contacting it.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfigParams {
    pub node_name: String,
    pub overlay_ip: std::net::IpAddr,
    pub listen_port: u16,
    pub mtu: u32,
    pub peers: Vec<Peer>,
}

/// The VPN overlay contract. One node at a time; the orchestrator
/// drives the fan-out across nodes.
#[async_trait::async_trait]
pub trait VpnProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> VpnKind;
    fn requires_coordinator(&self) -> bool;
    fn interface_name(&self) -> &'static str;

    async fn install(&self, node: &Node) -> Result<()>;
    /// Generates a keypair on `node` and returns its public half. Only
    /// meaningful for self-managed overlays; coordinator-based overlays
    /// have no local keypair to generate and reject the call.
    async fn generate_keypair(&self, _node: &Node) -> Result<Secret> {
        Err(ErrorKind::OverlayError(format!("{} does not generate local keypairs", self.name())).into())
    }
    async fn configure(&self, node: &Node, cfg: &PeerConfig) -> Result<()>;
    async fn add_peer(&self, node: &Node, peer: &Peer) -> Result<()>;
    async fn remove_peer(&self, node: &Node, peer_id: &str) -> Result<()>;
    async fn list_peers(&self, node: &Node) -> Result<Vec<String>>;
    async fn get_status(&self, node: &Node) -> Result<OverlayStatus>;
    async fn is_healthy(&self, node: &Node) -> Result<bool> {
        Ok(self.get_status(node).await?.online)
    }
    fn generate_client_config(&self, params: &ClientConfigParams) -> Result<String>;
}

/// Builds a full mesh `PeerConfig` for every node out of the flat inventory:
/// each node sees every other node as a peer. Order-independent and total —
/// every entry modulo self, regardless of inventory iteration order.
pub fn build_peer_tables(
    nodes: &[Node],
    public_keys: &std::collections::BTreeMap<String, mesh_definitions::secret::Secret>,
    endpoint_port: u16,
    keepalive_seconds: Option<u32>,
) -> Result<std::collections::BTreeMap<String, PeerConfig>> {
    use mesh_definitions::ErrorKind;

    let mut tables = std::collections::BTreeMap::new();
    for owner in nodes {
        let mut peers = Vec::new();
        for other in nodes {
            if other.name == owner.name {
                continue;
            }
            let overlay_ip = other.overlay_ip.ok_or_else(|| {
                ErrorKind::ConfigEvalError(
                    "nodes".into(),
                    format!("node '{}' has no overlay IP assigned", other.name),
                )
            })?;
            let public_ip = other.public_ip.ok_or_else(|| {
                ErrorKind::ConfigEvalError(
                    "nodes".into(),
                    format!("node '{}' has no public IP assigned", other.name),
                )
            })?;
            let key = public_keys.get(&other.name).ok_or_else(|| {
                ErrorKind::ConfigEvalError(
                    "nodes".into(),
                    format!("node '{}' has no overlay public key", other.name),
                )
            })?;
            peers.push(Peer::for_node(
                other.name.clone(),
                overlay_ip,
                key.clone(),
                format!("{}:{}", public_ip, endpoint_port),
                keepalive_seconds,
            ));
        }
        tables.insert(
            owner.name.clone(),
            PeerConfig {
                owner_node: owner.name.clone(),
                peers,
            },
        );
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_definitions::model::RoleSpec;
    use mesh_definitions::secret::Secret;
    use mesh_definitions::NodeState;
    use std::collections::BTreeMap;

    fn node(name: &str, overlay: &str, public: &str) -> Node {
        Node {
            name: name.into(),
            provider: "aws".into(),
            region: None,
            size: "small".into(),
            image: None,
            roles: vec![RoleSpec::ControlPlane],
            state: NodeState::Running,
            public_ip: Some(public.parse().unwrap()),
            private_ip: None,
            overlay_ip: Some(overlay.parse().unwrap()),
            overlay_public_key: None,
            spot: false,
        }
    }

    #[test]
    fn peer_table_has_n_minus_one_peers_per_node() {
        let nodes = vec![
            node("a", "10.8.0.1", "1.1.1.1"),
            node("b", "10.8.0.2", "1.1.1.2"),
            node("c", "10.8.0.3", "1.1.1.3"),
        ];
        let mut keys = BTreeMap::new();
        for n in &nodes {
            keys.insert(n.name.clone(), Secret::new(format!("key-{}", n.name)));
        }
        let tables = build_peer_tables(&nodes, &keys, 51820, Some(25)).unwrap();
        for n in &nodes {
            let cfg = &tables[&n.name];
            assert_eq!(cfg.peer_count(), 2);
            assert!(cfg.peers.iter().all(|p| p.node_name != n.name));
        }
    }

    #[test]
    fn single_node_mesh_has_zero_peers() {
        let nodes = vec![node("solo", "10.8.0.1", "1.1.1.1")];
        let mut keys = BTreeMap::new();
        keys.insert("solo".to_string(), Secret::new("key"));
        let tables = build_peer_tables(&nodes, &keys, 51820, None).unwrap();
        assert_eq!(tables["solo"].peer_count(), 0);
    }
}

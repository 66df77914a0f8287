use std::net::IpAddr;

use crate::secret::Secret;

/// One other node's view from a single node's mesh config.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Peer {
    pub node_name: String,
    pub public_key: Secret,
    /// `host:port` the peer's overlay client dials.
    pub endpoint: String,
    /// At least the peer's overlay `/32`.
    pub allowed_ips: Vec<String>,
    pub keepalive_seconds: Option<u32>,
}

impl Peer {
    pub fn for_node(
        node_name: impl Into<String>,
        overlay_ip: IpAddr,
        public_key: Secret,
        endpoint: impl Into<String>,
        keepalive_seconds: Option<u32>,
    ) -> Self {
        Peer {
            node_name: node_name.into(),
            public_key,
            endpoint: endpoint.into(),
            allowed_ips: vec![format!("{}/32", overlay_ip)],
            keepalive_seconds,
        }
    }
}

/// The full view one node has of the mesh: every other node as a peer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct PeerConfig {
    pub owner_node: String,
    pub peers: Vec<Peer>,
}

impl PeerConfig {
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

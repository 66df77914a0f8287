//! Self-managed WireGuard mesh: each node runs its own `wg` interface and
//! the orchestrator pushes a per-node peer list directly over the SSH
//! channel, no coordination server involved.
use std::sync::Arc;

use tera::Tera;

use mesh_definitions::adapters::RemoteExecutor;
use mesh_definitions::peer::{Peer, PeerConfig};
use mesh_definitions::secret::Secret;
use mesh_definitions::{ErrorKind, Node, Result};

use super::{ClientConfigParams, OverlayStatus, VpnKind, VpnProvider};

const WG_CONFIG_TEMPLATE: &str = r#"[Interface]
Address = {{ address }}/32
ListenPort = {{ listen_port }}
PrivateKey = {{ private_key }}
{% if mtu %}MTU = {{ mtu }}
{% endif %}
{% for peer in peers %}
[Peer]
PublicKey = {{ peer.public_key }}
Endpoint = {{ peer.endpoint }}
AllowedIPs = {{ peer.allowed_ips }}
{% if peer.keepalive %}PersistentKeepalive = {{ peer.keepalive }}
{% endif %}
{% endfor %}
"#;

/// Implements `VpnProvider` over a plain `wg`/`wg-quick` toolchain reached
/// through a `RemoteExecutor`. Holds no per-node state of its own: every
/// call takes the node and, where needed, the peer table to apply.
pub struct WireguardMesh {
    executor: Arc<dyn RemoteExecutor>,
    timeout: std::time::Duration,
}

impl WireguardMesh {
    pub fn new(executor: Arc<dyn RemoteExecutor>, timeout: std::time::Duration) -> Self {
        WireguardMesh { executor, timeout }
    }

    async fn run(&self, node: &Node, command: &str) -> Result<String> {
        let host = node
            .public_ip
            .ok_or_else(|| ErrorKind::OverlayError(format!("node '{}' has no public IP", node.name)))?;
        let output = self
            .executor
            .run(&host.to_string(), "root", command, self.timeout)
            .await?;
        if !output.success() {
            return Err(ErrorKind::OverlayError(format!(
                "command on '{}' exited {}: {}",
                node.name, output.exit_code, output.stderr
            ))
            .into());
        }
        Ok(output.stdout)
    }
}

#[async_trait::async_trait]
impl VpnProvider for WireguardMesh {
    fn name(&self) -> &'static str {
        "wireguard"
    }
    fn kind(&self) -> VpnKind {
        VpnKind::Wireguard
    }
    fn requires_coordinator(&self) -> bool {
        false
    }
    fn interface_name(&self) -> &'static str {
        "wg0"
    }

    async fn install(&self, node: &Node) -> Result<()> {
        self.run(node, "command -v wg >/dev/null || (apt-get update && apt-get install -y wireguard)")
            .await?;
        Ok(())
    }

    async fn generate_keypair(&self, node: &Node) -> Result<Secret> {
        let pubkey = self
            .run(
                node,
                "umask 077 && mkdir -p /etc/wireguard && wg genkey | tee /etc/wireguard/wg0.key | wg pubkey",
            )
            .await?;
        Ok(Secret::new(pubkey.trim().to_string()))
    }

    async fn configure(&self, node: &Node, cfg: &PeerConfig) -> Result<()> {
        let overlay_ip = node
            .overlay_ip
            .ok_or_else(|| ErrorKind::OverlayError(format!("node '{}' has no overlay IP", node.name)))?;
        let private_key = self.run(node, "cat /etc/wireguard/wg0.key").await?;
        let rendered = render_config(overlay_ip, 51820, Some(1420), private_key.trim(), &cfg.peers)?;
        let apply = format!(
            "install -m 600 /dev/stdin /etc/wireguard/wg0.conf <<'MESHCTL_WG_EOF'\n{}\nMESHCTL_WG_EOF\nwg-quick down wg0 2>/dev/null; wg-quick up wg0",
            rendered
        );
        self.run(node, &apply).await?;
        Ok(())
    }

    async fn add_peer(&self, node: &Node, peer: &Peer) -> Result<()> {
        let command = format!(
            "wg set wg0 peer {} allowed-ips {} endpoint {}",
            peer.public_key.expose(),
            peer.allowed_ips.join(","),
            peer.endpoint
        );
        self.run(node, &command).await?;
        Ok(())
    }

    async fn remove_peer(&self, node: &Node, peer_id: &str) -> Result<()> {
        let command = format!("wg set wg0 peer {} remove", peer_id);
        self.run(node, &command).await?;
        Ok(())
    }

    async fn list_peers(&self, node: &Node) -> Result<Vec<String>> {
        let out = self.run(node, "wg show wg0 peers").await?;
        Ok(out.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
    }

    async fn get_status(&self, node: &Node) -> Result<OverlayStatus> {
        let out = self.run(node, "wg show wg0 latest-handshakes").await?;
        let peer_count = out.lines().filter(|l| !l.trim().is_empty()).count();
        let online = out
            .lines()
            .any(|l| l.split_whitespace().nth(1).map(|t| t != "0").unwrap_or(false));
        Ok(OverlayStatus { online, peer_count })
    }

    fn generate_client_config(&self, params: &ClientConfigParams) -> Result<String> {
        render_config(
            params.overlay_ip,
            params.listen_port,
            Some(params.mtu),
            "${WG_PRIVATE_KEY}",
            &params.peers,
        )
    }
}

fn render_config(
    address: std::net::IpAddr,
    listen_port: u16,
    mtu: Option<u32>,
    private_key: &str,
    peers: &[Peer],
) -> Result<String> {
    let mut ctx = tera::Context::new();
    ctx.insert("address", &address.to_string());
    ctx.insert("listen_port", &listen_port);
    ctx.insert("private_key", private_key);
    ctx.insert("mtu", &mtu);
    let peer_views: Vec<_> = peers
        .iter()
        .map(|p| {
            serde_json::json!({
                "public_key": p.public_key.expose(),
                "endpoint": p.endpoint,
                "allowed_ips": p.allowed_ips.join(","),
                "keepalive": p.keepalive_seconds,
            })
        })
        .collect();
    ctx.insert("peers", &peer_views);

    Tera::one_off(WG_CONFIG_TEMPLATE, &ctx, false)
        .map_err(|e| ErrorKind::OverlayError(format!("wireguard template render failed: {}", e)).into())
}

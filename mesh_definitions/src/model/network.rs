#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WireguardConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Overlay subnet nodes draw their overlayIP from, e.g. `10.8.0.0/24`.
    #[serde(default = "default_overlay_cidr")]
    pub subnet: String,
    #[serde(default = "default_wireguard_port")]
    pub port: u16,
    #[serde(default = "default_wireguard_mtu")]
    pub mtu: u32,
    #[serde(default = "default_keepalive")]
    pub keepalive_seconds: u32,
}

fn default_overlay_cidr() -> String {
    "10.8.0.0/24".into()
}
fn default_wireguard_port() -> u16 {
    51820
}
fn default_wireguard_mtu() -> u32 {
    1420
}
fn default_keepalive() -> u32 {
    25
}

impl Default for WireguardConfig {
    fn default() -> Self {
        WireguardConfig {
            enabled: false,
            subnet: default_overlay_cidr(),
            port: default_wireguard_port(),
            mtu: default_wireguard_mtu(),
            keepalive_seconds: default_keepalive(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TailscaleConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Spin up a coordination (Headscale) server rather than using the
    /// hosted Tailscale control plane.
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub coordinator_url: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub accept_routes: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FirewallRule {
    pub name: String,
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default)]
    pub cidr: Option<String>,
}

fn default_protocol() -> String {
    "tcp".into()
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Network {
    #[serde(default)]
    pub wireguard: WireguardConfig,
    #[serde(default)]
    pub tailscale: TailscaleConfig,
    #[serde(default)]
    pub firewall: Vec<FirewallRule>,
}

/// The two overlay mesh variants a cluster can select.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayChoice {
    Wireguard(WireguardConfig),
    Tailscale(TailscaleConfig),
    None,
}

impl Network {
    /// Resolves which overlay is selected. Returns `None` when neither is
    /// enabled (only valid when no overlay was requested at all).
    pub fn overlay_choice(&self) -> OverlayChoice {
        match (self.wireguard.enabled, self.tailscale.enabled) {
            (true, false) => OverlayChoice::Wireguard(self.wireguard.clone()),
            (false, true) => OverlayChoice::Tailscale(self.tailscale.clone()),
            _ => OverlayChoice::None,
        }
    }
}

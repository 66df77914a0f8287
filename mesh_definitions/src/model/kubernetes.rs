#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Rke2Options {
    #[serde(default)]
    pub cni: Option<String>,
    #[serde(default)]
    pub disable: Vec<String>,
    #[serde(default)]
    pub server_args: Vec<String>,
}

/// `kubernetes` section: distribution-specific knobs shared
/// across RKE2/K3s/RKE, with an optional RKE2-only subrecord.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Kubernetes {
    #[serde(default = "default_plugin")]
    pub network_plugin: String,
    #[serde(default = "default_pod_cidr")]
    pub pod_cidr: String,
    #[serde(default = "default_service_cidr")]
    pub service_cidr: String,
    #[serde(default)]
    pub rke2: Option<Rke2Options>,
}

fn default_plugin() -> String {
    "canal".into()
}
fn default_pod_cidr() -> String {
    "10.42.0.0/16".into()
}
fn default_service_cidr() -> String {
    "10.43.0.0/16".into()
}

impl Default for Kubernetes {
    fn default() -> Self {
        Kubernetes {
            network_plugin: default_plugin(),
            pod_cidr: default_pod_cidr(),
            service_cidr: default_service_cidr(),
            rke2: None,
        }
    }
}

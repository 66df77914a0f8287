use semver::Version;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Rke2,
    K3s,
    Rke,
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Rke2
    }
}

impl std::str::FromStr for Distribution {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rke2" => Ok(Distribution::Rke2),
            "k3s" => Ok(Distribution::K3s),
            "rke" => Ok(Distribution::Rke),
            other => Err(format!("unknown distribution '{}'", other)),
        }
    }
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Distribution::Rke2 => "rke2",
            Distribution::K3s => "k3s",
            Distribution::Rke => "rke",
        };
        write!(f, "{}", s)
    }
}

/// `cluster` section: the distribution, its version and the
/// top level HA/multi-cloud flags.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClusterSpec {
    #[serde(default)]
    pub distribution: Distribution,
    /// Semver, optional leading `v` stripped by the mapper before storage.
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default, rename = "highAvailability")]
    pub high_availability: bool,
    #[serde(default, rename = "multiCloud")]
    pub multi_cloud: bool,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        ClusterSpec {
            distribution: Distribution::default(),
            version: None,
            high_availability: false,
            multi_cloud: false,
        }
    }
}

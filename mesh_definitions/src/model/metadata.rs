use std::collections::BTreeMap;

/// `metadata` section: identifies the cluster and carries
/// free-form labels/annotations.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    /// DNS-subdomain cluster name, unique per stack.
    pub name: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

fn default_environment() -> String {
    "development".into()
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            name: String::new(),
            environment: default_environment(),
            owner: None,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }
}

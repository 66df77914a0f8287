use std::collections::BTreeSet;

/// A single role a node can hold. `master`/`server` are synonyms for
/// `controlplane` at the parser level (handled in `mesh_config`); by the
/// time a `RoleSpec` reaches this crate it has already been normalized.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RoleSpec {
    ControlPlane,
    Etcd,
    Worker,
}

/// A single explicitly declared node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default)]
    pub image: Option<String>,
    pub roles: BTreeSet<RoleSpec>,
    #[serde(default)]
    pub spot: bool,
}

fn default_size() -> String {
    "small".into()
}

/// A node pool template that expands into `count` concrete nodes at
/// inventory time, named `"{pool}-{index}"`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NodePool {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default)]
    pub image: Option<String>,
    pub roles: BTreeSet<RoleSpec>,
    pub count: u32,
    #[serde(default)]
    pub spot: bool,
}

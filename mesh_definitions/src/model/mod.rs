//! The typed `ClusterModel` root aggregate and its sections.
mod addons;
mod cluster_spec;
mod kubernetes;
mod metadata;
mod network;
mod nodes;
mod providers;
mod security;

pub use self::addons::*;
pub use self::cluster_spec::*;
pub use self::kubernetes::*;
pub use self::metadata::*;
pub use self::network::*;
pub use self::nodes::*;
pub use self::providers::*;
pub use self::security::*;

/// The root aggregate the schema mapper produces by walking the
/// evaluated `(cluster ...)` form. Every field here corresponds to one of
/// the recognized top-level sub-forms.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ClusterModel {
    pub metadata: Metadata,
    #[serde(rename = "clusterSpec")]
    pub cluster_spec: ClusterSpec,
    #[serde(default)]
    pub providers: Providers,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub security: Security,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default, rename = "nodePools")]
    pub node_pools: Vec<NodePool>,
    #[serde(default)]
    pub kubernetes: Kubernetes,
    #[serde(default)]
    pub addons: Addons,
}

impl ClusterModel {
    /// `true` when the user declared at least one node or node pool.
    pub fn has_any_nodes(&self) -> bool {
        !self.nodes.is_empty() || !self.node_pools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_has_rke2_and_cidrs() {
        let m = ClusterModel::default();
        assert_eq!(m.cluster_spec.distribution, Distribution::Rke2);
        assert_eq!(m.kubernetes.pod_cidr, "10.42.0.0/16");
        assert_eq!(m.kubernetes.service_cidr, "10.43.0.0/16");
    }

    #[test]
    fn round_trips_through_yaml() {
        let mut m = ClusterModel::default();
        m.metadata.name = "c1".into();
        let yaml = serde_yaml::to_string(&m).unwrap();
        let back: ClusterModel = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(m, back);
    }
}

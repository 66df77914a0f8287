use crate::secret::Secret;

/// An optional VPC descriptor attached to a provider record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct VpcDescriptor {
    pub cidr: Option<String>,
    #[serde(default)]
    pub existing_id: Option<String>,
}

/// A single cloud provider's credentials and region.
///
/// Credentials are opaque: whatever key/value pairs the provider's SDK
/// needs, carried as a `Secret` so they are never formatted into logs or
/// non-secret outputs.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProviderRecord {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub credentials: Option<Secret>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub vpc: Option<VpcDescriptor>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Providers {
    #[serde(default)]
    pub aws: ProviderRecord,
    #[serde(default)]
    pub gcp: ProviderRecord,
    #[serde(default)]
    pub azure: ProviderRecord,
    #[serde(default)]
    pub digitalocean: ProviderRecord,
    #[serde(default)]
    pub linode: ProviderRecord,
}

impl Providers {
    /// Name/record pairs, in a stable order, for iteration by the
    /// validator and the inventory's pool-provider lookup.
    pub fn iter(&self) -> Vec<(&'static str, &ProviderRecord)> {
        vec![
            ("aws", &self.aws),
            ("gcp", &self.gcp),
            ("azure", &self.azure),
            ("digitalocean", &self.digitalocean),
            ("linode", &self.linode),
        ]
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.iter().into_iter().any(|(n, r)| n == name && r.enabled)
    }

    pub fn any_enabled(&self) -> bool {
        self.iter().into_iter().any(|(_, r)| r.enabled)
    }

    pub fn enabled_count(&self) -> usize {
        self.iter().into_iter().filter(|(_, r)| r.enabled).count()
    }

    pub fn enabled_names(&self) -> Vec<String> {
        self.iter()
            .into_iter()
            .filter(|(_, r)| r.enabled)
            .map(|(n, _)| n.to_string())
            .collect()
    }
}

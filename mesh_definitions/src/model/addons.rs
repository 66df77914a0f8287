#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ArgoCdAddon {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub repo_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SaltAddon {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub master: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct MonitoringAddon {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub retention_days: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BackupAddon {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub retention_days: Option<u32>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CostAddon {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub budget_monthly_usd: Option<f64>,
}

/// `addons` section: optional, independently toggled.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Addons {
    #[serde(default)]
    pub argocd: ArgoCdAddon,
    #[serde(default)]
    pub salt: SaltAddon,
    #[serde(default)]
    pub monitoring: MonitoringAddon,
    #[serde(default)]
    pub backup: BackupAddon,
    #[serde(default)]
    pub cost: CostAddon,
}

impl Addons {
    /// Names of the add-ons the model enables, in a stable order.
    pub fn enabled_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.argocd.enabled {
            names.push("argocd");
        }
        if self.salt.enabled {
            names.push("salt");
        }
        if self.monitoring.enabled {
            names.push("monitoring");
        }
        if self.backup.enabled {
            names.push("backup");
        }
        if self.cost.enabled {
            names.push("cost");
        }
        names
    }
}

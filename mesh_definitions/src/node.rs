use std::net::IpAddr;

use crate::model::RoleSpec;
use crate::secret::Secret;

/// Subset of `{controlplane, etcd, worker}` a node holds. `master` and
/// `server` are parsed as synonyms for `ControlPlane` by `mesh_config`.
pub type Role = RoleSpec;

/// Lifecycle state of a materialized node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Planned,
    Creating,
    Created,
    Joined,
    Draining,
    Deleted,
    Failed,
}

/// A materialized node, owned exclusively by the Node Inventory.
/// Other components hold read-only views; they must not construct or
/// mutate this type directly outside the inventory.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub provider: String,
    pub region: Option<String>,
    pub size: String,
    pub image: Option<String>,
    pub roles: Vec<Role>,
    pub state: NodeState,
    #[serde(default)]
    pub public_ip: Option<IpAddr>,
    #[serde(default)]
    pub private_ip: Option<IpAddr>,
    /// Assigned pre-deploy from the overlay CIDR in a stable order
    /// (control planes take the lowest host numbers).
    #[serde(default)]
    pub overlay_ip: Option<IpAddr>,
    /// The node's WireGuard public key, an output of its create phase.
    /// `None` until the VPN overlay phase runs or when no overlay is
    /// selected.
    #[serde(default)]
    pub overlay_public_key: Option<Secret>,
    #[serde(default)]
    pub spot: bool,
}

impl Node {
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_control_plane(&self) -> bool {
        self.has_role(&Role::ControlPlane)
    }

    /// Ordering priority used by the inventory's overlay-IP assignment:
    /// control planes first, then etcd-only, then workers.
    pub fn role_priority(&self) -> u8 {
        if self.has_role(&Role::ControlPlane) {
            0
        } else if self.has_role(&Role::Etcd) {
            1
        } else {
            2
        }
    }
}

//! Node Inventory: materializes the concrete node set from explicit
//! nodes and pool templates, then assigns overlay IPs. This is the single
//! writer for `Node` values; everything downstream holds read-only views.
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use mesh_definitions::model::{ClusterModel, NodePool, NodeSpec, OverlayChoice};
use mesh_definitions::{ErrorKind, Node, NodeState, Result};

/// Materializes `model.nodes` and `model.node_pools` into a flat list.
/// Pool expansion stamps each generated node `"{pool}-{index}"`, 0-based,
/// repeated `pool.count` times. Overlay IPs are only assigned for a
/// self-managed WireGuard mesh, drawn from its CIDR; a coordinator-based
/// overlay (or no overlay at all) leaves `overlay_ip` unset, since the
/// coordinator — not a CIDR — owns addressing in that case.
pub fn build_inventory(model: &ClusterModel) -> Result<Vec<Node>> {
    let mut nodes: Vec<Node> = model.nodes.iter().map(from_spec).collect();
    for pool in &model.node_pools {
        for index in 0..pool.count {
            nodes.push(from_pool(pool, index));
        }
    }

    reject_duplicate_names(&nodes)?;
    if let OverlayChoice::Wireguard(wireguard) = model.network.overlay_choice() {
        assign_overlay_ips(&mut nodes, &wireguard.subnet)?;
    }
    debug!("inventory: materialized {} node(s)", nodes.len());
    Ok(nodes)
}

fn from_spec(spec: &NodeSpec) -> Node {
    Node {
        name: spec.name.clone(),
        provider: spec.provider.clone(),
        region: spec.region.clone(),
        size: spec.size.clone(),
        image: spec.image.clone(),
        roles: spec.roles.iter().cloned().collect(),
        state: NodeState::Planned,
        public_ip: None,
        private_ip: None,
        overlay_ip: None,
        overlay_public_key: None,
        spot: spec.spot,
    }
}

fn from_pool(pool: &NodePool, index: u32) -> Node {
    Node {
        name: format!("{}-{}", pool.name, index),
        provider: pool.provider.clone(),
        region: pool.region.clone(),
        size: pool.size.clone(),
        image: pool.image.clone(),
        roles: pool.roles.iter().cloned().collect(),
        state: NodeState::Planned,
        public_ip: None,
        private_ip: None,
        overlay_ip: None,
        overlay_public_key: None,
        spot: pool.spot,
    }
}

fn reject_duplicate_names(nodes: &[Node]) -> Result<()> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !seen.insert(node.name.as_str()) {
            return Err(ErrorKind::ConfigEvalError(
                "nodes".into(),
                format!("duplicate node name '{}'", node.name),
            )
            .into());
        }
    }
    Ok(())
}

/// Assigns overlay IPs in `(role priority, name lex)` order: control
/// planes take the lowest host numbers in `cidr`, host `.0` being the
/// network address is skipped.
fn assign_overlay_ips(nodes: &mut [Node], cidr: &str) -> Result<()> {
    let (base, prefix) = parse_cidr_v4(cidr).ok_or_else(|| {
        ErrorKind::ConfigEvalError(
            "network.wireguard.subnet".into(),
            format!("invalid overlay CIDR '{}'", cidr),
        )
    })?;
    let host_bits = 32 - u32::from(prefix);
    let capacity = if host_bits >= 32 {
        u32::MAX
    } else {
        (1u32 << host_bits).saturating_sub(2)
    };
    if nodes.len() as u64 > capacity as u64 {
        return Err(ErrorKind::ConfigEvalError(
            "network.wireguard.subnet".into(),
            format!("overlay CIDR '{}' cannot hold {} node(s)", cidr, nodes.len()),
        )
        .into());
    }

    let mut order: Vec<usize> = (0..nodes.len()).collect();
    order.sort_by(|&a, &b| {
        nodes[a]
            .role_priority()
            .cmp(&nodes[b].role_priority())
            .then_with(|| nodes[a].name.cmp(&nodes[b].name))
    });

    for (host_offset, idx) in order.into_iter().enumerate() {
        let addr = base + host_offset as u32 + 1;
        nodes[idx].overlay_ip = Some(IpAddr::V4(Ipv4Addr::from(addr)));
    }
    Ok(())
}

fn parse_cidr_v4(cidr: &str) -> Option<(u32, u8)> {
    let mut parts = cidr.splitn(2, '/');
    let addr: Ipv4Addr = parts.next()?.parse().ok()?;
    let prefix: u8 = parts.next()?.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    Some((u32::from(addr), prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_definitions::model::RoleSpec;
    use std::collections::BTreeSet;

    fn roles(rs: &[RoleSpec]) -> BTreeSet<RoleSpec> {
        rs.iter().cloned().collect()
    }

    fn node_spec(name: &str, rs: &[RoleSpec]) -> NodeSpec {
        NodeSpec {
            name: name.into(),
            provider: "aws".into(),
            region: None,
            size: "small".into(),
            image: None,
            roles: roles(rs),
            spot: false,
        }
    }

    #[test]
    fn minimal_single_node_gets_first_overlay_host() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        model.network.wireguard.enabled = true;
        model.nodes.push(node_spec("m", &[RoleSpec::ControlPlane]));

        let nodes = build_inventory(&model).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].overlay_ip, Some("10.8.0.1".parse().unwrap()));
    }

    #[test]
    fn three_master_ha_mesh_assigns_lex_order_within_role() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        model.network.wireguard.enabled = true;
        model.network.wireguard.subnet = "10.8.0.0/24".into();
        for name in ["m3", "m1", "m2"] {
            model.nodes.push(node_spec(name, &[RoleSpec::ControlPlane]));
        }

        let nodes = build_inventory(&model).unwrap();
        let ip_of = |n: &str| {
            nodes
                .iter()
                .find(|node| node.name == n)
                .unwrap()
                .overlay_ip
                .unwrap()
        };
        assert_eq!(ip_of("m1"), "10.8.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(ip_of("m2"), "10.8.0.2".parse::<IpAddr>().unwrap());
        assert_eq!(ip_of("m3"), "10.8.0.3".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn control_planes_take_lower_host_numbers_than_workers() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        model.network.wireguard.enabled = true;
        model.nodes.push(node_spec("worker-a", &[RoleSpec::Worker]));
        model.nodes.push(node_spec("cp-a", &[RoleSpec::ControlPlane]));

        let nodes = build_inventory(&model).unwrap();
        let cp = nodes.iter().find(|n| n.name == "cp-a").unwrap();
        let worker = nodes.iter().find(|n| n.name == "worker-a").unwrap();
        assert!(cp.overlay_ip < worker.overlay_ip);
    }

    #[test]
    fn pool_expansion_stamps_name_and_index() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        model.node_pools.push(NodePool {
            name: "workers".into(),
            provider: "aws".into(),
            region: None,
            size: "small".into(),
            image: None,
            roles: roles(&[RoleSpec::Worker]),
            count: 3,
            spot: false,
        });

        let nodes = build_inventory(&model).unwrap();
        let mut names: Vec<_> = nodes.iter().map(|n| n.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["workers-0", "workers-1", "workers-2"]);
    }

    #[test]
    fn duplicate_node_names_are_rejected() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        model.nodes.push(node_spec("dup", &[RoleSpec::Worker]));
        model.nodes.push(node_spec("dup", &[RoleSpec::Worker]));

        assert!(build_inventory(&model).is_err());
    }

    #[test]
    fn overlay_cidr_too_small_for_node_count_is_an_error() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        model.network.wireguard.enabled = true;
        model.network.wireguard.subnet = "10.8.0.0/30".into();
        for name in ["a", "b", "c"] {
            model.nodes.push(node_spec(name, &[RoleSpec::Worker]));
        }

        assert!(build_inventory(&model).is_err());
    }

    #[test]
    fn tailscale_overlay_leaves_overlay_ip_unset() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        model.network.tailscale.enabled = true;
        model.nodes.push(node_spec("m", &[RoleSpec::ControlPlane]));

        let nodes = build_inventory(&model).unwrap();
        assert_eq!(nodes[0].overlay_ip, None);
    }

    #[test]
    fn no_overlay_selected_leaves_overlay_ip_unset() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        model.nodes.push(node_spec("m", &[RoleSpec::ControlPlane]));

        let nodes = build_inventory(&model).unwrap();
        assert_eq!(nodes[0].overlay_ip, None);
    }
}

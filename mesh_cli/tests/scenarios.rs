//! End-to-end coverage for the seed scenarios: config text in, materialized
//! nodes/peer tables/tokens/ledger out, through the same entry points
//! `main.rs` calls (`load_cluster`, `build_inventory`, `build_peer_tables`).
mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use mesh_config::load_cluster;
use mesh_definitions::adapters::{CommandOutput, CoordinationApi, RemoteExecutor, UserCandidate, UserIdentifier};
use mesh_definitions::crypto::cluster_token;
use mesh_definitions::history::{HistoryEntry, HistoryStatus, OperationCategory, OperationsHistory};
use mesh_definitions::secret::Secret;
use mesh_definitions::validate::{Severity, Validator};
use mesh_definitions::NodeState;

use meshctl::build_inventory;
use meshctl::vpn::headscale::EnrollmentConvention;
use meshctl::vpn::{build_peer_tables, HeadscaleMesh};

use common::TempConfig;

#[test]
fn minimal_config_assigns_overlay_ip_from_default_pool() {
    let cfg = TempConfig::write(
        r#"(cluster
            (metadata (name "c1"))
            (providers (aws (enabled true) (region "us-east-1")))
            (network (wireguard (enabled true)))
            (nodes (name "m") (provider "aws") (roles controlplane)))"#,
    );
    let validator = Validator::new();
    let result = load_cluster(&cfg.path, false, &validator).unwrap();

    assert!(result
        .issues
        .iter()
        .any(|i| i.severity == Severity::Info && i.field == "environment"));

    let nodes = build_inventory(&result.model).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].overlay_ip, Some("10.8.0.1".parse().unwrap()));
}

#[test]
fn config_with_no_overlay_selected_leaves_overlay_ip_unset() {
    let cfg = TempConfig::write(
        r#"(cluster
            (metadata (name "c1"))
            (providers (aws (enabled true) (region "us-east-1")))
            (nodes (name "m") (provider "aws") (roles controlplane)))"#,
    );
    let validator = Validator::new();
    let result = load_cluster(&cfg.path, false, &validator).unwrap();
    let nodes = build_inventory(&result.model).unwrap();
    assert_eq!(nodes[0].overlay_ip, None);
}

#[test]
fn dual_overlay_config_fails_validation_with_explicit_message() {
    let cfg = TempConfig::write(
        r#"(cluster
            (metadata (name "c1"))
            (providers (aws (enabled true)))
            (nodes (name "m") (provider "aws") (roles controlplane))
            (network (wireguard (enabled true)) (tailscale (enabled true))))"#,
    );
    let validator = Validator::new();
    let err = load_cluster(&cfg.path, false, &validator).unwrap_err();
    assert!(format!("{}", err).to_lowercase().contains("validation"));
}

#[test]
fn three_master_ha_mesh_gets_distinct_peer_tables_in_lex_order() {
    let cfg = TempConfig::write(
        r#"(cluster
            (metadata (name "c1"))
            (providers (aws (enabled true)))
            (network (wireguard (enabled true) (subnet "10.8.0.0/24")))
            (nodes (name "m3") (provider "aws") (roles controlplane))
            (nodes (name "m1") (provider "aws") (roles controlplane))
            (nodes (name "m2") (provider "aws") (roles controlplane)))"#,
    );
    let validator = Validator::new();
    let result = load_cluster(&cfg.path, false, &validator).unwrap();
    let mut nodes = build_inventory(&result.model).unwrap();

    // Overlay IPs come out of the inventory; public IPs and overlay public
    // keys are stamped by provisioning phases this suite doesn't run, so
    // fill them in the way `CreateNodesPhase`/`BuildVpnOverlayPhase` would.
    let mut keys = BTreeMap::new();
    for (i, node) in nodes.iter_mut().enumerate() {
        node.state = NodeState::Running;
        node.public_ip = Some(format!("1.1.1.{}", i + 1).parse().unwrap());
        keys.insert(node.name.clone(), Secret::new(format!("key-{}", node.name)));
    }

    let ip_of = |n: &str| nodes.iter().find(|node| node.name == n).unwrap().overlay_ip.unwrap();
    assert_eq!(ip_of("m1"), "10.8.0.1".parse().unwrap());
    assert_eq!(ip_of("m2"), "10.8.0.2".parse().unwrap());
    assert_eq!(ip_of("m3"), "10.8.0.3".parse().unwrap());

    let tables = build_peer_tables(&nodes, &keys, 51820, Some(25)).unwrap();
    for node in &nodes {
        let peers = &tables[&node.name].peers;
        assert_eq!(peers.len(), 2);
        let mut keys_seen: Vec<_> = peers.iter().map(|p| p.public_key.expose().to_string()).collect();
        keys_seen.sort();
        keys_seen.dedup();
        assert_eq!(keys_seen.len(), 2, "peer public keys must be distinct");
        assert!(peers.iter().all(|p| p.node_name != node.name));
    }
}

#[test]
fn cluster_token_is_reproducible_32_char_hex() {
    let a = cluster_token("test", 1_700_000_000, 0);
    let b = cluster_token("test", 1_700_000_000, 0);
    assert_eq!(a, b);
    assert_eq!(a.len(), 32);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[test]
fn history_ledger_evicts_oldest_past_fifty_entries() {
    let mut ledger = OperationsHistory::new(50);
    let base = chrono::Utc::now();
    for n in 0..51u32 {
        let now = base + chrono::Duration::seconds(n as i64);
        ledger.record(
            OperationCategory::Backup,
            HistoryEntry {
                id: format!("backup-{}", n),
                timestamp: now,
                operation: "backup".into(),
                status: HistoryStatus::Success,
                payload: serde_json::json!({ "n": n }),
                duration_ms: 5,
                error: None,
            },
            now,
        );
    }
    assert_eq!(ledger.backup.len(), 50);
    assert_eq!(ledger.backup.oldest().unwrap().id, "backup-1");
    assert_eq!(ledger.backup.latest().unwrap().id, "backup-50");
    assert_eq!(ledger.last_updated, base + chrono::Duration::seconds(50));
}

/// Rejects every pre-auth-key issuance attempted under the numeric-ID
/// convention and accepts the username convention, the way a real
/// Headscale version mismatch rejects a stale client's numeric-ID call.
struct RejectsNumericCoordinator;
#[async_trait]
impl CoordinationApi for RejectsNumericCoordinator {
    async fn create_namespace(&self, _name: &str) -> mesh_definitions::Result<()> {
        Ok(())
    }
    async fn issue_admin_key(&self, _namespace: &str) -> mesh_definitions::Result<Secret> {
        Ok(Secret::new("admin"))
    }
    async fn list_users(&self, _namespace: &str) -> mesh_definitions::Result<Vec<UserCandidate>> {
        Ok(vec![UserCandidate { numeric_id: 42, username: "alice".into() }])
    }
    async fn issue_pre_auth_key(&self, _namespace: &str, identifier: &UserIdentifier) -> mesh_definitions::Result<Secret> {
        match identifier {
            UserIdentifier::Numeric(_) => {
                Err(mesh_definitions::ErrorKind::AuthError("numeric user-ID rejected".into()).into())
            }
            UserIdentifier::Username(_) => Ok(Secret::new("preauth-after-fallback")),
            UserIdentifier::Namespace(_) => {
                Err(mesh_definitions::ErrorKind::AuthError("namespace convention rejected".into()).into())
            }
        }
    }
    async fn list_peers(&self, _namespace: &str) -> mesh_definitions::Result<Vec<String>> {
        Ok(vec![])
    }
}

struct NoopExecutor;
#[async_trait]
impl RemoteExecutor for NoopExecutor {
    async fn run(&self, _host: &str, _user: &str, _command: &str, _timeout: Duration) -> mesh_definitions::Result<CommandOutput> {
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

#[tokio::test]
async fn coordinator_auth_key_fallback_completes_enrollment() {
    let cfg = TempConfig::write(
        r#"(cluster
            (metadata (name "c1"))
            (providers (aws (enabled true)))
            (nodes (name "m") (provider "aws") (roles controlplane)))"#,
    );
    let validator = Validator::new();
    let result = load_cluster(&cfg.path, false, &validator).unwrap();
    let mut nodes = build_inventory(&result.model).unwrap();
    nodes[0].public_ip = Some("9.9.9.9".parse().unwrap());

    let mesh = HeadscaleMesh::new(
        Arc::new(RejectsNumericCoordinator),
        Arc::new(NoopExecutor),
        "default",
        "https://headscale.example.com",
        Duration::from_secs(5),
    );

    let convention = mesh.enroll(&nodes[0]).await.unwrap();
    assert_eq!(convention, EnrollmentConvention::Username);
}

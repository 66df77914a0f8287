//! Health Checker: polls every node in the inventory until the cluster is
//! ready or a deadline expires, fanning the per-node probes out to run
//! concurrently and collecting results back. The fan-out shape mirrors
//! the worker-pool pattern used for mass Helm reconciliation, adapted to
//! async tasks since probes here are network calls rather than
//! CPU-bound shellouts.
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::time::delay_for;

use mesh_definitions::Node;
use mesh_definitions::Result;

/// One node's latest probe result.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeHealth {
    Healthy,
    Unreachable(String),
}

/// Aggregate result of a `wait_for_ready` poll cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthReport {
    pub total_nodes: usize,
    pub healthy_nodes: usize,
    pub per_node_status: BTreeMap<String, NodeHealth>,
    pub errors: Vec<String>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy_nodes == self.total_nodes
    }
}

/// A single health probe: TCP reachability, SSH banner, or overlay ping.
/// Implementors report reachability for one node; `health.rs` only owns
/// fan-out, polling cadence and aggregation.
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, node: &Node) -> Result<()>;
}

async fn probe_one(probe: &dyn Probe, node: Node) -> (String, NodeHealth) {
    match probe.check(&node).await {
        Ok(()) => (node.name, NodeHealth::Healthy),
        Err(e) => (node.name, NodeHealth::Unreachable(e.to_string())),
    }
}

/// Runs one probe pass over `nodes`, returning as soon as every probe has
/// reported. Probes run concurrently; this does not retry or poll.
pub async fn check_once(probe: &dyn Probe, nodes: &[Node]) -> HealthReport {
    let n = nodes.len();
    let results = join_all(nodes.iter().cloned().map(|node| probe_one(probe, node))).await;

    let mut per_node_status = BTreeMap::new();
    let mut errors = Vec::new();
    let mut healthy_nodes = 0;
    for (name, status) in results {
        if status == NodeHealth::Healthy {
            healthy_nodes += 1;
        } else if let NodeHealth::Unreachable(ref msg) = status {
            errors.push(format!("{}: {}", name, msg));
        }
        per_node_status.insert(name, status);
    }

    HealthReport {
        total_nodes: n,
        healthy_nodes,
        per_node_status,
        errors,
    }
}

/// Polls `nodes` at `interval` until every node is healthy or `deadline`
/// elapses, returning the last report either way.
pub async fn wait_for_ready(probe: &dyn Probe, nodes: &[Node], interval: Duration, deadline: Duration) -> HealthReport {
    let start = Instant::now();
    loop {
        let report = check_once(probe, nodes).await;
        if report.all_healthy() || start.elapsed() >= deadline {
            return report;
        }
        delay_for(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_definitions::model::RoleSpec;
    use mesh_definitions::NodeState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn node(name: &str) -> Node {
        Node {
            name: name.into(),
            provider: "aws".into(),
            region: None,
            size: "small".into(),
            image: None,
            roles: vec![RoleSpec::Worker],
            state: NodeState::Running,
            public_ip: None,
            private_ip: None,
            overlay_ip: None,
            overlay_public_key: None,
            spot: false,
        }
    }

    struct AlwaysHealthy;
    #[async_trait::async_trait]
    impl Probe for AlwaysHealthy {
        async fn check(&self, _node: &Node) -> Result<()> {
            Ok(())
        }
    }

    struct FailsUntilAttempt {
        attempts: Arc<AtomicUsize>,
        succeed_at: usize,
    }
    #[async_trait::async_trait]
    impl Probe for FailsUntilAttempt {
        async fn check(&self, _node: &Node) -> Result<()> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_at {
                Ok(())
            } else {
                Err(mesh_definitions::ErrorKind::DependencyMissingError("probe".into()).into())
            }
        }
    }

    #[tokio::test]
    async fn all_nodes_healthy_reports_full_coverage() {
        let nodes = vec![node("a"), node("b")];
        let report = check_once(&AlwaysHealthy, &nodes).await;
        assert_eq!(report.total_nodes, 2);
        assert_eq!(report.healthy_nodes, 2);
        assert!(report.all_healthy());
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn unreachable_node_is_reported_with_an_error() {
        struct AlwaysFails;
        #[async_trait::async_trait]
        impl Probe for AlwaysFails {
            async fn check(&self, _node: &Node) -> Result<()> {
                Err(mesh_definitions::ErrorKind::DependencyMissingError("probe".into()).into())
            }
        }
        let nodes = vec![node("a")];
        let report = check_once(&AlwaysFails, &nodes).await;
        assert_eq!(report.healthy_nodes, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(!report.all_healthy());
    }

    #[tokio::test]
    async fn wait_for_ready_converges_once_the_node_comes_up() {
        let probe = FailsUntilAttempt {
            attempts: Arc::new(AtomicUsize::new(0)),
            succeed_at: 3,
        };
        let nodes = vec![node("a")];
        let report = wait_for_ready(&probe, &nodes, Duration::from_millis(5), Duration::from_secs(2)).await;
        assert!(report.all_healthy());
    }

    #[tokio::test]
    async fn wait_for_ready_gives_up_at_the_deadline() {
        struct NeverHealthy;
        #[async_trait::async_trait]
        impl Probe for NeverHealthy {
            async fn check(&self, _node: &Node) -> Result<()> {
                Err(mesh_definitions::ErrorKind::DependencyMissingError("probe".into()).into())
            }
        }
        let nodes = vec![node("a")];
        let report = wait_for_ready(&NeverHealthy, &nodes, Duration::from_millis(5), Duration::from_millis(20)).await;
        assert!(!report.all_healthy());
    }
}

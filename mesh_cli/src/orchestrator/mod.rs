//! Deployment Orchestrator: runs the fixed phase graph against the
//! desired-state engine, threading outputs between phases through
//! write-once handles. The phase list is an explicit trait object
//! sequence since the phase count and dependencies are fixed by the
//! overlay and distribution the model selects, not by a dynamic
//! service set.
pub mod phases;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use mesh_definitions::adapters::StateEngine;
use mesh_definitions::crypto::cluster_token;
use mesh_definitions::model::ClusterModel;
use mesh_definitions::{ErrorKind, Node, Result};

/// A write-once slot one phase produces and later phases read. Mirrors
/// the orchestrator's "future-valued handle" requirement: a read before
/// the write is a programming error, not a silent default.
pub struct Output<T>(once_cell::sync::OnceCell<T>);

impl<T> Output<T> {
    pub fn new() -> Self {
        Output(once_cell::sync::OnceCell::new())
    }

    pub fn set(&self, value: T) -> Result<()> {
        self.0
            .set(value)
            .map_err(|_| ErrorKind::StateEngineError("phase output written twice".into()).into())
    }

    pub fn get(&self) -> Result<&T> {
        self.0
            .get()
            .ok_or_else(|| ErrorKind::StateEngineError("phase output read before it was produced".into()).into())
    }
}

impl<T> Default for Output<T> {
    fn default() -> Self {
        Output::new()
    }
}

/// Shared, mutable-by-convention state threaded through every phase. Node
/// records are owned by the Node Inventory; phases mutate them only
/// through `set_node_network` / `set_node_state`, never by replacing the
/// vector wholesale.
pub struct PhaseCtx {
    pub stack: String,
    pub model: ClusterModel,
    pub state: Arc<dyn StateEngine>,
    nodes: std::sync::Mutex<Vec<Node>>,

    pub ssh_keypair: Output<(String, mesh_definitions::Secret)>,
    pub cluster_token: Output<String>,
    pub peer_tables: Output<std::collections::BTreeMap<String, mesh_definitions::PeerConfig>>,
    pub kubeconfig: Output<mesh_definitions::Secret>,
    pub overall_health: Output<crate::health::HealthReport>,
}

impl PhaseCtx {
    pub fn new(stack: impl Into<String>, model: ClusterModel, nodes: Vec<Node>, state: Arc<dyn StateEngine>) -> Self {
        PhaseCtx {
            stack: stack.into(),
            model,
            state,
            nodes: std::sync::Mutex::new(nodes),
            ssh_keypair: Output::new(),
            cluster_token: Output::new(),
            peer_tables: Output::new(),
            kubeconfig: Output::new(),
            overall_health: Output::new(),
        }
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.lock().unwrap().clone()
    }

    pub fn set_node_network(
        &self,
        name: &str,
        public_ip: Option<std::net::IpAddr>,
        private_ip: Option<std::net::IpAddr>,
    ) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| ErrorKind::ConfigEvalError("nodes".into(), format!("unknown node '{}'", name)))?;
        if public_ip.is_some() {
            node.public_ip = public_ip;
        }
        if private_ip.is_some() {
            node.private_ip = private_ip;
        }
        Ok(())
    }

    pub fn set_node_state(&self, name: &str, state: mesh_definitions::NodeState) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| ErrorKind::ConfigEvalError("nodes".into(), format!("unknown node '{}'", name)))?;
        node.state = state;
        Ok(())
    }

    pub fn set_overlay_public_key(&self, name: &str, key: mesh_definitions::Secret) -> Result<()> {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| ErrorKind::ConfigEvalError("nodes".into(), format!("unknown node '{}'", name)))?;
        node.overlay_public_key = Some(key);
        Ok(())
    }

    /// Derives and records the stack's cluster token the first time it is
    /// requested; stable across the lifetime of this context, matching the
    /// "stable per stack, not rotated on re-deploy" decision.
    pub fn ensure_cluster_token(&self) -> Result<&str> {
        if self.cluster_token.0.get().is_none() {
            let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
            let token = cluster_token(&self.model.metadata.name, now.as_secs(), now.subsec_nanos());
            self.cluster_token.set(token)?;
        }
        self.cluster_token.get().map(|s| s.as_str())
    }
}

/// One stage of the orchestrator's fixed graph. `depends_on` is
/// informational (ordering is enforced by the fixed `PHASE_ORDER` list, not
/// derived from it) — it documents the phase table for readers and tests.
#[async_trait::async_trait]
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;
    fn depends_on(&self) -> &'static [&'static str];
    async fn run(&self, ctx: &PhaseCtx) -> Result<PhaseOutcome>;
}

/// What a phase reports back: full success, or a set of per-node failures
/// that did not abort the rest of a parallelizable phase.
#[derive(Debug, Default)]
pub struct PhaseOutcome {
    pub failed_nodes: Vec<(String, String)>,
}

impl PhaseOutcome {
    pub fn ok() -> Self {
        PhaseOutcome::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed_nodes.is_empty()
    }
}

/// Runs `phases` strictly in order, aborting at the first phase that
/// returns an `Err` or a non-empty per-node failure set. A phase fans its
/// own work out across nodes and keeps going after an individual node
/// fails — that fan-out is what "parallelizable" means here — but the
/// pipeline itself does not proceed to the next phase once any node in
/// the current one has failed, since every later phase assumes the
/// inventory it's handed is fully up.
pub async fn run_phases(ctx: &PhaseCtx, phases: &[Box<dyn Phase>]) -> Result<HashMap<String, PhaseOutcome>> {
    let mut results = HashMap::new();
    for phase in phases {
        info!("orchestrator: running phase '{}'", phase.name());
        let outcome = phase.run(ctx).await?;
        if !outcome.is_success() {
            let detail = outcome
                .failed_nodes
                .iter()
                .map(|(name, msg)| format!("{}: {}", name, msg))
                .collect::<Vec<_>>()
                .join("; ");
            warn!(
                "orchestrator: phase '{}' had {} node failure(s), aborting",
                phase.name(),
                outcome.failed_nodes.len()
            );
            results.insert(phase.name().to_string(), outcome);
            return Err(ErrorKind::StateEngineError(format!(
                "phase '{}' failed for node(s): {}",
                phase.name(),
                detail
            ))
            .into());
        }
        results.insert(phase.name().to_string(), outcome);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_read_before_write_errors() {
        let out: Output<u32> = Output::new();
        assert!(out.get().is_err());
    }

    #[test]
    fn output_set_twice_errors() {
        let out: Output<u32> = Output::new();
        out.set(1).unwrap();
        assert!(out.set(2).is_err());
        assert_eq!(*out.get().unwrap(), 1);
    }

    #[test]
    fn cluster_token_is_stable_across_repeated_calls() {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        let ctx = PhaseCtx::new(
            "c1",
            model,
            vec![],
            Arc::new(crate::adapters::InMemoryStateEngine::new()),
        );
        let first = ctx.ensure_cluster_token().unwrap().to_string();
        let second = ctx.ensure_cluster_token().unwrap().to_string();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    struct AlwaysOkPhase(&'static str);
    #[async_trait::async_trait]
    impl Phase for AlwaysOkPhase {
        fn name(&self) -> &'static str {
            self.0
        }
        fn depends_on(&self) -> &'static [&'static str] {
            &[]
        }
        async fn run(&self, _ctx: &PhaseCtx) -> Result<PhaseOutcome> {
            Ok(PhaseOutcome::ok())
        }
    }

    struct NodeFailurePhase(&'static str);
    #[async_trait::async_trait]
    impl Phase for NodeFailurePhase {
        fn name(&self) -> &'static str {
            self.0
        }
        fn depends_on(&self) -> &'static [&'static str] {
            &[]
        }
        async fn run(&self, _ctx: &PhaseCtx) -> Result<PhaseOutcome> {
            Ok(PhaseOutcome {
                failed_nodes: vec![("n1".to_string(), "unreachable".to_string())],
            })
        }
    }

    fn ctx() -> PhaseCtx {
        let mut model = ClusterModel::default();
        model.metadata.name = "c1".into();
        PhaseCtx::new("c1", model, vec![], Arc::new(crate::adapters::InMemoryStateEngine::new()))
    }

    #[tokio::test]
    async fn run_phases_aborts_after_a_phase_with_node_failures() {
        let ctx = ctx();
        let phases: Vec<Box<dyn Phase>> = vec![
            Box::new(AlwaysOkPhase("a")),
            Box::new(NodeFailurePhase("b")),
            Box::new(AlwaysOkPhase("c")),
        ];
        let err = run_phases(&ctx, &phases).await.unwrap_err();
        assert!(format!("{}", err).contains("'b'"));
    }

    #[tokio::test]
    async fn run_phases_runs_every_phase_when_all_succeed() {
        let ctx = ctx();
        let phases: Vec<Box<dyn Phase>> = vec![Box::new(AlwaysOkPhase("a")), Box::new(AlwaysOkPhase("b"))];
        let results = run_phases(&ctx, &phases).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}

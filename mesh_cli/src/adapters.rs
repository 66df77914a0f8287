//! Concrete adapters for the external contracts in
//! `mesh_definitions::adapters`. Everything here is a test double or a
//! dry-run stand-in: real cloud SDKs, a real desired-state engine and a
//! real coordination-server client are deliberately out of scope, the way
//! the trait docs describe them.
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use mesh_definitions::adapters::{
    CloudProvider, CommandOutput, CoordinationApi, ProvisionedNode, RemoteExecutor, ResourceDeclaration, StackOutput,
    StateEngine, UserCandidate, UserIdentifier,
};
use mesh_definitions::{ErrorKind, Result, Secret};

/// Per-stack resource/output bag, guarded by one lock per stack the way
/// the ledger's docs describe the real state engine's "single-writer
/// lock" semantics.
#[derive(Default)]
struct StackState {
    resources: HashMap<String, ResourceDeclaration>,
    outputs: HashMap<String, StackOutput>,
}

/// In-process `StateEngine`: holds declarations/outputs in memory for the
/// lifetime of the process. Useful for `--dry-run` and for exercising the
/// orchestrator and history ledger without a real backing store.
#[derive(Default)]
pub struct InMemoryStateEngine {
    stacks: Mutex<HashMap<String, StackState>>,
}

impl InMemoryStateEngine {
    pub fn new() -> Self {
        InMemoryStateEngine::default()
    }
}

#[async_trait::async_trait]
impl StateEngine for InMemoryStateEngine {
    async fn declare(&self, stack: &str, resource: ResourceDeclaration) -> Result<()> {
        let mut stacks = self.stacks.lock().unwrap();
        let entry = stacks.entry(stack.to_string()).or_default();
        entry.resources.insert(resource.id.clone(), resource);
        Ok(())
    }

    async fn set_output(&self, stack: &str, key: &str, value: StackOutput) -> Result<()> {
        let mut stacks = self.stacks.lock().unwrap();
        let entry = stacks.entry(stack.to_string()).or_default();
        entry.outputs.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_output(&self, stack: &str, key: &str) -> Result<Option<StackOutput>> {
        let stacks = self.stacks.lock().unwrap();
        Ok(stacks.get(stack).and_then(|s| s.outputs.get(key).cloned()))
    }

    async fn destroy(&self, stack: &str) -> Result<()> {
        let mut stacks = self.stacks.lock().unwrap();
        stacks.remove(stack);
        Ok(())
    }
}

/// `CloudProvider` stand-in that never touches a real cloud: node
/// creation hands out synthetic, deterministic addresses derived from a
/// counter. Named `null` the way Terraform/Pulumi's own "null provider"
/// is used for graph-shape testing.
pub struct NullCloudProvider {
    counter: AtomicU32,
}

impl NullCloudProvider {
    pub fn new() -> Self {
        NullCloudProvider { counter: AtomicU32::new(1) }
    }
}

impl Default for NullCloudProvider {
    fn default() -> Self {
        NullCloudProvider::new()
    }
}

#[async_trait::async_trait]
impl CloudProvider for NullCloudProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn create_network(&self, stack: &str, _cidr: &str) -> Result<String> {
        Ok(format!("{}-network", stack))
    }

    async fn create_node(
        &self,
        _stack: &str,
        _name: &str,
        _size: &str,
        _image: &str,
        _network_id: &str,
    ) -> Result<ProvisionedNode> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let public_ip: IpAddr = format!("198.51.100.{}", n % 254 + 1).parse().unwrap();
        let private_ip: IpAddr = format!("10.0.0.{}", n % 254 + 1).parse().unwrap();
        Ok(ProvisionedNode {
            public_ip: Some(public_ip),
            private_ip: Some(private_ip),
        })
    }

    async fn apply_firewall(&self, _stack: &str, _node_name: &str, _ports: &[u16]) -> Result<()> {
        Ok(())
    }

    async fn register_dns(&self, _stack: &str, _name: &str, _ip: IpAddr) -> Result<()> {
        Ok(())
    }
}

/// `RemoteExecutor` stand-in that always succeeds without running
/// anything, for orchestrator tests and `--dry-run` where no host is
/// actually reachable yet.
pub struct NullRemoteExecutor;

#[async_trait::async_trait]
impl RemoteExecutor for NullRemoteExecutor {
    async fn run(&self, _host: &str, _user: &str, _command: &str, _timeout: Duration) -> Result<CommandOutput> {
        Ok(CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
        })
    }
}

/// `RemoteExecutor` that actually runs the command, but locally via a
/// shell rather than over SSH — useful for exercising the SSH pool's
/// retry/coalescing logic in tests without a real network hop. A real
/// SSH-backed implementation is out of scope here (adapters own the
/// transport; this crate only defines the contract and this local
/// stand-in).
pub struct ShellRemoteExecutor;

#[async_trait::async_trait]
impl RemoteExecutor for ShellRemoteExecutor {
    async fn run(&self, host: &str, user: &str, command: &str, timeout: Duration) -> Result<CommandOutput> {
        debug!("shell-exec (simulating {}@{}): {}", user, host, command);
        let fut = tokio::process::Command::new("sh").arg("-c").arg(command).output();
        let output = tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| ErrorKind::TimeoutError(format!("command on {}", host)))??;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// `CoordinationApi` stand-in that models the numeric-ID → username →
/// namespace fallback the real coordinator is known to need across
/// versions: `accepted_convention` picks which identifier convention this
/// mock grants a key under, rejecting every issuance attempt under any
/// other convention, so tests can exercise every branch of `enroll`'s
/// retry loop without a live Headscale server.
pub struct MockCoordinator {
    accepted_convention: UserIdentifier,
    namespaces: Mutex<BTreeMap<String, ()>>,
}

impl MockCoordinator {
    pub fn new(accepted_convention: UserIdentifier) -> Self {
        MockCoordinator {
            accepted_convention,
            namespaces: Mutex::new(BTreeMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl CoordinationApi for MockCoordinator {
    async fn create_namespace(&self, name: &str) -> Result<()> {
        self.namespaces.lock().unwrap().insert(name.to_string(), ());
        Ok(())
    }

    async fn issue_admin_key(&self, _namespace: &str) -> Result<Secret> {
        Ok(Secret::new("mock-admin-key"))
    }

    async fn list_users(&self, _namespace: &str) -> Result<Vec<UserCandidate>> {
        Ok(vec![UserCandidate { numeric_id: 1, username: "operator".into() }])
    }

    async fn issue_pre_auth_key(&self, _namespace: &str, identifier: &UserIdentifier) -> Result<Secret> {
        if identifier.same_convention(&self.accepted_convention) {
            Ok(Secret::new("mock-preauth-key"))
        } else {
            Err(ErrorKind::AuthError(format!("identifier {:?} rejected by mock coordinator", identifier)).into())
        }
    }

    async fn list_peers(&self, namespace: &str) -> Result<Vec<String>> {
        let namespaces = self.namespaces.lock().unwrap();
        if namespaces.contains_key(namespace) {
            Ok(vec![])
        } else {
            Err(ErrorKind::AuthError(format!("unknown namespace '{}'", namespace)).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_state_engine_round_trips_outputs() {
        let engine = InMemoryStateEngine::new();
        engine
            .set_output("c1", "kubeconfig", StackOutput::Secret(Secret::new("abc")))
            .await
            .unwrap();
        let read = engine.get_output("c1", "kubeconfig").await.unwrap();
        assert_eq!(read, Some(StackOutput::Secret(Secret::new("abc"))));
        assert_eq!(engine.get_output("c1", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn destroy_clears_stack_state() {
        let engine = InMemoryStateEngine::new();
        engine
            .declare(
                "c1",
                ResourceDeclaration {
                    id: "c1-node-0".into(),
                    kind: "node".into(),
                    properties: BTreeMap::new(),
                },
            )
            .await
            .unwrap();
        engine.destroy("c1").await.unwrap();
        assert_eq!(engine.get_output("c1", "anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn null_cloud_provider_hands_out_distinct_addresses() {
        let provider = NullCloudProvider::new();
        let a = provider.create_node("c1", "a", "small", "img", "net").await.unwrap();
        let b = provider.create_node("c1", "b", "small", "img", "net").await.unwrap();
        assert_ne!(a.public_ip, b.public_ip);
    }

    #[tokio::test]
    async fn shell_executor_reports_exit_code_and_stdout() {
        let executor = ShellRemoteExecutor;
        let out = executor.run("localhost", "root", "echo hi", Duration::from_secs(2)).await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout.trim(), "hi");
    }

    #[tokio::test]
    async fn mock_coordinator_rejects_unknown_namespace_peer_listing() {
        let coordinator = MockCoordinator::new(UserIdentifier::Numeric(1));
        assert!(coordinator.list_peers("default").await.is_err());
        coordinator.create_namespace("default").await.unwrap();
        assert!(coordinator.list_peers("default").await.is_ok());
    }

    #[tokio::test]
    async fn mock_coordinator_rejects_every_convention_but_the_accepted_one() {
        let coordinator = MockCoordinator::new(UserIdentifier::Username("operator".into()));
        assert!(coordinator
            .issue_pre_auth_key("default", &UserIdentifier::Numeric(1))
            .await
            .is_err());
        assert!(coordinator
            .issue_pre_auth_key("default", &UserIdentifier::Username("operator".into()))
            .await
            .is_ok());
        assert!(coordinator
            .issue_pre_auth_key("default", &UserIdentifier::Namespace("default".into()))
            .await
            .is_err());
    }
}

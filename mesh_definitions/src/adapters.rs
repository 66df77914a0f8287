//! External Adapters: thin contracts to collaborators explicitly
//! out of scope — the desired-state engine, cloud SDKs,
//! the remote command executor, and the coordination-server API. Only
//! the trait shapes live here; concrete implementations (real or test
//! doubles) live in the `meshctl` binary crate.
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::secret::Secret;
use crate::Result;

/// A declared cloud resource, handed to the desired-state engine. The
/// engine owns diffing, idempotency and persistence; this crate only
/// describes what is wanted.
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceDeclaration {
    /// Stable, name-derived identity: `"{cluster}-{role}-{index}"`
    /// or `"{cluster}-{componentTag}"`.
    pub id: String,
    pub kind: String,
    pub properties: BTreeMap<String, String>,
}

/// An opaque or plain output the state engine stores alongside a stack.
#[derive(Clone, Debug, PartialEq)]
pub enum StackOutput {
    Plain(String),
    List(Vec<String>),
    Secret(Secret),
}

/// The desired-state engine contract: accepts
/// resource declarations, diffs against persisted state, and converges.
#[async_trait]
pub trait StateEngine: Send + Sync {
    async fn declare(&self, stack: &str, resource: ResourceDeclaration) -> Result<()>;
    async fn set_output(&self, stack: &str, key: &str, value: StackOutput) -> Result<()>;
    async fn get_output(&self, stack: &str, key: &str) -> Result<Option<StackOutput>>;
    async fn destroy(&self, stack: &str) -> Result<()>;
}

/// A created cloud VM's result, as returned by `CloudProvider::create_node`.
#[derive(Clone, Debug, PartialEq)]
pub struct ProvisionedNode {
    pub public_ip: Option<std::net::IpAddr>,
    pub private_ip: Option<std::net::IpAddr>,
}

/// Cloud provider SDK contract (VM/VPC/firewall/DNS primitives), out of
/// scope. One implementor per supported provider.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn create_network(&self, stack: &str, cidr: &str) -> Result<String>;
    async fn create_node(
        &self,
        stack: &str,
        name: &str,
        size: &str,
        image: &str,
        network_id: &str,
    ) -> Result<ProvisionedNode>;
    async fn apply_firewall(&self, stack: &str, node_name: &str, ports: &[u16]) -> Result<()>;
    async fn register_dns(&self, stack: &str, name: &str, ip: std::net::IpAddr) -> Result<()>;
}

/// The output of a single remote command execution.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The remote command executor contract: runs a
/// shell script on a host over a secure channel, possibly through a
/// bastion.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn run(
        &self,
        host: &str,
        user: &str,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput>;
}

/// One account the coordinator's JSON user-listing endpoint reports.
/// `enroll` probes this listing before attempting a pre-auth-key
/// issuance under any identifier convention.
#[derive(Clone, Debug, PartialEq)]
pub struct UserCandidate {
    pub numeric_id: u64,
    pub username: String,
}

/// A user-identifier convention a pre-auth-key issuance can be attempted
/// under; the coordinator's API has changed conventions across versions,
/// so callers attempt these in turn rather than assuming one.
#[derive(Clone, Debug, PartialEq)]
pub enum UserIdentifier {
    Numeric(u64),
    Username(String),
    Namespace(String),
}

impl UserIdentifier {
    /// True when `self` and `other` use the same convention, regardless
    /// of the value each carries — a coordinator implementation checks
    /// this to decide whether to accept or reject a given attempt.
    pub fn same_convention(&self, other: &UserIdentifier) -> bool {
        matches!(
            (self, other),
            (UserIdentifier::Numeric(_), UserIdentifier::Numeric(_))
                | (UserIdentifier::Username(_), UserIdentifier::Username(_))
                | (UserIdentifier::Namespace(_), UserIdentifier::Namespace(_))
        )
    }
}

/// The coordination-server API contract (Headscale/Tailscale control
/// plane), out of scope.
#[async_trait]
pub trait CoordinationApi: Send + Sync {
    async fn create_namespace(&self, name: &str) -> Result<()>;
    async fn issue_admin_key(&self, namespace: &str) -> Result<Secret>;
    /// Lists known accounts in `namespace` via the coordinator's JSON
    /// listing endpoint.
    async fn list_users(&self, namespace: &str) -> Result<Vec<UserCandidate>>;
    /// Attempts to issue a pre-auth key addressed to `identifier`.
    /// Rejects with `AuthError` when the coordinator doesn't accept that
    /// particular convention, so the caller can retry under the next one.
    async fn issue_pre_auth_key(&self, namespace: &str, identifier: &UserIdentifier) -> Result<Secret>;
    async fn list_peers(&self, namespace: &str) -> Result<Vec<String>>;
}

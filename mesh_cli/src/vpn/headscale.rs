//! Coordinator-based mesh (Tailscale client against a Headscale control
//! plane). Enrollment goes through `CoordinationApi`; per-node work goes
//! through `RemoteExecutor`. The coordinator's pre-auth-key API has
//! changed user-identifier conventions across versions, so `enroll`
//! probes the user listing, then attempts numeric ID, username, and
//! `--namespace` in turn, stopping at the first one the coordinator
//! accepts and recording which convention worked.
use std::sync::Arc;

use mesh_definitions::adapters::{CoordinationApi, RemoteExecutor, UserIdentifier};
use mesh_definitions::peer::{Peer, PeerConfig};
use mesh_definitions::{ErrorKind, Node, Result};

use super::{ClientConfigParams, OverlayStatus, VpnKind, VpnProvider};

/// Which identifier convention a pre-auth-key issuance ultimately
/// succeeded with — recorded as a per-deploy fact, not retried silently.
#[derive(Clone, Debug, PartialEq)]
pub enum EnrollmentConvention {
    Numeric,
    Username,
    Namespace,
}

pub struct HeadscaleMesh {
    coordinator: Arc<dyn CoordinationApi>,
    executor: Arc<dyn RemoteExecutor>,
    namespace: String,
    coordinator_url: String,
    timeout: std::time::Duration,
}

impl HeadscaleMesh {
    pub fn new(
        coordinator: Arc<dyn CoordinationApi>,
        executor: Arc<dyn RemoteExecutor>,
        namespace: impl Into<String>,
        coordinator_url: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Self {
        HeadscaleMesh {
            coordinator,
            executor,
            namespace: namespace.into(),
            coordinator_url: coordinator_url.into(),
            timeout,
        }
    }

    async fn run(&self, node: &Node, command: &str) -> Result<String> {
        let host = node
            .public_ip
            .ok_or_else(|| ErrorKind::OverlayError(format!("node '{}' has no public IP", node.name)))?;
        let output = self
            .executor
            .run(&host.to_string(), "root", command, self.timeout)
            .await?;
        if !output.success() {
            return Err(ErrorKind::OverlayError(format!(
                "command on '{}' exited {}: {}",
                node.name, output.exit_code, output.stderr
            ))
            .into());
        }
        Ok(output.stdout)
    }

    /// Probes the coordinator's user listing, then attempts a pre-auth-key
    /// issuance for `node` under numeric ID, then username, then
    /// `--namespace`, stopping at the first convention the coordinator
    /// accepts and recording which one it was.
    pub async fn enroll(&self, node: &Node) -> Result<EnrollmentConvention> {
        let candidate = self
            .coordinator
            .list_users(&self.namespace)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ErrorKind::AuthError(format!("coordinator returned no users for namespace '{}'", self.namespace)))?;

        let attempts = [
            (UserIdentifier::Numeric(candidate.numeric_id), EnrollmentConvention::Numeric),
            (UserIdentifier::Username(candidate.username), EnrollmentConvention::Username),
            (UserIdentifier::Namespace(self.namespace.clone()), EnrollmentConvention::Namespace),
        ];

        let mut last_rejection = None;
        for (identifier, convention) in attempts {
            match self.coordinator.issue_pre_auth_key(&self.namespace, &identifier).await {
                Ok(key) => {
                    if convention != EnrollmentConvention::Numeric {
                        warn!(
                            "node '{}' enrolled via {:?} convention after an earlier convention was rejected",
                            node.name, convention
                        );
                    }
                    let command = format!(
                        "tailscale up --login-server={} --authkey={} --accept-routes",
                        self.coordinator_url,
                        key.expose()
                    );
                    self.run(node, &command).await?;
                    return Ok(convention);
                }
                Err(e) if matches!(e.kind(), ErrorKind::AuthError(_)) => {
                    last_rejection = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_rejection.unwrap_or_else(|| {
            ErrorKind::AuthError(format!("node '{}' could not enroll under any identifier convention", node.name)).into()
        }))
    }
}

#[async_trait::async_trait]
impl VpnProvider for HeadscaleMesh {
    fn name(&self) -> &'static str {
        "headscale"
    }
    fn kind(&self) -> VpnKind {
        VpnKind::Headscale
    }
    fn requires_coordinator(&self) -> bool {
        true
    }
    fn interface_name(&self) -> &'static str {
        "tailscale0"
    }

    async fn install(&self, node: &Node) -> Result<()> {
        self.run(
            node,
            "command -v tailscale >/dev/null || curl -fsSL https://tailscale.com/install.sh | sh",
        )
        .await?;
        Ok(())
    }

    async fn configure(&self, node: &Node, _cfg: &PeerConfig) -> Result<()> {
        self.enroll(node).await?;
        Ok(())
    }

    async fn add_peer(&self, _node: &Node, _peer: &Peer) -> Result<()> {
        // The coordinator owns peer enumeration; a coordinator-based mesh
        // has no per-node peer list to push.
        Ok(())
    }

    async fn remove_peer(&self, _node: &Node, _peer_id: &str) -> Result<()> {
        Ok(())
    }

    async fn list_peers(&self, _node: &Node) -> Result<Vec<String>> {
        self.coordinator.list_peers(&self.namespace).await
    }

    async fn get_status(&self, node: &Node) -> Result<OverlayStatus> {
        let out = self.run(node, "tailscale status --json").await?;
        let parsed: serde_json::Value = serde_json::from_str(&out)
            .map_err(|e| ErrorKind::OverlayError(format!("unparseable tailscale status: {}", e)))?;
        let online = parsed
            .get("Self")
            .and_then(|s| s.get("Online"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let peer_count = parsed.get("Peer").and_then(|p| p.as_object()).map(|m| m.len()).unwrap_or(0);
        Ok(OverlayStatus { online, peer_count })
    }

    fn generate_client_config(&self, params: &ClientConfigParams) -> Result<String> {
        Ok(format!(
            "login-server={}\nhostname={}\noverlay-ip={}\n",
            self.coordinator_url, params.node_name, params.overlay_ip
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mesh_definitions::adapters::{CommandOutput, UserCandidate};
    use mesh_definitions::model::RoleSpec;
    use mesh_definitions::secret::Secret;
    use mesh_definitions::NodeState;
    use std::time::Duration;

    /// Accepts issuance attempts under exactly one convention and rejects
    /// every other, the way a real coordinator version only honors one
    /// identifier scheme at a time.
    struct FixedCoordinator {
        accepted: UserIdentifier,
    }
    #[async_trait]
    impl CoordinationApi for FixedCoordinator {
        async fn create_namespace(&self, _name: &str) -> Result<()> {
            Ok(())
        }
        async fn issue_admin_key(&self, _namespace: &str) -> Result<Secret> {
            Ok(Secret::new("admin"))
        }
        async fn list_users(&self, _namespace: &str) -> Result<Vec<UserCandidate>> {
            Ok(vec![UserCandidate { numeric_id: 7, username: "alice".into() }])
        }
        async fn issue_pre_auth_key(&self, _namespace: &str, identifier: &UserIdentifier) -> Result<Secret> {
            if identifier.same_convention(&self.accepted) {
                Ok(Secret::new("preauth-token"))
            } else {
                Err(ErrorKind::AuthError(format!("identifier {:?} rejected", identifier)).into())
            }
        }
        async fn list_peers(&self, _namespace: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    struct RejectsEverything;
    #[async_trait]
    impl CoordinationApi for RejectsEverything {
        async fn create_namespace(&self, _name: &str) -> Result<()> {
            Ok(())
        }
        async fn issue_admin_key(&self, _namespace: &str) -> Result<Secret> {
            Ok(Secret::new("admin"))
        }
        async fn list_users(&self, _namespace: &str) -> Result<Vec<UserCandidate>> {
            Ok(vec![UserCandidate { numeric_id: 1, username: "x".into() }])
        }
        async fn issue_pre_auth_key(&self, _namespace: &str, identifier: &UserIdentifier) -> Result<Secret> {
            Err(ErrorKind::AuthError(format!("identifier {:?} rejected", identifier)).into())
        }
        async fn list_peers(&self, _namespace: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    struct NoopExecutor;
    #[async_trait]
    impl RemoteExecutor for NoopExecutor {
        async fn run(&self, _host: &str, _user: &str, _command: &str, _timeout: Duration) -> Result<CommandOutput> {
            Ok(CommandOutput {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: 0,
            })
        }
    }

    fn node() -> Node {
        Node {
            name: "n1".into(),
            provider: "aws".into(),
            region: None,
            size: "small".into(),
            image: None,
            roles: vec![RoleSpec::ControlPlane],
            state: NodeState::Running,
            public_ip: Some("1.2.3.4".parse().unwrap()),
            private_ip: None,
            overlay_ip: Some("10.8.0.1".parse().unwrap()),
            overlay_public_key: None,
            spot: false,
        }
    }

    fn mesh(coordinator: impl CoordinationApi + 'static) -> HeadscaleMesh {
        HeadscaleMesh::new(
            Arc::new(coordinator),
            Arc::new(NoopExecutor),
            "default",
            "https://headscale.example.com",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn numeric_convention_enrolls_without_fallback() {
        let m = mesh(FixedCoordinator { accepted: UserIdentifier::Numeric(0) });
        let convention = m.enroll(&node()).await.unwrap();
        assert_eq!(convention, EnrollmentConvention::Numeric);
    }

    #[tokio::test]
    async fn numeric_rejection_falls_back_to_username() {
        let m = mesh(FixedCoordinator { accepted: UserIdentifier::Username(String::new()) });
        let convention = m.enroll(&node()).await.unwrap();
        assert_eq!(convention, EnrollmentConvention::Username);
    }

    #[tokio::test]
    async fn numeric_and_username_rejection_falls_back_to_namespace() {
        let m = mesh(FixedCoordinator { accepted: UserIdentifier::Namespace(String::new()) });
        let convention = m.enroll(&node()).await.unwrap();
        assert_eq!(convention, EnrollmentConvention::Namespace);
    }

    #[tokio::test]
    async fn rejection_of_every_convention_is_an_auth_error() {
        let m = mesh(RejectsEverything);
        assert!(m.enroll(&node()).await.is_err());
    }
}

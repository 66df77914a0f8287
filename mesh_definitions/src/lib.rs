//! Typed cluster model, validator, history ledger and external-adapter
//! contracts shared by the config pipeline (`mesh_config`) and the
//! orchestrator binary (`meshctl`).
#![allow(non_snake_case)]

#[macro_use]
extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate serde_yaml;

#[macro_use]
extern crate log;

#[macro_use]
extern crate error_chain;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }
    links {}
    foreign_links {
        Io(::std::io::Error);
        Int(::std::num::ParseIntError);
        Float(::std::num::ParseFloatError);
        Addr(::std::net::AddrParseError);
        SerdeY(serde_yaml::Error);
        SerdeJ(serde_json::Error);
    }
    errors {
        ConfigParseError(msg: String) {
            description("source text could not be read as s-expressions")
            display("config parse error: {}", msg)
        }
        ConfigEvalError(form: String, msg: String) {
            description("an evaluator built-in or special form failed")
            display("eval error in `{}`: {}", form, msg)
        }
        ValidationError(count: usize) {
            description("the validator found at least one error-severity issue")
            display("{} validation error(s)", count)
        }
        DependencyMissingError(what: String) {
            description("a required external binary or port is unreachable")
            display("dependency missing: {}", what)
        }
        ProviderError(provider: String, msg: String) {
            description("a cloud SDK call failed")
            display("provider '{}' error: {}", provider, msg)
        }
        OverlayError(msg: String) {
            description("key exchange, enrollment, or reachability verification failed")
            display("overlay error: {}", msg)
        }
        TimeoutError(op: String) {
            description("an operation-wide or per-task deadline expired")
            display("timed out waiting for {}", op)
        }
        AuthError(msg: String) {
            description("an auth key or API key was rejected")
            display("auth error: {}", msg)
        }
        StateEngineError(msg: String) {
            description("the desired-state store refused the declaration")
            display("state engine error: {}", msg)
        }
        MissingProviders {
            description("no provider enabled")
            display("at least one provider must be enabled")
        }
        DualOverlay {
            description("both wireguard and tailscale enabled")
            display("cannot enable both wireguard and tailscale overlays")
        }
    }
}

pub mod adapters;
pub mod crypto;
pub mod history;
pub mod model;
pub mod node;
pub mod peer;
pub mod secret;
pub mod validate;

pub use crate::adapters::{CloudProvider, CoordinationApi, RemoteExecutor, StateEngine};
pub use crate::history::{HistoryEntry, HistoryStatus, OperationCategory, OperationsHistory};
pub use crate::model::ClusterModel;
pub use crate::node::{Node, NodeState, Role};
pub use crate::peer::{Peer, PeerConfig};
pub use crate::secret::Secret;
pub use crate::validate::{Severity, ValidationIssue};

//! `meshctl`: drives a declarative cluster description to a live,
//! multi-cloud Kubernetes cluster connected by an encrypted overlay mesh.
//! This crate hosts everything downstream of the config pipeline in
//! `mesh_config`: the node inventory, the SSH pool, the health checker,
//! the VPN overlay implementations, the deployment orchestrator, the
//! history ledger's store trait, and test-double adapters.
#[macro_use]
extern crate log;

pub use mesh_definitions::{Error, ErrorKind, Result};

pub mod adapters;
pub mod health;
pub mod history_store;
pub mod inventory;
pub mod orchestrator;
pub mod ssh_pool;
pub mod vpn;

pub use crate::inventory::build_inventory;

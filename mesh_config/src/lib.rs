//! The declarative configuration pipeline: parses cluster description
//! s-expressions, evaluates them against a context, and maps the result
//! onto the typed `ClusterModel` defined in `mesh_definitions`.
#[macro_use]
extern crate log;

pub use mesh_definitions::{Error, ErrorKind, Result};

pub mod eval;
pub mod expr;
pub mod load;
pub mod mapper;
pub mod reader;

pub use crate::eval::EvalContext;
pub use crate::expr::Expr;
pub use crate::load::load_cluster;
pub use crate::mapper::{map_cluster, MapperDiagnostic};

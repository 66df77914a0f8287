//! Ties the pipeline together: parse source text, resolve embedded
//! expressions against an evaluation context, project the result onto
//! a typed `ClusterModel`, then run the validator battery. This is the
//! single entry point `meshctl` calls to turn a config file into either
//! a model it can deploy or a list of issues it must report.
use std::path::{Path, PathBuf};

use mesh_definitions::validate::{Severity, ValidationIssue, Validator};
use mesh_definitions::{ClusterModel, ErrorKind, Result};

use crate::eval::{resolve_config, EvalContext};
use crate::mapper::{self, MapperDiagnostic};
use crate::reader::parse_root;

/// Result of loading one config file: the mapped model plus every
/// diagnostic collected along the way, worst severity first.
pub struct LoadResult {
    pub model: ClusterModel,
    pub issues: Vec<ValidationIssue>,
}

fn mapper_diag_to_issue(d: MapperDiagnostic) -> ValidationIssue {
    ValidationIssue::new(d.severity, d.path.clone(), d.path, d.message)
}

/// Loads and validates a cluster description from `path`. `strict`
/// gates the `shell` built-in; `validator` lets the caller register
/// additional predicates run after the fixed battery.
pub fn load_cluster(path: &Path, strict: bool, validator: &Validator) -> Result<LoadResult> {
    let src = std::fs::read_to_string(path)?;
    let cwd = path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let root = parse_root(&src)?;
    let mut ctx = EvalContext::new(cwd).strict(strict);
    let resolved = resolve_config(&root, &mut ctx)?;

    let (model, mapper_diags) = mapper::map_cluster(&resolved)?;

    let mut issues: Vec<ValidationIssue> = mapper_diags.into_iter().map(mapper_diag_to_issue).collect();
    issues.extend(validator.validate(&model));
    issues.sort_by_key(|i| match i.severity {
        Severity::Error => 0,
        Severity::Warning => 1,
        Severity::Info => 2,
    });

    if Validator::has_errors(&issues) {
        let error_count = issues.iter().filter(|i| i.severity == Severity::Error).count();
        return Err(ErrorKind::ValidationError(error_count).into());
    }

    Ok(LoadResult { model, issues })
}

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;
extern crate loggerv;
extern crate libc;

extern crate meshctl;

use std::collections::HashMap;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use meshctl::adapters::{InMemoryStateEngine, MockCoordinator, NullCloudProvider, ShellRemoteExecutor};
use meshctl::history_store::{HistoryStore, StateEngineHistoryStore};
use meshctl::orchestrator::phases::{
    ApplyFirewallsPhase, BuildVpnOverlayPhase, CreateNetworkingPhase, CreateNodesPhase, GenerateSshKeyPhase,
    HealthValidationPhase, InitProvidersPhase, InstallAddonsPhase, InstallKubernetesPhase, PostInstallConfigPhase,
    RegisterDnsPhase,
};
use meshctl::orchestrator::{run_phases, Phase, PhaseCtx};
use meshctl::vpn::{HeadscaleMesh, VpnProvider, WireguardMesh};
use meshctl::{Error, ErrorKind, Result};

use mesh_config::load_cluster;
use mesh_definitions::adapters::{CoordinationApi, RemoteExecutor, StateEngine, UserIdentifier};
use mesh_definitions::model::OverlayChoice;
use mesh_definitions::validate::Validator;

fn print_error_debug(e: &Error) {
    use std::env;
    if env::var("CI").is_ok() {
        warn!("{:?}", e);
    } else {
        for cause in e.iter().skip(1) {
            warn!("caused by: {}", cause);
        }
    }
}

fn main() {
    let app = App::new("meshctl")
        .version(crate_version!())
        .setting(AppSettings::VersionlessSubcommands)
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .setting(AppSettings::ColoredHelp)
        .setting(AppSettings::DeriveDisplayOrder)
        .global_settings(&[AppSettings::ColoredHelp])
        .about("Provision and operate multi-cloud Kubernetes clusters over an encrypted overlay mesh")
        .arg(Arg::with_name("verbose").short("v").multiple(true).help("Increase verbosity"))
        .arg(
            Arg::with_name("debug")
                .short("d")
                .long("debug")
                .help("Adds line numbers to log statements"),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .takes_value(true)
                .default_value("mesh.cluster")
                .help("Path to the cluster config s-expression file"),
        )
        .subcommand(
            SubCommand::with_name("validate")
                .about("Parse, evaluate and validate the cluster config without touching any provider"),
        )
        .subcommand(
            SubCommand::with_name("deploy")
                .about("Run the full orchestrator against the cluster config")
                .arg(
                    Arg::with_name("dry-run")
                        .long("dry-run")
                        .help("Use in-memory/null adapters instead of talking to real infrastructure"),
                ),
        )
        .subcommand(SubCommand::with_name("destroy").about("Reverse the desired-state store for this stack"))
        .subcommand(
            SubCommand::with_name("health")
                .about("Run the health checker against the stack's nodes")
                .arg(Arg::with_name("compact").long("compact").help("One line per node")),
        )
        .subcommand(
            SubCommand::with_name("history")
                .about("Print the operations ledger for this stack")
                .arg(
                    Arg::with_name("category")
                        .possible_values(&["backups", "upgrades", "health", "benchmarks"])
                        .help("Restrict to one ledger category"),
                )
                .arg(Arg::with_name("json").long("json").help("Print as JSON")),
        )
        .subcommand(
            SubCommand::with_name("stacks")
                .setting(AppSettings::SubcommandRequiredElseHelp)
                .about("Thin pass-through to the desired-state engine")
                .subcommand(SubCommand::with_name("list").about("List known stacks"))
                .subcommand(SubCommand::with_name("info").about("Show stack metadata"))
                .subcommand(SubCommand::with_name("output").about("Print a stack output"))
                .subcommand(SubCommand::with_name("cancel").about("Cancel an in-flight deploy"))
                .subcommand(SubCommand::with_name("delete").about("Forget a stack's state")),
        );

    let args = app.get_matches();
    let name = args.subcommand_name().unwrap_or("meshctl");
    if let Err(e) = run(&args) {
        error!("{} error: {}", name, e);
        print_error_debug(&e);
        process::exit(1);
    }
    process::exit(0);
}

fn run(args: &ArgMatches) -> Result<()> {
    loggerv::Logger::new()
        .verbosity(args.occurrences_of("verbose") + 1)
        .module_path(true)
        .line_numbers(args.is_present("debug"))
        .init()
        .unwrap();

    // Ignore SIGPIPE so callers piping our output through `head` don't
    // trip a panic on write.
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let config_path = std::path::PathBuf::from(args.value_of("config").unwrap());
    let validator = Validator::new();
    let loaded = load_cluster(&config_path, false, &validator)?;
    for issue in &loaded.issues {
        debug!("{:?}: {}.{}: {}", issue.severity, issue.path, issue.field, issue.message);
    }
    let model = loaded.model;
    let stack = model.metadata.name.clone();

    if args.subcommand_matches("validate").is_some() {
        info!("'{}' is valid ({} diagnostic(s))", stack, loaded.issues.len());
        return Ok(());
    }

    let mut rt = tokio::runtime::Runtime::new().map_err(|e| ErrorKind::StateEngineError(e.to_string()))?;

    if let Some(a) = args.subcommand_matches("deploy") {
        return rt.block_on(deploy(&stack, model, a.is_present("dry-run")));
    }
    if args.subcommand_matches("destroy").is_some() {
        return rt.block_on(destroy(&stack));
    }
    if let Some(a) = args.subcommand_matches("health") {
        return rt.block_on(health(&stack, model, a.is_present("compact")));
    }
    if let Some(a) = args.subcommand_matches("history") {
        return rt.block_on(history(&stack, a));
    }
    if let Some(a) = args.subcommand_matches("stacks") {
        return rt.block_on(stacks(&stack, a));
    }

    unreachable!("subcommand required by clap but not dispatched")
}

fn build_providers(model: &mesh_definitions::ClusterModel) -> HashMap<String, Arc<dyn mesh_definitions::adapters::CloudProvider>> {
    let mut providers: HashMap<String, Arc<dyn mesh_definitions::adapters::CloudProvider>> = HashMap::new();
    for name in model.providers.enabled_names() {
        providers.insert(name, Arc::new(NullCloudProvider::new()));
    }
    providers
}

fn build_overlay(
    model: &mesh_definitions::ClusterModel,
    executor: Arc<dyn RemoteExecutor>,
) -> Result<Arc<dyn VpnProvider>> {
    match model.network.overlay_choice() {
        OverlayChoice::Wireguard(_cfg) => Ok(Arc::new(WireguardMesh::new(executor, Duration::from_secs(30)))),
        OverlayChoice::Tailscale(cfg) => {
            let coordinator_url = cfg
                .coordinator_url
                .clone()
                .ok_or_else(|| ErrorKind::ConfigEvalError("network.tailscale".into(), "coordinator_url required".into()))?;
            let namespace = cfg.namespace.clone().unwrap_or_else(|| "default".into());
            let coordinator: Arc<dyn CoordinationApi> = Arc::new(MockCoordinator::new(UserIdentifier::Numeric(1)));
            Ok(Arc::new(HeadscaleMesh::new(
                coordinator,
                executor,
                namespace,
                coordinator_url,
                Duration::from_secs(30),
            )))
        }
        OverlayChoice::None => Err(ErrorKind::OverlayError("no overlay enabled (dual or none)".into()).into()),
    }
}

async fn deploy(stack: &str, model: mesh_definitions::ClusterModel, dry_run: bool) -> Result<()> {
    if !dry_run {
        warn!("meshctl only ships dry-run adapters; running against in-memory state");
    }
    let nodes = meshctl::build_inventory(&model)?;
    let state: Arc<dyn StateEngine> = Arc::new(InMemoryStateEngine::new());
    let executor: Arc<dyn RemoteExecutor> = Arc::new(ShellRemoteExecutor);
    let providers = build_providers(&model);
    let overlay = build_overlay(&model, executor.clone())?;
    let ssh = Arc::new(meshctl::ssh_pool::SshPool::new(executor.clone()));

    struct ShellProbe {
        executor: Arc<dyn RemoteExecutor>,
    }
    #[async_trait::async_trait]
    impl meshctl::health::Probe for ShellProbe {
        async fn check(&self, node: &mesh_definitions::Node) -> Result<()> {
            let host = node
                .public_ip
                .ok_or_else(|| ErrorKind::DependencyMissingError(format!("node '{}' has no public IP", node.name)))?;
            self.executor.run(&host.to_string(), "root", "true", Duration::from_secs(5)).await?;
            Ok(())
        }
    }

    let ctx = PhaseCtx::new(stack, model, nodes, state.clone());
    let phases: Vec<Box<dyn Phase>> = vec![
        Box::new(GenerateSshKeyPhase),
        Box::new(InitProvidersPhase { providers: providers.clone() }),
        Box::new(CreateNetworkingPhase { providers: providers.clone() }),
        Box::new(CreateNodesPhase { providers: providers.clone() }),
        Box::new(ApplyFirewallsPhase { providers: providers.clone() }),
        Box::new(RegisterDnsPhase { providers: providers.clone() }),
        Box::new(BuildVpnOverlayPhase { overlay, ssh }),
        Box::new(InstallKubernetesPhase),
        Box::new(PostInstallConfigPhase),
        Box::new(InstallAddonsPhase),
        Box::new(HealthValidationPhase {
            probe: Arc::new(ShellProbe { executor }),
            interval: Duration::from_secs(2),
            deadline: Duration::from_secs(120),
        }),
    ];

    // `run_phases` aborts with an `Err` at the first phase with any node
    // failure, so reaching here means every phase's node set succeeded.
    run_phases(&ctx, &phases).await?;
    info!("deploy of '{}' completed", stack);
    Ok(())
}

async fn destroy(stack: &str) -> Result<()> {
    let state = InMemoryStateEngine::new();
    state.destroy(stack).await?;
    info!("destroyed stack '{}'", stack);
    Ok(())
}

async fn health(stack: &str, model: mesh_definitions::ClusterModel, compact: bool) -> Result<()> {
    let nodes = meshctl::build_inventory(&model)?;
    let executor: Arc<dyn RemoteExecutor> = Arc::new(ShellRemoteExecutor);

    struct ShellProbe {
        executor: Arc<dyn RemoteExecutor>,
    }
    #[async_trait::async_trait]
    impl meshctl::health::Probe for ShellProbe {
        async fn check(&self, node: &mesh_definitions::Node) -> Result<()> {
            let host = node
                .public_ip
                .ok_or_else(|| ErrorKind::DependencyMissingError(format!("node '{}' has no public IP", node.name)))?;
            self.executor.run(&host.to_string(), "root", "true", Duration::from_secs(5)).await?;
            Ok(())
        }
    }

    let report = meshctl::health::check_once(&ShellProbe { executor }, &nodes).await;
    if compact {
        println!("{}/{} healthy", report.healthy_nodes, report.total_nodes);
    } else {
        for (name, status) in &report.per_node_status {
            println!("{}: {:?}", name, status);
        }
    }
    info!("health check for '{}' complete", stack);
    // Binary exit code: critical only when every node is unreachable.
    if report.total_nodes > 0 && report.healthy_nodes == 0 {
        process::exit(1);
    }
    Ok(())
}

async fn history(stack: &str, args: &ArgMatches) -> Result<()> {
    let state: Arc<dyn StateEngine> = Arc::new(InMemoryStateEngine::new());
    let store = StateEngineHistoryStore::new(state, 50);
    let ledger = store.load(stack).await?;

    let entries: Vec<&mesh_definitions::history::HistoryEntry> = match args.value_of("category") {
        Some("backups") => ledger.backup.iter().collect(),
        Some("upgrades") => ledger.upgrade.iter().collect(),
        Some("health") => ledger.health.iter().collect(),
        Some("benchmarks") => ledger.benchmark.iter().collect(),
        _ => ledger
            .backup
            .iter()
            .chain(ledger.upgrade.iter())
            .chain(ledger.health.iter())
            .chain(ledger.benchmark.iter())
            .collect(),
    };

    if args.is_present("json") {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in entries {
            println!("[{}] {} {:?} ({}ms)", entry.timestamp, entry.operation, entry.status, entry.duration_ms);
        }
    }
    Ok(())
}

async fn stacks(stack: &str, args: &ArgMatches) -> Result<()> {
    let state = InMemoryStateEngine::new();
    if args.subcommand_matches("list").is_some() {
        println!("{}", stack);
        return Ok(());
    }
    if args.subcommand_matches("info").is_some() {
        println!("stack: {}", stack);
        return Ok(());
    }
    if args.subcommand_matches("output").is_some() {
        match state.get_output(stack, "kubeconfig").await? {
            Some(output) => println!("{:?}", output),
            None => println!("(no output recorded for '{}')", stack),
        }
        return Ok(());
    }
    if args.subcommand_matches("cancel").is_some() {
        warn!("cancel has no effect against the in-memory adapter");
        return Ok(());
    }
    if args.subcommand_matches("delete").is_some() {
        state.destroy(stack).await?;
        return Ok(());
    }
    unreachable!("stacks subcommand required by clap but not dispatched")
}

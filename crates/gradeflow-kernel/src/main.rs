use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use gradeflow_kernel::catalog;
use gradeflow_kernel::editor::CanvasEditor;
use gradeflow_kernel::graph::GraphStore;
use gradeflow_kernel::scheduler::{Scheduler, TokioScheduler, VirtualScheduler};
use gradeflow_kernel::templates;
use gradeflow_kernel::test_harness::{run_fuzz, FuzzConfig};
use gradeflow_kernel::{EditorConfig, NodeKind};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let template_arg = Arg::new("template")
        .long("template")
        .required(true)
        .help("Template id (see `gradeflow templates`), or `blank`");

    Command::new("gradeflow")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Grading workflow canvas kernel")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("catalog")
                .about("List the step catalog")
                .arg(
                    Arg::new("after")
                        .long("after")
                        .value_parser(value_parser!(NodeKind))
                        .help("Only show steps recommended after this kind"),
                ),
        )
        .subcommand(Command::new("templates").about("List workflow templates, newest first"))
        .subcommand(
            Command::new("inspect")
                .about("Instantiate a template and describe the resulting graph")
                .arg(template_arg.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("run")
                .about("Instantiate a template and simulate a run")
                .arg(template_arg)
                .arg(
                    Arg::new("configure-all")
                        .long("configure-all")
                        .action(ArgAction::SetTrue)
                        .help("Confirm every step's panel before running"),
                )
                .arg(
                    Arg::new("realtime")
                        .long("realtime")
                        .action(ArgAction::SetTrue)
                        .help("Use wall-clock timers instead of a virtual clock"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .help("Editor configuration file (TOML)"),
                ),
        )
        .subcommand(
            Command::new("fuzz")
                .about("Run a randomized editor session and check invariants")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to perform"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("keep-going")
                        .long("keep-going")
                        .action(ArgAction::SetTrue)
                        .help("Collect every violation instead of stopping at the first"),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("catalog", args)) => print_catalog(args),
        Some(("templates", _)) => {
            for t in templates::list() {
                let popular = if t.popular { " (popular)" } else { "" };
                println!("{:<18} {}  {} steps{}", t.id, t.date, t.node_count(), popular);
                println!("    {}: {}", t.name, t.description);
            }
            Ok(())
        }
        Some(("inspect", args)) => inspect(args),
        Some(("run", args)) => run(args).await,
        Some(("fuzz", args)) => {
            let config = FuzzConfig {
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
                total_operations: args.get_one::<u64>("operations").copied().unwrap_or(10_000),
                stop_on_first_violation: !args.get_flag("keep-going"),
                ..FuzzConfig::default()
            };
            let report = run_fuzz(config);
            println!("{}", report.generate_text());
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        _ => Ok(()),
    }
}

fn print_catalog(args: &ArgMatches) -> anyhow::Result<()> {
    let entries: Vec<_> = match args.get_one::<NodeKind>("after") {
        Some(kind) => catalog::recommended_after(Some(*kind)),
        None => catalog::entries().iter().collect(),
    };
    for entry in entries {
        println!("{:<13} {:<18} {}", entry.kind, entry.name, entry.description);
        println!("{:<13} hint: {}", "", entry.usage_hint);
    }
    Ok(())
}

fn template_id(args: &ArgMatches) -> anyhow::Result<&str> {
    args.get_one::<String>("template")
        .map(String::as_str)
        .context("--template is required")
}

#[derive(Serialize)]
struct Inspection<'a> {
    template: &'a str,
    graph: gradeflow_kernel::GraphSnapshot,
    validation: gradeflow_kernel::WorkflowValidation,
    topology: gradeflow_kernel::Topology,
}

fn inspect(args: &ArgMatches) -> anyhow::Result<()> {
    let id = template_id(args)?;
    let store = GraphStore::new();
    templates::instantiate(id, &store)?;
    let inspection = Inspection {
        template: id,
        graph: store.snapshot(),
        validation: gradeflow_kernel::WorkflowValidation::of(&store.nodes()),
        topology: store.topology(),
    };

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    println!("Template: {}", inspection.template);
    for (index, node) in inspection.graph.nodes.iter().enumerate() {
        let mark = if node.configured { "ok" } else { "needs configuration" };
        println!("  {}. {:<22} [{}] {}", index + 1, node.label, node.kind, mark);
    }
    println!("Edges: {}", inspection.graph.edges.len());
    println!("Acyclic: {}", inspection.topology.is_acyclic);
    println!(
        "Ready to run: {} ({} unconfigured)",
        inspection.validation.ready,
        inspection.validation.unconfigured.len()
    );
    Ok(())
}

async fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let config = match args.get_one::<String>("config") {
        Some(path) => EditorConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => EditorConfig::default(),
    };
    let id = template_id(args)?;
    let realtime = args.get_flag("realtime");

    let store = Arc::new(GraphStore::new());
    templates::instantiate(id, &store)?;

    let clock = Arc::new(VirtualScheduler::new());
    let scheduler: Arc<dyn Scheduler> = if realtime {
        Arc::new(TokioScheduler::current())
    } else {
        clock.clone()
    };
    let mut editor = CanvasEditor::new(Arc::clone(&store), scheduler, config)?;

    if args.get_flag("configure-all") {
        for node in store.nodes().iter().filter(|n| !n.configured) {
            editor.open_panel(node.id)?;
            editor.confirm_panel()?;
        }
    }

    let plan = match editor.run() {
        Ok(plan) => plan,
        Err(err) => {
            for node in err.unconfigured_ids() {
                if let Some(node) = store.node(node) {
                    eprintln!("  needs configuration: {}", node.label);
                }
            }
            bail!(err);
        }
    };

    if realtime {
        tokio::time::sleep(plan.completes_after + Duration::from_millis(50)).await;
    } else {
        clock.run_until_idle();
    }
    for entry in editor.run_log().entries() {
        println!("{entry}");
    }
    if editor.is_running() {
        bail!("run did not complete");
    }
    editor.close();
    Ok(())
}

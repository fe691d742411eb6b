//! planviz CLI: translate engine plan documents into operator graphs.

use clap::{Parser, Subcommand, ValueEnum};
use planviz_core::config::TranslateConfig;
use planviz_core::manifest::RunStatus;
use planviz_core::node::OperatorNode;
use planviz_planner::{parse_json_document, parse_yaml_document, DocumentConfig, PlanDocument};
use planviz_stage::pipeline::{build_logical_view, build_package, build_physical_view, BuildOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "planviz")]
#[command(about = "Translate query execution plans into a staged operator graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum View {
    /// One node per logical operator, stamped with its stage
    Logical,
    /// Nodes rebuilt from the stage plans, stitched along the stage graph
    Physical,
}

#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Job name recorded in the plan package (overrides config)
    #[arg(long)]
    job_name: Option<String>,

    /// User name recorded in the plan package (overrides config)
    #[arg(long)]
    user_name: Option<String>,

    /// Disable the source-location fallback during stage assignment
    #[arg(long)]
    no_location_fallback: bool,

    /// Leave nodes without a physical counterpart unassigned
    #[arg(long)]
    no_resolve: bool,

    /// Show MapReduce combine plans as tasks in the physical view
    #[arg(long)]
    include_combine_plan: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a plan document and print the resulting graph as JSON
    Translate {
        /// Path to the plan document (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        plan: PathBuf,

        #[arg(long, value_enum, default_value = "logical")]
        view: View,

        /// Emit a plan package (plans, script, run metadata) instead of the bare graph
        #[arg(long)]
        package: bool,

        /// Write output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Validate a plan document (syntax and structure)
    Validate {
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Show the stage layout of a translated plan
    Explain {
        #[arg(short, long)]
        plan: PathBuf,

        #[arg(long, value_enum, default_value = "logical")]
        view: View,

        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Translate {
            plan,
            view,
            package,
            output,
            overrides,
        } => {
            if let Err(e) = translate(&plan, view, package, output.as_deref(), &overrides) {
                eprintln!("could not generate plan: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { plan } => {
            if let Err(e) = validate(&plan) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Plan document is valid");
        }
        Commands::Explain {
            plan,
            view,
            overrides,
        } => {
            if let Err(e) = explain(&plan, view, &overrides) {
                eprintln!("could not generate plan: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// `PLANVIZ_LOG` first, then `RUST_LOG`, else warnings only. Logs go to
/// stderr so stdout stays parseable.
fn init_logging() {
    let filter = EnvFilter::try_from_env("PLANVIZ_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_document(path: &Path) -> Result<PlanDocument, Box<dyn std::error::Error>> {
    let src = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    debug!(path = %path.display(), json = is_json, "loading plan document");
    let doc = if is_json {
        parse_json_document(&src)?
    } else {
        parse_yaml_document(&src)?
    };
    Ok(doc)
}

/// Environment, then the document's `config:` block, then CLI flags.
fn resolve_config(doc: &PlanDocument, overrides: &Overrides) -> planviz_core::Result<TranslateConfig> {
    let mut config = TranslateConfig::from_env();
    apply_document_config(&mut config, &doc.config());
    apply_overrides(&mut config, overrides);
    config.validate()?;
    Ok(config)
}

fn apply_document_config(cfg: &mut TranslateConfig, doc: &DocumentConfig) {
    doc.apply_to(cfg);
}

fn apply_overrides(cfg: &mut TranslateConfig, o: &Overrides) {
    if let Some(job) = &o.job_name {
        cfg.job_name = job.clone();
    }
    if let Some(user) = &o.user_name {
        cfg.user_name = Some(user.clone());
    }
    if o.no_location_fallback {
        cfg.location_fallback = false;
    }
    if o.no_resolve {
        cfg.resolve_unknown = false;
    }
    if o.include_combine_plan {
        cfg.include_combine_plan = true;
    }
}

fn build(doc: &PlanDocument, view: View, cfg: &TranslateConfig) -> planviz_core::Result<BuildOutcome> {
    match view {
        View::Logical => build_logical_view(&doc.logical, &doc.execution, cfg),
        View::Physical => build_physical_view(&doc.execution, cfg),
    }
}

fn translate(
    path: &Path,
    view: View,
    package: bool,
    output: Option<&Path>,
    overrides: &Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(path)?;
    let config = resolve_config(&doc, overrides)?;

    let json = if package {
        let pkg = build_package(&doc, &config)?.finish(RunStatus::Finished);
        serde_json::to_string_pretty(&pkg)?
    } else {
        serde_json::to_string_pretty(&build(&doc, view, &config)?.plan)?
    };

    match output {
        Some(out) => fs::write(out, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(path)?;
    let config = resolve_config(&doc, &Overrides::default())?;
    build(&doc, View::Logical, &config)?;
    build(&doc, View::Physical, &config)?;
    Ok(())
}

fn explain(path: &Path, view: View, overrides: &Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(path)?;
    let config = resolve_config(&doc, overrides)?;
    let outcome = build(&doc, view, &config)?;
    print!("{}", render_explain(&doc, &outcome, view));
    Ok(())
}

fn render_explain(doc: &PlanDocument, outcome: &BuildOutcome, view: View) -> String {
    use std::fmt::Write as _;

    let plan = &outcome.plan;
    let mut s = String::new();
    let _ = writeln!(s, "Plan Stage Layout");
    let _ = writeln!(s, "=================");
    let _ = writeln!(s);
    let _ = writeln!(s, "Execution: {}", doc.execution.mode());
    let _ = writeln!(s, "View: {:?}", view);
    let _ = writeln!(s, "Nodes: {}", plan.len());
    if let Some(a) = &outcome.assignment {
        let _ = writeln!(
            s,
            "Assignment: {} by storage, {} by identity, {} by location, {} misses",
            a.by_storage, a.by_identity, a.by_location, a.misses
        );
    }
    if let Some(r) = &outcome.resolution {
        let _ = writeln!(s, "Resolved from neighbours: {} ({} passes)", r.resolved, r.passes);
    }
    if let Some(st) = &outcome.stitching {
        let _ = writeln!(
            s,
            "Stitched edges: {} (synthetic stores: {})",
            st.edges_added, st.synthetic_stores
        );
    }

    for stage in plan.stage_ids() {
        let _ = writeln!(s);
        let _ = writeln!(s, "Stage {}:", stage);
        for node in plan.nodes_in_stage(&stage) {
            let _ = writeln!(s, "  {}", describe(node));
        }
    }

    let unassigned: Vec<_> = plan.unassigned().collect();
    if !unassigned.is_empty() {
        let _ = writeln!(s);
        let _ = writeln!(s, "Unassigned:");
        for node in unassigned {
            let _ = writeln!(s, "  {}", describe(node));
        }
    }
    s
}

fn describe(node: &OperatorNode) -> String {
    let phase = node
        .stage
        .as_ref()
        .map(|a| a.phase.to_string())
        .unwrap_or_else(|| "-".to_string());
    let succ: Vec<&str> = node.successors.iter().map(|u| u.as_str()).collect();
    format!(
        "{}. {} ({}) [{}] -> [{}]",
        node.uid,
        node.operator,
        node.alias.as_deref().unwrap_or("-"),
        phase,
        succ.join(", ")
    )
}

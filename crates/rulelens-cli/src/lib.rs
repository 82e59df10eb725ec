//! Command-line surface over `rulelens-core`.
//!
//! Rule and data arguments accept either inline JSON or a path to a file.
//! With `--state-dir`, the resolver commands (`check`, `eval`, `translate`,
//! `ids`, `tree`) share one saved session, so a rule given once can be tested
//! repeatedly; `generate` keeps its own.

mod process;
mod store;

pub use process::ProcessGenerator;
pub use store::{SnapshotStore, StoreError};

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use rulelens_core::{Engine, EngineConfig, Expansion, Node, NodeId, Session, Snapshot};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "rulelens", version, about = "Inspect, test and generate JSON rule expressions")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory for saved sessions. Nothing is saved without it.
    #[arg(long, global = true, env = "RULELENS_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Engine settings file (JSON with `id_prefix` and `max_depth`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a rule and report advisories.
    Check(RuleArgs),
    /// Evaluate a rule against test data.
    Eval(EvalArgs),
    /// Print the English reading of a rule.
    Translate(RuleArgs),
    /// Print node identifiers, one per line.
    Ids(RuleArgs),
    /// Print the section tree of a rule.
    Tree(TreeArgs),
    /// Ask an external generator for a rule matching a description.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct RuleArgs {
    /// Rule JSON or a file holding it. Defaults to the saved rule.
    pub rule: Option<String>,
}

#[derive(Args, Debug)]
pub struct EvalArgs {
    #[command(flatten)]
    pub rule: RuleArgs,

    /// Data context JSON or a file holding it. Defaults to the saved test data, then `{}`.
    #[arg(long, short)]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    pub rule: RuleArgs,

    /// Identifier prefix for this view.
    #[arg(long)]
    pub prefix: Option<String>,

    /// Print the section tree as JSON.
    #[arg(long)]
    pub json: bool,

    /// Show only these sections expanded (repeatable); everything is expanded otherwise.
    #[arg(long = "expand", value_name = "ID")]
    pub expand: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Plain-language description of the rule.
    #[arg(required = true, num_args = 1..)]
    pub request: Vec<String>,

    /// Generator command; receives the prompt on stdin and answers on stdout.
    #[arg(long, env = "RULELENS_GENERATOR_CMD")]
    pub command: String,

    /// Seconds to wait for the generator.
    #[arg(long, env = "RULELENS_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

pub async fn run_from_env() -> anyhow::Result<()> {
    run(Cli::parse()).await
}

pub async fn run_from_args<I, T>(args: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    run(Cli::try_parse_from(args)?).await
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    init_tracing(&cli.global);
    let engine = Engine::new(load_engine_config(cli.global.config.as_deref())?);
    let store = cli.global.state_dir.clone().map(SnapshotStore::new);
    let store = store.as_ref();

    match cli.cmd {
        Command::Check(args) => cmd_check(&engine, store, args),
        Command::Eval(args) => cmd_eval(&engine, store, args),
        Command::Translate(args) => {
            let session = open_resolver(&engine, store, args.rule)?;
            println!("{}", engine.translate(current_tree(&session)?));
            Ok(())
        }
        Command::Ids(args) => {
            let session = open_resolver(&engine, store, args.rule)?;
            for id in engine.ids(current_tree(&session)?).iter() {
                println!("{id}");
            }
            Ok(())
        }
        Command::Tree(args) => cmd_tree(&engine, store, args),
        Command::Generate(args) => cmd_generate(&engine, store, args).await,
    }
}

pub fn init_tracing(args: &GlobalArgs) {
    let level = if args.quiet {
        Level::ERROR
    } else if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    // Repeated runs in one process keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_engine_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {} as engine config", path.display()))
}

/// Contents of `input` when it names an existing file, `input` itself otherwise.
pub fn read_input(input: &str) -> anyhow::Result<String> {
    let as_path = Path::new(input);
    if as_path.is_file() {
        return fs::read_to_string(as_path)
            .with_context(|| format!("failed to read {}", as_path.display()));
    }
    Ok(input.to_string())
}

fn load_snapshot(store: Option<&SnapshotStore>, name: &str) -> anyhow::Result<Snapshot> {
    match store {
        Some(store) => Ok(store.load(name)?),
        None => Ok(Snapshot::default()),
    }
}

fn save_snapshot(store: Option<&SnapshotStore>, name: &str, session: &Session) -> anyhow::Result<()> {
    if let Some(store) = store {
        store.save(name, &session.snapshot())?;
    }
    Ok(())
}

/// Resolver session with `rule` applied, or the saved rule when none is given.
fn open_resolver(
    engine: &Engine,
    store: Option<&SnapshotStore>,
    rule: Option<String>,
) -> anyhow::Result<Session> {
    let snapshot = load_snapshot(store, SnapshotStore::RESOLVER)?;
    let mut session = Session::from_snapshot(engine.clone(), snapshot);
    match rule {
        Some(rule) => {
            let outcome = session.set_rule_text(read_input(&rule)?).map(|_| ());
            save_snapshot(store, SnapshotStore::RESOLVER, &session)?;
            outcome?;
        }
        None if session.rule_text().trim().is_empty() => {
            bail!("no rule given and no saved rule to resume")
        }
        None => {}
    }
    Ok(session)
}

fn current_tree(session: &Session) -> anyhow::Result<&Node> {
    match session.tree() {
        Some(tree) => Ok(tree),
        None => bail!(
            "saved rule does not parse: {}",
            session.error().unwrap_or("unknown error")
        ),
    }
}

fn report_advisories(engine: &Engine, tree: &Node) -> usize {
    let advisories = engine.advise(tree);
    for advisory in &advisories {
        eprintln!("warning: {advisory}");
    }
    advisories.len()
}

fn cmd_check(engine: &Engine, store: Option<&SnapshotStore>, args: RuleArgs) -> anyhow::Result<()> {
    let session = open_resolver(engine, store, args.rule)?;
    let tree = current_tree(&session)?;
    let warnings = report_advisories(engine, tree);
    println!(
        "ok: {} nodes, {} identified, {warnings} warnings",
        tree.size(),
        engine.ids(tree).len()
    );
    Ok(())
}

fn cmd_eval(engine: &Engine, store: Option<&SnapshotStore>, args: EvalArgs) -> anyhow::Result<()> {
    let mut session = open_resolver(engine, store, args.rule.rule)?;
    let data = match args.data {
        Some(data) => read_input(&data)?,
        None if !session.test_data().trim().is_empty() => session.test_data().to_string(),
        None => "{}".to_string(),
    };
    let outcome = session.evaluate_with(data);
    save_snapshot(store, SnapshotStore::RESOLVER, &session)?;
    let value = outcome?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_tree(engine: &Engine, store: Option<&SnapshotStore>, args: TreeArgs) -> anyhow::Result<()> {
    let session = open_resolver(engine, store, args.rule.rule)?;
    let tree = current_tree(&session)?;
    let prefix = args
        .prefix
        .unwrap_or_else(|| engine.config().id_prefix.clone());
    let display = engine.visualize_under(tree, &prefix);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&display)?);
        return Ok(());
    }

    let expansion = if args.expand.is_empty() {
        None
    } else {
        let mut state = Expansion::default();
        for id in &args.expand {
            state.toggle(&NodeId::from(id.as_str()));
        }
        let requested = state.len();
        state.retain_valid(&rulelens_core::assign(tree, &prefix));
        if state.len() < requested {
            tracing::warn!("ignoring {} unknown section ids", requested - state.len());
        }
        Some(state)
    };
    print!("{}", display.outline(expansion.as_ref()));
    Ok(())
}

async fn cmd_generate(
    engine: &Engine,
    store: Option<&SnapshotStore>,
    args: GenerateArgs,
) -> anyhow::Result<()> {
    let generator =
        ProcessGenerator::from_command_line(&args.command, Duration::from_secs(args.timeout_secs))?;
    let request = args.request.join(" ");

    let snapshot = load_snapshot(store, SnapshotStore::GENERATOR)?;
    let mut session = Session::from_snapshot(engine.clone(), snapshot);
    let result = engine.generate(&generator, &request).await;
    let outcome = session.apply_generation(result).map(|_| ());
    save_snapshot(store, SnapshotStore::GENERATOR, &session)?;
    outcome?;

    let tree = current_tree(&session)?;
    report_advisories(engine, tree);
    println!("{}", session.rule_text());
    eprintln!("{}", engine.translate(tree));
    Ok(())
}

//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use listscout_agents::{
    OpenRouterAgent, ScriptedIdeaWriter, ScriptedPlanner, ScriptedSearcher,
};
use listscout_corpus::{LoadOptions, corpus_stats, load_corpus};
use listscout_engine::{
    Collaborators, ResearchOrchestrator, RunOutcome, RunPhase, RunProgress, RunReport,
};
use listscout_shared::{AppConfig, RunConfig, init_config, load_config, validate_api_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ListScout — grow a curated catalog with bounded, deduplicated research runs.
#[derive(Parser)]
#[command(
    name = "listscout",
    version,
    about = "Discover new entries for a curated, category-organized resource catalog.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a research pass over a corpus file or URL.
    Run {
        /// Path or URL of the corpus (contents.json).
        contents: String,

        /// Output directory for checkpoints and results.
        #[arg(short, long)]
        output: Option<String>,

        /// Unique-item yield target; keeps cycling categories until
        /// reached. Omit for a single pass over the planned categories.
        #[arg(short, long)]
        target: Option<usize>,

        /// Per-category time budget in seconds.
        #[arg(long)]
        time_limit: Option<u64>,

        /// Global timeout for the whole run in seconds.
        #[arg(long)]
        global_timeout: Option<u64>,

        /// Accepted-item count between intermediate checkpoints.
        #[arg(long)]
        checkpoint_every: Option<usize>,

        /// Randomize category order.
        #[arg(long)]
        randomize: bool,

        /// Seed for reproducible randomization.
        #[arg(long)]
        random_seed: Option<u64>,

        /// Model to use for the LLM collaborators.
        #[arg(long)]
        model: Option<String>,

        /// Use scripted collaborators instead of the LLM (no network,
        /// useful for dry runs).
        #[arg(long)]
        offline: bool,
    },

    /// Analyze a corpus: category structure and item counts.
    Stats {
        /// Path or URL of the corpus (contents.json).
        contents: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "listscout=info",
        1 => "listscout=debug",
        _ => "listscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            contents,
            output,
            target,
            time_limit,
            global_timeout,
            checkpoint_every,
            randomize,
            random_seed,
            model,
            offline,
        } => {
            cmd_run(RunFlags {
                contents,
                output,
                target,
                time_limit,
                global_timeout,
                checkpoint_every,
                randomize,
                random_seed,
                model,
                offline,
            })
            .await
        }
        Command::Stats { contents } => cmd_stats(&contents).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Flags for the `run` subcommand.
struct RunFlags {
    contents: String,
    output: Option<String>,
    target: Option<usize>,
    time_limit: Option<u64>,
    global_timeout: Option<u64>,
    checkpoint_every: Option<usize>,
    randomize: bool,
    random_seed: Option<u64>,
    model: Option<String>,
    offline: bool,
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(flags: RunFlags) -> Result<()> {
    let app_config = load_config()?;
    let run_config = merge_run_config(&app_config, &flags);

    info!(
        contents = %flags.contents,
        target = ?run_config.target_yield,
        global_timeout_secs = run_config.global_timeout_secs,
        offline = flags.offline,
        "starting research run"
    );

    let taxonomy = load_corpus(&flags.contents, &LoadOptions::default()).await?;

    let collaborators = if flags.offline {
        Collaborators {
            planner: Arc::new(ScriptedPlanner),
            searcher: Arc::new(ScriptedSearcher::default()),
            idea_writer: Some(Arc::new(ScriptedIdeaWriter)),
        }
    } else {
        validate_api_key(&app_config)?;
        let api_key = std::env::var(&app_config.openrouter.api_key_env)
            .map_err(|_| eyre!("API key env var not readable"))?;
        let model = flags
            .model
            .clone()
            .unwrap_or_else(|| app_config.openrouter.default_model.clone());
        let agent = Arc::new(OpenRouterAgent::new(api_key, model)?);
        Collaborators {
            planner: agent.clone(),
            searcher: agent.clone(),
            idea_writer: Some(agent),
        }
    };

    let progress = CliProgress::new();
    let orchestrator = ResearchOrchestrator::new(run_config, collaborators);
    let report = orchestrator.run(&taxonomy, &progress).await?;

    print_report(&report);
    Ok(())
}

/// Merge config-file values with CLI flags (flags win).
fn merge_run_config(app_config: &AppConfig, flags: &RunFlags) -> RunConfig {
    let mut run_config = RunConfig::from(app_config);

    let output_dir = flags
        .output
        .as_deref()
        .unwrap_or(&app_config.defaults.output_dir);
    run_config.output_root = expand_home(output_dir);
    run_config.target_yield = flags.target;
    if let Some(secs) = flags.time_limit {
        run_config.category_timeout_secs = secs;
    }
    if let Some(secs) = flags.global_timeout {
        run_config.global_timeout_secs = secs;
    }
    if let Some(every) = flags.checkpoint_every {
        run_config.checkpoint_every = every;
    }
    if flags.randomize {
        run_config.randomize = true;
    }
    run_config.random_seed = flags.random_seed;

    run_config
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn print_report(report: &RunReport) {
    let outcome = match report.outcome {
        RunOutcome::TargetReached => "target reached",
        RunOutcome::CategoriesExhausted => "categories exhausted",
        RunOutcome::TimedOut => "timed out",
    };

    println!();
    println!("Run {} — {outcome}", report.run_id);
    println!(
        "  {} resources, {} ideas in {:.1}s ({} categories visited, {} skipped, {} extra cycles)",
        report.resources.len(),
        report.ideas.len(),
        report.elapsed.as_secs_f64(),
        report.categories_visited,
        report.categories_skipped,
        report.cycles,
    );

    if !report.stats.resources_by_category.is_empty() {
        println!("  By category:");
        for (category, count) in &report.stats.resources_by_category {
            let growth = report
                .stats
                .growth_pct_by_category
                .get(category)
                .copied()
                .unwrap_or(0.0);
            println!("    {category}: {count} new (+{growth:.0}% vs corpus)");
        }
    }

    match &report.final_artifact {
        Some(path) => println!("  Results: {}", path.display()),
        None => println!("  WARNING: final artifact could not be written"),
    }
}

// ---------------------------------------------------------------------------
// stats
// ---------------------------------------------------------------------------

async fn cmd_stats(contents: &str) -> Result<()> {
    let taxonomy = load_corpus(contents, &LoadOptions::default()).await?;
    let stats = corpus_stats(&taxonomy);

    println!(
        "{} categories ({} top-level), {} items",
        stats.category_count, stats.top_level_count, stats.total_items
    );

    let mut counts: Vec<(&String, &usize)> = stats.counts_by_category.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (category, count) in counts {
        println!("  {} ({category}): {count}", taxonomy.title_of(category));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let toml_str =
        toml::to_string_pretty(&config).map_err(|e| eyre!("config serialization failed: {e}"))?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Progress bar
// ---------------------------------------------------------------------------

/// Spinner-based progress reporting for interactive runs.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .expect("static progress template"),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar }
    }
}

impl RunProgress for CliProgress {
    fn phase(&self, phase: RunPhase) {
        self.bar.set_message(phase.as_str().to_string());
    }

    fn category_started(&self, category: &str, visited: usize) {
        self.bar
            .set_message(format!("[{visited}] researching {category}"));
    }

    fn round_finished(&self, category: &str, accepted_in_round: usize, total_accepted: usize) {
        self.bar.set_message(format!(
            "{category}: +{accepted_in_round} (total {total_accepted})"
        ));
    }

    fn done(&self, _report: &RunReport) {
        self.bar.finish_and_clear();
    }
}

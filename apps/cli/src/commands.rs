//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use docsync_core::pipeline::{ProgressReporter, RunReport, SyncConfig};
use docsync_core::report;
use docsync_shared::{
    AppConfig, DocSyncError, FailurePolicy, RunStats, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docsync — keep documentation snapshots and images in sync.
#[derive(Parser)]
#[command(
    name = "docsync",
    version,
    about = "Refresh code snapshots and normalize image references in MDX/markdown docs.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./docsync.toml).
    #[arg(long, global = true, env = "DOCSYNC_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Rewrite stale snapshots and image references in place.
    Sync(SyncArgs),

    /// Report drift without writing; exits non-zero if anything would change.
    Check(SyncArgs),

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for values from the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct SyncArgs {
    /// Content root directory.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Glob of documents to process, relative to the content root.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Glob of documents to skip (repeatable).
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Directory snapshot `file=` references resolve against.
    #[arg(long)]
    pub snippets: Option<PathBuf>,

    /// Directory absolute image references resolve against.
    #[arg(long)]
    pub public_dir: Option<PathBuf>,

    /// Skip the code snapshot transform.
    #[arg(long)]
    pub no_snapshots: bool,

    /// Skip the image reference transform.
    #[arg(long)]
    pub no_images: bool,

    /// Record failing documents and continue with the rest.
    #[arg(long)]
    pub keep_going: bool,
}

impl SyncArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(root) = self.root {
            config.content.root = root;
        }
        if let Some(pattern) = self.pattern {
            config.content.pattern = pattern;
        }
        config.content.exclude.extend(self.exclude);
        if let Some(snippets) = self.snippets {
            config.snapshots.base_path = snippets;
        }
        if let Some(public_dir) = self.public_dir {
            config.images.public_dir = public_dir;
        }
        if self.no_snapshots {
            config.snapshots.enabled = false;
        }
        if self.no_images {
            config.images.enabled = false;
        }
        if self.keep_going {
            config.run.on_error = FailurePolicy::Continue;
        }
    }
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
        0 => "docsync=info",
        1 => "docsync=debug",
        _ => "docsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let spinner = matches!(cli.log_format, LogFormat::Text);
    let config_path = cli.config;
    match cli.command {
        Command::Sync(args) => cmd_sync(config_path.as_deref(), args, true, spinner).await,
        Command::Check(args) => cmd_sync(config_path.as_deref(), args, false, spinner).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Attach the failing stage to a pipeline error.
fn stage_error(error: DocSyncError) -> Report {
    let stage = error.stage();
    Report::new(error).wrap_err(format!("{stage} failed"))
}

async fn cmd_sync(
    config_path: Option<&Path>,
    args: SyncArgs,
    write: bool,
    spinner: bool,
) -> Result<()> {
    let mut app = resolve_config(config_path)?;
    args.apply(&mut app);

    let mut config = SyncConfig::from(&app);
    config.write = write;

    info!(
        root = %config.content_root.display(),
        pattern = %config.pattern,
        on_error = %config.on_error,
        write,
        "syncing documentation"
    );

    let reporter = CliProgress::new(spinner);
    let result = docsync_core::run(&config, &reporter).await;
    reporter.finish();
    let report = result.map_err(stage_error)?;

    print!("{}", report::render(&report, write));
    for failure in &report.failures {
        eprintln!(
            "  ✗ {} [{}]: {}",
            failure.path.display(),
            failure.error.stage(),
            failure.error
        );
    }

    exit_status(&report, write)
}

/// Failed documents always fail the command; pending updates fail it in
/// check mode.
fn exit_status(report: &RunReport, write: bool) -> Result<()> {
    if !report.failures.is_empty() {
        return Err(eyre!("{} document(s) failed", report.failures.len()));
    }

    if !write && report.stats.has_updates() {
        return Err(eyre!(
            "{} document(s) out of date; run `docsync sync` to update them",
            report.changed
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(enabled: bool) -> Self {
        if !enabled {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn document_started(&self, path: &Path, index: usize) {
        self.spinner
            .set_message(format!("[{}] {}", index + 1, path.display()));
    }

    fn document_finished(
        &self,
        path: &Path,
        outcome: std::result::Result<&RunStats, &DocSyncError>,
    ) {
        if let Err(error) = outcome {
            self.spinner
                .println(format!("✗ {} ({})", path.display(), error.stage()));
        }
    }

    fn done(&self, _report: &RunReport) {
        self.spinner.finish_and_clear();
    }
}

fn cmd_config_init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let path = init_config(&cwd)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

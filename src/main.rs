use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pkgmon::{
    audit::AuditPipeline,
    cache::RatingCache,
    config::Config,
    logging,
    model::{Manifest, Rating},
    output::{print_overview, OutputFormat},
    overview::build_overview,
    schedule::AuditSchedule,
    scheduler::BatchScheduler,
    source::{self, PackageSource},
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
    pub const AUDIT_ERROR: u8 = 2;
    pub const AUDIT_WARN: u8 = 4;
}

#[derive(Parser)]
#[command(name = "pkgmon")]
#[command(
    author,
    version,
    about = "Recurring vulnerability audits for the packages hosted by a registry"
)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a single package.json and print its rating
    Audit {
        /// Path to the manifest
        manifest: PathBuf,
    },

    /// Audit all packages on the configured schedule
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Recurrence expression (overrides the config file)
        #[arg(short, long)]
        schedule: Option<String>,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// List packages in scope without auditing them
    List {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show the previous and upcoming audit times
    Schedule {
        /// Recurrence expression (defaults to the configured one)
        expression: Option<String>,

        /// Number of upcoming times to show
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

async fn run() -> Result<u8> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::config_path);

    if let Commands::Config { init, path } = cli.command {
        handle_config(&config_path, init, path)?;
        return Ok(exit_codes::SUCCESS);
    }

    let config = Config::load_from(&config_path)?;
    logging::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Audit { manifest } => run_audit(&config, manifest).await,
        Commands::Run {
            once,
            schedule,
            format,
        } => {
            let schedule = match schedule {
                Some(expr) => AuditSchedule::parse(&expr)?,
                None => config.schedule()?,
            };
            let format = OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))?;
            run_scheduler(&config, schedule, format, once).await
        }
        Commands::List { format } => {
            let format = OutputFormat::from_str(&format).map_err(|e| anyhow::anyhow!(e))?;
            let source: Arc<dyn PackageSource> = Arc::from(source::from_config(&config.source));
            print_packages(&config, source.as_ref(), &RatingCache::new(), &config.schedule()?, format)
                .await?;
            Ok(exit_codes::SUCCESS)
        }
        Commands::Schedule { expression, count } => {
            let schedule = match expression {
                Some(expr) => AuditSchedule::parse(&expr)?,
                None => config.schedule()?,
            };
            show_schedule(&schedule, count);
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { .. } => Ok(exit_codes::SUCCESS),
    }
}

async fn run_audit(config: &Config, path: PathBuf) -> Result<u8> {
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let pb = spinner(&format!("Auditing {}...", path.display()))?;
    let pipeline = AuditPipeline::from_config(config);
    let rating = pipeline.run(&Manifest::from(text)).await;
    pb.finish_and_clear();

    println!("{}: {}", path.display(), rating);

    Ok(match rating {
        Rating::Ok => exit_codes::SUCCESS,
        Rating::Warn => exit_codes::AUDIT_WARN,
        Rating::Error => exit_codes::AUDIT_ERROR,
        Rating::Unknown => exit_codes::ERROR,
    })
}

async fn run_scheduler(
    config: &Config,
    schedule: AuditSchedule,
    format: OutputFormat,
    once: bool,
) -> Result<u8> {
    let source: Arc<dyn PackageSource> = Arc::from(source::from_config(&config.source));
    let cache = Arc::new(RatingCache::new());
    let pipeline = Arc::new(AuditPipeline::from_config(config));

    if once {
        let scheduler = BatchScheduler::new(Arc::clone(&source), pipeline, Arc::clone(&cache));
        let pb = spinner("Auditing packages...")?;
        scheduler.fire().await;
        pb.finish_and_clear();

        print_packages(config, source.as_ref(), &cache, &schedule, format).await?;
        return Ok(exit_codes::SUCCESS);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = Arc::new(
        BatchScheduler::new(Arc::clone(&source), pipeline, Arc::clone(&cache)).with_reports(tx),
    );

    let mut runner = tokio::spawn(scheduler.run(schedule.clone(), async {
        let _ = tokio::signal::ctrl_c().await;
    }));

    loop {
        tokio::select! {
            Some(report) = rx.recv() => {
                info!(
                    audited = report.audited,
                    skipped = report.skipped,
                    "cycle report"
                );
                // The scheduler keeps running when an overview cannot be built.
                if let Err(e) =
                    print_packages(config, source.as_ref(), &cache, &schedule, format).await
                {
                    error!("failed to print package overview: {:#}", e);
                }
            }
            joined = &mut runner => {
                joined.context("scheduler task failed")?;
                break;
            }
        }
    }

    Ok(exit_codes::SUCCESS)
}

async fn print_packages(
    config: &Config,
    source: &dyn PackageSource,
    cache: &RatingCache,
    schedule: &AuditSchedule,
    format: OutputFormat,
) -> Result<()> {
    let overview = build_overview(source, cache, schedule, &config.scope, config.max_versions)
        .await
        .with_context(|| format!("failed to list packages from {}", source.name()))?;
    print_overview(&overview, format)
}

fn show_schedule(schedule: &AuditSchedule, count: usize) {
    let now = Utc::now();
    let fmt = "%Y-%m-%d %H:%M:%S UTC";

    println!("Schedule: {}", schedule);
    match schedule.previous_before(now) {
        Some(prev) => println!("Previous: {}", prev.format(fmt)),
        None => println!("Previous: -"),
    }

    let mut at = now;
    for i in 0..count {
        let Some(next) = schedule.next_after(at) else {
            break;
        };
        let label = if i == 0 { "Next:" } else { "" };
        println!("{:<9} {}", label, next.format(fmt));
        at = next;
    }
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}

fn handle_config(config_path: &std::path::Path, init: bool, show_path: bool) -> Result<()> {
    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save_to(config_path)?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'pkgmon config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}

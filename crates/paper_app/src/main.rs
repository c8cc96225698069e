mod app;
mod config;
mod effects;
mod logging;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use paper_core::{JobId, TogglePolicy};
use paper_engine::{EngineHandle, ReqwestPaperClient};
use paper_logging::paper_info;

use app::{spawn_stdin_reader, Outcome, TrackerApp};
use config::{AppConfig, Settings, API_URL_ENV, DEFAULT_CONFIG_PATH};
use effects::EffectRunner;
use logging::LogDestination;

#[derive(Parser)]
#[command(name = "paper-insight")]
#[command(about = "Upload research papers and follow their analysis", long_about = None)]
#[command(version)]
struct Cli {
    /// Service address, e.g. http://localhost:8000/ (overrides env and config file).
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[arg(long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    #[arg(long, value_enum, default_value_t = LogDestination::File, global = true)]
    log_to: LogDestination,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a job and show its analysis once ready.
    Track {
        job_id: String,

        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
    /// Submit a PDF and print the new job id.
    Upload {
        file: PathBuf,

        /// Keep tracking the new job after the upload.
        #[arg(long)]
        follow: bool,

        #[arg(long, value_enum)]
        policy: Option<PolicyArg>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    Independent,
    Exclusive,
}

impl From<PolicyArg> for TogglePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Independent => TogglePolicy::Independent,
            PolicyArg::Exclusive => TogglePolicy::Exclusive,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::initialize(cli.log_to);

    let file_config = AppConfig::load(&cli.config)?;
    let env_base_url = std::env::var(API_URL_ENV).ok();
    let mut settings = config::resolve(
        &file_config,
        cli.base_url.as_deref(),
        env_base_url.as_deref(),
    );
    paper_info!("using service at {}", settings.client.base_url);

    let client = ReqwestPaperClient::new(settings.client.clone())
        .with_context(|| format!("invalid service address {}", settings.client.base_url))?;
    let runner = EffectRunner::new(EngineHandle::new(Arc::new(client)), settings.retry_policy);

    let outcome = match cli.command {
        Commands::Track { job_id, policy } => {
            apply_policy(&mut settings, policy);
            track(&settings, runner, JobId::new(job_id))?
        }
        Commands::Upload {
            file,
            follow,
            policy,
        } => {
            apply_policy(&mut settings, policy);
            let timeout = settings.client.request_timeout * 2;
            let job_id = runner
                .upload(&file, timeout)
                .with_context(|| format!("upload of {} failed", file.display()))?;
            println!("{job_id}");
            if !follow {
                return Ok(ExitCode::SUCCESS);
            }
            track(&settings, runner, job_id)?
        }
    };

    Ok(exit_code(outcome))
}

fn apply_policy(settings: &mut Settings, policy: Option<PolicyArg>) {
    if let Some(policy) = policy {
        settings.tracker.toggle_policy = policy.into();
    }
}

fn track(settings: &Settings, runner: EffectRunner, job_id: JobId) -> Result<Outcome> {
    let (input_tx, input_rx) = mpsc::channel();
    spawn_stdin_reader(input_tx);
    let mut app = TrackerApp::with_stdout(settings.tracker, runner);
    app.run(job_id, input_rx)
        .context("failed to write the rendered view")
}

fn exit_code(outcome: Outcome) -> ExitCode {
    ExitCode::from(outcome.exit_code())
}

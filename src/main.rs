use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use codeloop::agent::{Agent, ExitReason};
use codeloop::artifact::FileArtifactLog;
use codeloop::cli::{Cli, Commands};
use codeloop::config::Config;
use codeloop::extract::CodeExtractor;
use codeloop::llm::{ModelClient, ProviderClient, api_key_from_env, load_env_file};
use codeloop::sandbox::ProcessSandbox;
use codeloop::terminal::StdTerminal;

fn setup_logging(default_filter: &str) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("codeloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("codeloop.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_client(config: &Config) -> Result<ProviderClient> {
    let env_var = config.llm.resolved_api_key_env();
    let api_key = api_key_from_env(&env_var)?;
    let client = ProviderClient::from_config(&config.llm, api_key).context("Failed to create model client")?;
    Ok(client)
}

async fn run_session(config: &Config) -> Result<()> {
    let client = build_client(config)?;
    let sandbox = ProcessSandbox::from_config(&config.sandbox);
    let sink = FileArtifactLog::new(config.artifacts.path.clone());
    let extractor = CodeExtractor::new(&config.sandbox.language);

    info!(
        "Artifacts -> {}, interpreter {}",
        sink.path().display(),
        sandbox.interpreter()
    );

    let mut agent = Agent::new(client, sandbox, sink, StdTerminal::new(), extractor)
        .with_exit_command(config.agent.exit_command.clone());
    let summary = agent.run().await.context("Agent session failed")?;

    if summary.exit_reason == ExitReason::TaskSucceeded {
        info!("Task confirmed after {} execution(s)", summary.executions);
    }
    Ok(())
}

async fn run_ask(prompt: &str, config: &Config) -> Result<()> {
    let client = build_client(config)?;
    let reply = client.query(prompt).await.context("Model request failed")?;
    println!("{}", reply);
    Ok(())
}

fn run_config(config: &Config) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        None | Some(Commands::Run) => run_session(config).await,
        Some(Commands::Ask { prompt }) => run_ask(prompt, config).await,
        Some(Commands::Config) => run_config(config),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(&cli.log_filter(&config)).context("Failed to setup logging")?;

    load_env_file(None);

    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}

//! `advisor-monitor` command line

use advisor_core::{init_tracing, AdvisorConfig, AdvisorRuntime};
use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

fn cli() -> Command {
    Command::new("advisor-monitor")
        .version(advisor_core::VERSION)
        .about("Analysis cache, metrics and alerting for the consulting backend")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file; defaults apply when omitted"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Write logs as JSON lines"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("run").about("Run background loops until Ctrl-C"))
        .subcommand(Command::new("export").about("Print a metrics exposition of a fresh runtime"))
        .subcommand(Command::new("check-config").about("Validate the configuration and exit"))
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<AdvisorConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => AdvisorConfig::load(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(AdvisorConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    match matches.subcommand() {
        Some(("run", args)) => {
            let config = load_config(args)?;
            let runtime = AdvisorRuntime::builder(config).build()?;
            if runtime.optimizer().is_none() {
                tracing::info!("no generator configured, running monitoring loops only");
            }
            runtime.start();
            tokio::signal::ctrl_c()
                .await
                .context("waiting for Ctrl-C")?;
            runtime.shutdown().await;
        }
        Some(("export", args)) => {
            let config = load_config(args)?;
            let runtime = AdvisorRuntime::builder(config).build()?;
            print!("{}", runtime.export_metrics());
        }
        Some(("check-config", args)) => {
            let config = load_config(args)?;
            println!("configuration ok");
            println!("  cache capacity: {} [{}, {}]",
                config.cache.initial_capacity, config.cache.min_capacity, config.cache.max_capacity);
            println!("  alert rules:    {}", config.alerts.effective_rules().len());
            println!("  alert channels: {}", config.alerts.channels.len());
            println!("  canned responses: {}", config.generator.use_canned_responses);
        }
        _ => unreachable!("subcommand is required"),
    }
    Ok(())
}

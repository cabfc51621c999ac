//! Command-line interface for analyst-rs

mod cli;
mod output;

use analyst_agents::{
    AgentConfig, EquityResearcher, Provenance, ResearchError, ResearchOptions, SetupStatus,
};
use analyst_core::DataKind;
use analyst_data::{DataCoverage, Gateway, GatewayConfig};
use clap::Parser;
use cli::{Cli, Command, OutputFormat, ResearchArgs, StatusArgs};
use std::process::ExitCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A missing .env file is fine; the process environment still applies
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    analyst_utils::init_tracing(cli.log_format);
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded environment file"),
        Err(error) if error.not_found() => {}
        Err(error) => warn!(%error, "Ignoring unreadable .env file"),
    }

    match cli.command {
        Command::Research(args) => research(args).await,
        Command::Status(args) => status(args).await,
    }
}

async fn status(args: StatusArgs) -> anyhow::Result<ExitCode> {
    let gateway_config = GatewayConfig::builder().cache_enabled(false).build()?;
    let setup = SetupStatus::from_env(&AgentConfig::from_env(), &gateway_config);

    let sample = match &args.fetch {
        Some(ticker) => {
            let gateway = Gateway::from_env(gateway_config)?;
            let ticker = gateway.normalize(ticker)?;
            info!(%ticker, "Checking data providers");
            let result = gateway
                .fetch_all(&ticker, &DataKind::ALL, &CancellationToken::new())
                .await;
            let coverage = DataCoverage::assess(
                result
                    .entries()
                    .iter()
                    .filter_map(|(_, outcome)| outcome.as_ref().ok()),
            );
            Some((result, coverage))
        }
        None => None,
    };

    match args.format {
        OutputFormat::Text => {
            print!("{}", output::render_status(&setup));
            if let Some((result, coverage)) = &sample {
                println!("\nProvider check:\n{}", output::fetch_table(result));
                println!("Data coverage: {coverage}");
            }
        }
        OutputFormat::Json => {
            let body = output::status_json(&setup, sample.as_ref().map(|(r, c)| (r, c)));
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(if setup.is_configured() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn research(args: ResearchArgs) -> anyhow::Result<ExitCode> {
    let mut agent_config = AgentConfig::from_env();
    if let Some(model) = args.model {
        agent_config.model = model;
    }

    let mut gateway_config = GatewayConfig::builder();
    if let Some(market) = args.market {
        gateway_config = gateway_config.default_market(market.into());
    }
    let researcher = EquityResearcher::from_env(agent_config, gateway_config.build()?)?;

    let options = ResearchOptions {
        max_iterations: args.max_iterations,
        quality_threshold: args.threshold,
        timeout: Duration::from_secs(args.timeout),
        market: args.market.map(Into::into),
        revision_policy: args.revision_policy.into(),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing with what the run has so far");
            on_interrupt.cancel();
        }
    });

    info!(ticker = %args.ticker, "Starting research");
    match researcher
        .research_with_cancel(&args.ticker, options, cancel)
        .await
    {
        Ok(report) => {
            match args.format {
                OutputFormat::Text => println!("{}", output::render_text(&report)),
                OutputFormat::Json => println!("{}", output::render_json(&report)?),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(ResearchError::Fatal {
            kind,
            message,
            state,
        }) => {
            let provenance = Provenance::from_state(&state);
            match args.format {
                OutputFormat::Text => {
                    eprintln!("Research failed ({kind}): {message}");
                    if !provenance.succeeded.is_empty() || !provenance.failed.is_empty() {
                        eprintln!("{}", output::provenance_table(&provenance));
                    }
                }
                OutputFormat::Json => {
                    let body = output::failure_json(kind, &message, &provenance);
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
            }
            Ok(ExitCode::FAILURE)
        }
        Err(other) => Err(other.into()),
    }
}

//! Command-line arguments

use analyst_core::Market;
use analyst_utils::LogFormat;
use analyst_workflow::RevisionPolicy;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "analyst")]
#[command(version, about = "Multi-agent equity research from the command line", long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, default_value = "pretty", env = "ANALYST_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Research a ticker and print the report
    Research(ResearchArgs),
    /// Show which credentials and data providers are configured
    Status(StatusArgs),
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Also fetch every data kind for a ticker to check each provider live
    #[arg(long, value_name = "TICKER", num_args = 0..=1, default_missing_value = "AAPL")]
    pub fetch: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct ResearchArgs {
    /// Ticker symbol (e.g. AAPL, RELIANCE.NS, NSE:TCS)
    pub ticker: String,

    /// Upper bound on analyst/writer/checker cycles
    #[arg(long, default_value_t = 3)]
    pub max_iterations: u32,

    /// Minimum passing quality score (0-10)
    #[arg(long, default_value_t = 7.0)]
    pub threshold: f32,

    /// Wall-clock budget for the run in seconds
    #[arg(long, default_value_t = 300)]
    pub timeout: u64,

    /// Market for symbols without an exchange suffix
    #[arg(long, value_enum)]
    pub market: Option<MarketArg>,

    /// Model identifier (defaults to ANALYST_MODEL or the built-in default)
    #[arg(long)]
    pub model: Option<String>,

    /// Where a revision pass re-enters the pipeline
    #[arg(long, value_enum, default_value_t = PolicyArg::Reanalyze)]
    pub revision_policy: PolicyArg,

    /// Report output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MarketArg {
    Us,
    Nse,
    Bse,
}

impl From<MarketArg> for Market {
    fn from(arg: MarketArg) -> Self {
        match arg {
            MarketArg::Us => Market::Us,
            MarketArg::Nse => Market::Nse,
            MarketArg::Bse => Market::Bse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    Reanalyze,
    Targeted,
}

impl From<PolicyArg> for RevisionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Reanalyze => RevisionPolicy::Reanalyze,
            PolicyArg::Targeted => RevisionPolicy::Targeted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown report followed by a source table
    Text,
    /// The full report as JSON
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_research_defaults() {
        let cli = Cli::try_parse_from(["analyst", "research", "AAPL"]).unwrap();
        let Command::Research(args) = cli.command else {
            panic!("expected research command");
        };

        assert_eq!(args.ticker, "AAPL");
        assert_eq!(args.max_iterations, 3);
        assert_eq!(args.timeout, 300);
        assert_eq!(args.market, None);
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn test_research_flags() {
        let cli = Cli::try_parse_from([
            "analyst",
            "--log-format",
            "json",
            "research",
            "TCS",
            "--market",
            "nse",
            "--threshold",
            "8.5",
            "--format",
            "json",
            "--revision-policy",
            "targeted",
        ])
        .unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);

        let Command::Research(args) = cli.command else {
            panic!("expected research command");
        };
        assert_eq!(args.market.map(Market::from), Some(Market::Nse));
        assert!((args.threshold - 8.5).abs() < f32::EPSILON);
        assert_eq!(RevisionPolicy::from(args.revision_policy), RevisionPolicy::Targeted);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_status_fetch_defaults_ticker() {
        let cli = Cli::try_parse_from(["analyst", "status"]).unwrap();
        let Command::Status(args) = cli.command else {
            panic!("expected status command");
        };
        assert_eq!(args.fetch, None);

        let cli = Cli::try_parse_from(["analyst", "status", "--fetch"]).unwrap();
        let Command::Status(args) = cli.command else {
            panic!("expected status command");
        };
        assert_eq!(args.fetch.as_deref(), Some("AAPL"));

        let cli = Cli::try_parse_from(["analyst", "status", "--fetch", "INFY.NS", "--format", "json"])
            .unwrap();
        let Command::Status(args) = cli.command else {
            panic!("expected status command");
        };
        assert_eq!(args.fetch.as_deref(), Some("INFY.NS"));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_rejects_unknown_market() {
        assert!(Cli::try_parse_from(["analyst", "research", "X", "--market", "lse"]).is_err());
    }
}

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Streaming,
    Chunked,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Text,
    Jsonl,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategyArg {
    Fixed,
    Linear,
    ExponentialBackoff,
}

impl RetryStrategyArg {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Linear => "linear",
            Self::ExponentialBackoff => "exponential-backoff",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "fanout", version, about = "Fetch many URLs with bounded concurrency")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file to use instead of ~/.fanout/config.toml or ./fanout.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// URLs to fetch. Combined with `--input` when both are given.
    pub urls: Vec<String>,

    /// File with one URL per line, or `-` for stdin. Blank lines and `#` comments are skipped.
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    #[arg(long)]
    pub max_retries: Option<u32>,

    #[arg(long, value_enum)]
    pub retry_strategy: Option<RetryStrategyArg>,

    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Per-request timeout.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Sub-resource category to skip (image, font, media, stylesheet, script).
    /// Can be specified multiple times.
    #[arg(long = "block", action = clap::ArgAction::Append)]
    pub block: Vec<String>,

    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Write the execution log as CSV.
    #[arg(long)]
    pub log_csv: Option<PathBuf>,

    /// Write the full run result as JSON.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub progress: bool,

    /// Re-sort fetched pages into input order.
    #[arg(long)]
    pub sort_by_input: bool,

    #[arg(long)]
    pub ascii: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch URLs and report the outcome.
    Run(RunArgs),
    /// Print the effective configuration as TOML.
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let args = Args::try_parse_from([
            "fanout",
            "run",
            "https://a.com",
            "https://b.com",
            "--concurrency",
            "8",
            "--mode",
            "chunked",
            "--retry-strategy",
            "exponential-backoff",
            "--block",
            "image",
            "--block",
            "font",
            "--config",
            "custom.toml",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("custom.toml")));
        let Commands::Run(run) = args.command else {
            panic!("expected run command");
        };
        assert_eq!(run.urls, vec!["https://a.com", "https://b.com"]);
        assert_eq!(run.concurrency, Some(8));
        assert_eq!(run.mode, Some(ModeArg::Chunked));
        assert_eq!(run.retry_strategy, Some(RetryStrategyArg::ExponentialBackoff));
        assert_eq!(run.block, vec!["image", "font"]);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Args::try_parse_from(["fanout", "run", "--mode", "round-robin"]).is_err());
    }
}

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use dcfx::cli::setup::setup;
use dcfx::core::AssumptionOverrides;
use dcfx::core::analyzer::DEFAULT_HISTORY_LIMIT;
use dcfx::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Replacements for the default DCF assumptions, as decimals (0.12 = 12%).
#[derive(Args, Default)]
struct OverrideArgs {
    #[arg(long, allow_negative_numbers = true)]
    revenue_growth: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    terminal_growth: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    operating_margin: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    tax_rate: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    capex_pct: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    nwc_pct: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    wacc: Option<f64>,
}

impl From<OverrideArgs> for AssumptionOverrides {
    fn from(args: OverrideArgs) -> Self {
        AssumptionOverrides {
            revenue_growth: args.revenue_growth,
            terminal_growth: args.terminal_growth,
            operating_margin: args.operating_margin,
            tax_rate: args.tax_rate,
            capex_pct: args.capex_pct,
            nwc_pct: args.nwc_pct,
            wacc: args.wacc,
        }
    }
}

impl From<Commands> for dcfx::AppCommand {
    fn from(cmd: Commands) -> dcfx::AppCommand {
        match cmd {
            Commands::Analyze {
                tickers,
                overrides,
                json,
            } => dcfx::AppCommand::Analyze {
                tickers,
                overrides: overrides.into(),
                json,
            },
            Commands::History { limit } => dcfx::AppCommand::History { limit },
            Commands::Save { id } => dcfx::AppCommand::Save { id },
            Commands::Delete { id } => dcfx::AppCommand::Delete { id },
            Commands::Purge => dcfx::AppCommand::Purge,
            Commands::Serve { bind } => dcfx::AppCommand::Serve { bind },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run a DCF valuation for one or more tickers
    Analyze {
        #[arg(required = true)]
        tickers: Vec<String>,
        #[command(flatten)]
        overrides: OverrideArgs,
        /// Print the reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent analyses
    History {
        #[arg(short, long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Keep an analysis past the retention period
    Save { id: String },
    /// Delete an analysis
    Delete { id: String },
    /// Remove expired unsaved analyses
    Purge,
    /// Serve the JSON HTTP API
    Serve {
        /// Address to listen on, e.g. 127.0.0.1:3030
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => dcfx::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

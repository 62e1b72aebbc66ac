pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "movequote",
    about = "Movequote operator CLI",
    long_about = "Inspect configuration, check rate sources, price requests offline, and run a console chat session.",
    after_help = "Examples:\n  movequote doctor --json\n  movequote quote --request request.json --rates prices.json\n  movequote rates diff --old prices.json --new prices.next.json\n  movequote chat --admin"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, bot token readiness, and rate source reachability")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Price a JSON quote request against a rate table")]
    Quote {
        #[arg(long, help = "Path to the quote request JSON")]
        request: PathBuf,
        #[arg(long, help = "Rate table JSON; defaults to the configured source chain")]
        rates: Option<PathBuf>,
    },
    #[command(about = "Show or compare rate tables")]
    Rates {
        #[command(subcommand)]
        command: RatesCommand,
    },
    #[command(about = "Run an interactive quote dialog over stdin and stdout")]
    Chat {
        #[arg(long, help = "Rate table JSON; defaults to the configured source chain")]
        rates: Option<PathBuf>,
        #[arg(long, default_value_t = 1, help = "User id the console session acts as")]
        user_id: i64,
        #[arg(long, help = "Treat the console user as an administrator")]
        admin: bool,
    },
}

#[derive(Debug, Subcommand)]
enum RatesCommand {
    #[command(about = "Print headline prices of the current rate table")]
    Show {
        #[arg(long, help = "Rate table JSON; defaults to the configured source chain")]
        rates: Option<PathBuf>,
    },
    #[command(about = "List headline prices that differ between two rate tables")]
    Diff {
        #[arg(long)]
        old: PathBuf,
        #[arg(long)]
        new: PathBuf,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Quote { request, rates } => commands::quote::run(&request, rates.as_deref()),
        Command::Rates { command: RatesCommand::Show { rates } } => {
            commands::rates::show(rates.as_deref())
        }
        Command::Rates { command: RatesCommand::Diff { old, new } } => {
            commands::rates::diff(&old, &new)
        }
        Command::Chat { rates, user_id, admin } => {
            commands::chat::run(rates.as_deref(), user_id, admin)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub mod commands;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::process::ExitCode;

use crate::commands::calc::CalcArgs;

#[derive(Debug, Parser)]
#[command(
    name = "printquote",
    about = "Printquote operator CLI",
    long_about = "Price 3D print jobs, browse saved quotes and maintain the local database.",
    after_help = "Examples:\n  printquote migrate\n  printquote calc --material-id 1 --grams 200 \
                  --print-minutes 30 --quantity 3\n  printquote quotes list --search Llave"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Insert the default material, rates, packaging and local shipping")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Price a single-item job with the stored rates without saving it")]
    Calc {
        #[arg(long)]
        material_id: i64,
        #[arg(long)]
        grams: Decimal,
        #[arg(long, default_value = "0")]
        print_minutes: Decimal,
        #[arg(long, default_value = "0")]
        labor_minutes: Decimal,
        #[arg(long, default_value = "1")]
        quantity: Decimal,
        #[arg(long = "waste", default_value = "0", help = "Waste percent (0-100)")]
        waste_percent: Decimal,
        #[arg(long = "margin", default_value = "0", help = "Margin percent (0-100)")]
        margin_percent: Decimal,
        #[arg(long = "tax", help = "Apply tax on top of the subtotal")]
        tax_enabled: bool,
        #[arg(long, help = "Tax percent; defaults to the stored rate")]
        tax_percent: Option<Decimal>,
        #[arg(long)]
        shipping_rate_id: Option<i64>,
        #[arg(long)]
        packaging_rate_id: Option<i64>,
    },
    #[command(about = "Browse saved quotes")]
    Quotes {
        #[command(subcommand)]
        command: QuotesCommand,
    },
}

#[derive(Debug, Subcommand)]
enum QuotesCommand {
    #[command(about = "List saved quotes, newest first")]
    List {
        #[arg(long, help = "Case-sensitive substring matched against title and notes")]
        search: Option<String>,
    },
    #[command(about = "Show the stored snapshot of a quote as JSON")]
    Show { id: i64 },
    #[command(about = "Render a quote as plain text")]
    Text { id: i64 },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Calc {
            material_id,
            grams,
            print_minutes,
            labor_minutes,
            quantity,
            waste_percent,
            margin_percent,
            tax_enabled,
            tax_percent,
            shipping_rate_id,
            packaging_rate_id,
        } => commands::calc::run(CalcArgs {
            material_id,
            grams,
            print_minutes,
            labor_minutes,
            quantity,
            waste_percent,
            margin_percent,
            tax_enabled,
            tax_percent,
            shipping_rate_id,
            packaging_rate_id,
        }),
        Command::Quotes { command } => match command {
            QuotesCommand::List { search } => {
                commands::quotes::list(search.as_deref().unwrap_or_default())
            }
            QuotesCommand::Show { id } => commands::quotes::show(id),
            QuotesCommand::Text { id } => commands::quotes::text(id),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

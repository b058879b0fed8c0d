mod cmd;

use clap::{Parser, Subcommand};
use k2agg::config::{GlobalArgs, Settings};

#[derive(Parser, Debug)]
#[command(name = "k2agg")]
#[command(about = "Schedule K-2 Part II line items and cross-entity aggregation", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create, list and edit reporting entities
    Entity(cmd::entity::EntityCommand),
    /// Edit country rows on an entity's lines
    Entry(cmd::entry::EntryCommand),
    /// Aggregate submitted entities into a new snapshot
    Aggregate(cmd::aggregate::AggregateCommand),
    /// Show the current aggregation snapshot
    Report(cmd::report::ReportCommand),
    /// Write the current snapshot as a standalone HTML page
    Html(cmd::html_report::HtmlCommand),
    /// Inspect or clear earlier snapshots
    History(cmd::history::HistoryCommand),
    /// Scan entity data for advisory warnings
    Validate(cmd::validate::ValidateCommand),
    /// List reference country names
    Countries(cmd::countries::CountriesCommand),
    /// List Schedule K-2 Part II line numbers
    Lines(cmd::lines::LinesCommand),
    /// Print the stored state schema or report CSV fields
    Schema(cmd::schema::SchemaCommand),
    /// Seed sample entities
    Demo(cmd::demo::DemoCommand),
    /// Delete all stored data
    Reset(cmd::reset::ResetCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::from(&cli.global);

    match cli.command {
        Command::Entity(c) => c.exec(&settings),
        Command::Entry(c) => c.exec(&settings),
        Command::Aggregate(c) => c.exec(&settings),
        Command::Report(c) => c.exec(&settings),
        Command::Html(c) => c.exec(&settings),
        Command::History(c) => c.exec(&settings),
        Command::Validate(c) => c.exec(&settings),
        Command::Countries(c) => c.exec(&settings),
        Command::Lines(c) => c.exec(),
        Command::Schema(c) => c.exec(),
        Command::Demo(c) => c.exec(&settings),
        Command::Reset(c) => c.exec(&settings),
    }
}

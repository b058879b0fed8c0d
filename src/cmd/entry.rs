//! Entry command - country rows on an entity's lines

use crate::cmd::{resolve_entity, resolve_entry};
use clap::{Args, Subcommand};
use k2agg::config::Settings;
use k2agg::core::{ColumnKey, EditOutcome};

#[derive(Args, Debug)]
pub struct EntryCommand {
    #[command(subcommand)]
    action: EntryAction,
}

#[derive(Args, Debug)]
struct LineTarget {
    /// Entity id or name
    entity: String,

    /// Part II line number
    #[arg(short, long)]
    line: u32,
}

#[derive(Subcommand, Debug)]
enum EntryAction {
    /// Add a zeroed country row to a line
    Add {
        #[command(flatten)]
        target: LineTarget,
        /// Country name, unique on the line ignoring case
        #[arg(short, long)]
        country: String,
    },
    /// Rename the country of a row
    Rename {
        #[command(flatten)]
        target: LineTarget,
        /// Sub-row label or current country name
        entry: String,
        #[arg(short, long)]
        country: String,
    },
    /// Remove a row; the line is dropped once empty
    Remove {
        #[command(flatten)]
        target: LineTarget,
        /// Sub-row label or country name
        entry: String,
    },
    /// Set one column of a row
    Set {
        #[command(flatten)]
        target: LineTarget,
        /// Sub-row label or country name
        entry: String,
        /// Column a-f, or eCategory
        #[arg(short = 'k', long)]
        column: ColumnKey,
        /// Amount as typed; currency symbols and separators are stripped
        #[arg(short, long, allow_hyphen_values = true)]
        value: String,
    },
    /// Remove every row on one line
    ClearLine {
        #[command(flatten)]
        target: LineTarget,
    },
    /// Remove all line data of an entity
    Clear {
        /// Entity id or name
        entity: String,
    },
}

impl EntryCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut session = settings.open_session();
        match &self.action {
            EntryAction::Add { target, country } => {
                let id = resolve_entity(session.state(), &target.entity)?;
                session.update(|s| s.add_country(id, target.line, country))?;
                println!("Added {} to line {}", country.trim(), target.line);
            }
            EntryAction::Rename {
                target,
                entry,
                country,
            } => {
                let id = resolve_entity(session.state(), &target.entity)?;
                let entry_id = resolve_entry(session.state(), id, target.line, entry)?;
                session.update(|s| s.rename_country(id, target.line, entry_id, country))?;
                println!("Renamed to {} on line {}", country.trim(), target.line);
            }
            EntryAction::Remove { target, entry } => {
                let id = resolve_entity(session.state(), &target.entity)?;
                let entry_id = resolve_entry(session.state(), id, target.line, entry)?;
                session.update(|s| s.delete_country(id, target.line, entry_id));
                println!("Removed {} from line {}", entry, target.line);
            }
            EntryAction::Set {
                target,
                entry,
                column,
                value,
            } => {
                let id = resolve_entity(session.state(), &target.entity)?;
                let entry_id = resolve_entry(session.state(), id, target.line, entry)?;
                let outcome =
                    session.update(|s| s.edit_column(id, target.line, entry_id, *column, value))?;
                match outcome {
                    EditOutcome::Applied => {
                        let row = session
                            .state()
                            .entities()
                            .line(id, target.line)
                            .and_then(|l| l.entry(entry_id));
                        if let Some(row) = row {
                            println!(
                                "Line {} {}: ({}) set, total (g) {}",
                                target.line,
                                row.country,
                                column,
                                k2agg::core::money::format_amount(row.columns.g())
                            );
                        }
                    }
                    EditOutcome::Dropped => {
                        anyhow::bail!("'{}' is not a valid amount; value unchanged", value)
                    }
                    EditOutcome::Ignored => {
                        anyhow::bail!("Column ({}) is derived and cannot be edited", column)
                    }
                }
            }
            EntryAction::ClearLine { target } => {
                let id = resolve_entity(session.state(), &target.entity)?;
                session.update(|s| s.clear_line_data(id, target.line));
                println!("Cleared line {}", target.line);
            }
            EntryAction::Clear { entity } => {
                let id = resolve_entity(session.state(), entity)?;
                session.update(|s| s.clear_entity_data(id));
                println!("Cleared all line data of {}", id);
            }
        }
        Ok(())
    }
}

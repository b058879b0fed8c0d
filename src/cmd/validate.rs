//! Validate command - surface advisory data warnings without aggregating

use crate::cmd::resolve_entity;
use clap::Args;
use k2agg::config::Settings;
use k2agg::core::{check_data_warnings_with, AppState, DataWarning, Severity};
use serde::Serialize;

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Entity id or name (default: all entities)
    entity: Option<String>,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,

    /// Exit with status 1 when any warning-level finding exists
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Serialize)]
struct EntityWarnings {
    entity: String,
    warnings: Vec<DataWarning>,
}

#[derive(Debug, Serialize)]
struct ValidationOutput {
    warning_count: usize,
    entities: Vec<EntityWarnings>,
}

impl ValidateCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let session = settings.open_session();
        let state = session.state();
        let output = self.scan(state, settings)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print_text(&output);
        }

        let blocking = output
            .entities
            .iter()
            .flat_map(|e| &e.warnings)
            .any(|w| w.severity >= Severity::Warning);
        if self.strict && blocking {
            std::process::exit(1);
        }
        Ok(())
    }

    fn scan(&self, state: &AppState, settings: &Settings) -> anyhow::Result<ValidationOutput> {
        let book = state.entities();
        let ids = match &self.entity {
            Some(key) => vec![resolve_entity(state, key)?],
            None => book.entities().map(|e| e.id).collect(),
        };
        let options = settings.scan_options();

        let entities: Vec<EntityWarnings> = ids
            .into_iter()
            .filter_map(|id| {
                let entity = book.entity(id)?;
                let warnings = book
                    .entity_data(id)
                    .map(|data| check_data_warnings_with(data, &options))
                    .unwrap_or_default();
                Some(EntityWarnings {
                    entity: entity.name.clone(),
                    warnings,
                })
            })
            .collect();

        Ok(ValidationOutput {
            warning_count: entities.iter().map(|e| e.warnings.len()).sum(),
            entities,
        })
    }
}

fn print_text(output: &ValidationOutput) {
    println!();
    println!("VALIDATION RESULTS");
    println!();

    if output.warning_count == 0 {
        println!("\u{2713} No issues found.");
        return;
    }
    println!("\u{26A0} {} issue(s) found:", output.warning_count);
    for entity in output.entities.iter().filter(|e| !e.warnings.is_empty()) {
        println!();
        println!("  {}", entity.entity);
        for (i, warning) in entity.warnings.iter().enumerate() {
            println!(
                "    {}. [{}/{}] {}",
                i + 1,
                warning.severity,
                warning.kind,
                warning.message
            );
        }
    }
    println!();
}

//! Entity command - create, inspect and edit reporting entities

use crate::cmd::resolve_entity;
use clap::{Args, Subcommand};
use k2agg::config::Settings;
use k2agg::core::{check_data_warnings_with, money, AppState, EntityId, EntityStatus};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct EntityCommand {
    #[command(subcommand)]
    action: EntityAction,
}

#[derive(Subcommand, Debug)]
enum EntityAction {
    /// Create a new DRAFT entity
    Create {
        /// Display name (at least 2 characters)
        #[arg(short, long)]
        name: String,
        /// External tax identifier, e.g. an EIN
        #[arg(short, long)]
        identifier: String,
    },
    /// List entities in creation order
    List {
        /// Output as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show an entity's lines and country rows
    Show {
        /// Entity id or name
        entity: String,
        /// Output as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Change name or identifier
    Rename {
        /// Entity id or name
        entity: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        identifier: Option<String>,
    },
    /// Delete an entity and all of its line data
    Delete {
        /// Entity id or name
        entity: String,
    },
    /// Mark an entity SUBMITTED so it is aggregated
    Submit {
        /// Entity id or name
        entity: String,
    },
    /// Return an entity to DRAFT
    Draft {
        /// Entity id or name
        entity: String,
    },
}

#[derive(Debug, Tabled)]
struct EntityRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Identifier")]
    identifier: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Lines")]
    lines: usize,
    #[tabled(rename = "Countries")]
    countries: usize,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Id")]
    id: String,
}

#[derive(Debug, Tabled)]
struct CountryRow {
    #[tabled(rename = "#")]
    label: String,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "(a) U.S.")]
    a: String,
    #[tabled(rename = "(b)")]
    b: String,
    #[tabled(rename = "(c)")]
    c: String,
    #[tabled(rename = "(d)")]
    d: String,
    #[tabled(rename = "(e)")]
    e: String,
    #[tabled(rename = "Cat.")]
    e_category: String,
    #[tabled(rename = "(f)")]
    f: String,
    #[tabled(rename = "(g) Total")]
    g: String,
}

impl EntityCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut session = settings.open_session();
        match &self.action {
            EntityAction::Create { name, identifier } => {
                let id = session.update(|s| s.create_entity(name, identifier))?;
                println!("Created entity {} ({})", name.trim(), id);
            }
            EntityAction::List { json } => {
                if *json {
                    let entities: Vec<_> = session.state().entities().entities().collect();
                    println!("{}", serde_json::to_string_pretty(&entities)?);
                } else {
                    print_list(session.state());
                }
            }
            EntityAction::Show { entity, json } => {
                let id = resolve_entity(session.state(), entity)?;
                if *json {
                    let book = session.state().entities();
                    let out = serde_json::json!({
                        "entity": book.entity(id),
                        "data": book.entity_data(id),
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                } else {
                    print_entity(session.state(), id, settings);
                }
            }
            EntityAction::Rename {
                entity,
                name,
                identifier,
            } => {
                let id = resolve_entity(session.state(), entity)?;
                let (current_name, current_identifier) = session
                    .state()
                    .entities()
                    .entity(id)
                    .map(|e| (e.name.clone(), e.identifier.clone()))
                    .unwrap_or_default();
                let name = name.clone().unwrap_or(current_name);
                let identifier = identifier.clone().unwrap_or(current_identifier);
                session.update(|s| s.update_entity(id, &name, &identifier))?;
                println!("Updated entity {}", id);
            }
            EntityAction::Delete { entity } => {
                let id = resolve_entity(session.state(), entity)?;
                session.update(|s| s.delete_entity(id));
                println!("Deleted entity {}", id);
            }
            EntityAction::Submit { entity } => {
                set_status(&mut session, entity, EntityStatus::Submitted)?;
            }
            EntityAction::Draft { entity } => {
                set_status(&mut session, entity, EntityStatus::Draft)?;
            }
        }
        Ok(())
    }
}

fn set_status(
    session: &mut k2agg::session::Session,
    entity: &str,
    status: EntityStatus,
) -> anyhow::Result<()> {
    let id = resolve_entity(session.state(), entity)?;
    session.update(|s| s.set_entity_status(id, status));
    println!("Entity {} is now {}", id, status);
    Ok(())
}

fn print_list(state: &AppState) {
    let book = state.entities();
    if book.is_empty() {
        println!("No entities. Create one with `k2agg entity create`.");
        return;
    }
    let rows: Vec<EntityRow> = book
        .entities()
        .map(|e| {
            let data = book.entity_data(e.id);
            EntityRow {
                name: e.name.clone(),
                identifier: e.identifier.clone(),
                status: e.status.to_string(),
                lines: data.map_or(0, |d| d.lines.len()),
                countries: data.map_or(0, |d| d.country_count()),
                updated: e.updated_at.format("%Y-%m-%d %H:%M").to_string(),
                id: e.id.to_string(),
            }
        })
        .collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

fn print_entity(state: &AppState, id: EntityId, settings: &Settings) {
    let book = state.entities();
    let Some(entity) = book.entity(id) else {
        return;
    };
    println!("{} ({})", entity.name, entity.identifier);
    println!("Status: {}   Id: {}", entity.status, entity.id);
    println!();

    let Some(data) = book.entity_data(id).filter(|d| d.has_data()) else {
        println!("No line data");
        return;
    };

    for (line_number, line) in &data.lines {
        println!("Line {}: {}", line_number, k2agg::core::line_description(*line_number));
        let rows: Vec<CountryRow> = line
            .entries
            .iter()
            .map(|entry| {
                let [a, b, c, d, e, f] = entry.columns.amounts().map(money::format_amount);
                CountryRow {
                    label: entry.sub_row_label.clone(),
                    country: entry.country.clone(),
                    a,
                    b,
                    c,
                    d,
                    e,
                    e_category: entry.columns.e_category().unwrap_or("").to_string(),
                    f,
                    g: money::format_amount(entry.columns.g()),
                }
            })
            .collect();
        let table = Table::new(rows)
            .with(Style::rounded())
            .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            .to_string();
        println!("{}", table);
        println!();
    }

    let warnings = check_data_warnings_with(data, &settings.scan_options());
    if !warnings.is_empty() {
        println!(
            "{} warning(s); run `k2agg validate {}` for details",
            warnings.len(),
            entity.name
        );
    }
}

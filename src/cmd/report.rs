use clap::Args;
use k2agg::config::Settings;
use k2agg::core::{included_names, money, top_countries, AggregationSnapshot};
use k2agg_derive::CsvSchema;
use serde::Serialize;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output the snapshot as JSON
    #[arg(long)]
    json: bool,

    /// Also rank countries by total across all lines
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "10")]
    top: Option<usize>,
}

/// One column of the exported CSV
#[derive(Debug, Clone, Copy)]
pub struct CsvField {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// One (line, country) total of a snapshot
#[derive(Debug, Clone, PartialEq, Tabled, Serialize, CsvSchema)]
pub struct ReportRow {
    /// Schedule K-2 Part II line number
    #[tabled(rename = "Line")]
    pub line_number: u32,

    /// Line description
    #[tabled(rename = "Description")]
    pub description: String,

    /// Country name as entered
    #[tabled(rename = "Country")]
    pub country: String,

    /// Columns (b) through (f) summed across submitted entities, 4 decimal places
    #[tabled(rename = "Foreign Total")]
    #[serde(rename = "foreign_source_total")]
    pub foreign_total: String,
}

#[derive(Debug, Tabled)]
struct TopRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Country")]
    country: String,
    #[tabled(rename = "Total")]
    total: String,
}

pub fn report_rows(snapshot: &AggregationSnapshot) -> Vec<ReportRow> {
    snapshot
        .results
        .iter()
        .flat_map(|result| {
            result.country_totals.iter().map(move |ct| ReportRow {
                line_number: result.line_number,
                description: result.line_description.clone(),
                country: ct.country.clone(),
                foreign_total: money::format_amount(ct.foreign_total),
            })
        })
        .collect()
}

impl ReportCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let session = settings.open_session();
        let state = session.state();
        let Some(snapshot) = state.aggregation().current() else {
            anyhow::bail!("No aggregation yet. Run `k2agg aggregate` first.");
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
            return Ok(());
        }

        let rows = report_rows(snapshot);
        if self.csv {
            let mut wtr = csv::Writer::from_writer(io::stdout());
            for row in &rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
            return Ok(());
        }

        println!("SCHEDULE K-2 PART II AGGREGATION (tax year {})", snapshot.tax_year);
        println!(
            "Generated {}  [{}]",
            snapshot.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            if snapshot.is_valid { "current" } else { "STALE" }
        );
        let names = included_names(snapshot, state.entities().entities());
        if names.is_empty() {
            println!("Entities: none submitted");
        } else {
            println!("Entities: {}", names.join(", "));
        }
        println!();

        if rows.is_empty() {
            println!("No foreign-source data.");
        } else {
            let table = Table::new(rows.clone())
                .with(Style::rounded())
                .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
                .to_string();
            println!("{}", table);
        }
        println!(
            "Total foreign source: {}  ({} countries on {} lines)",
            money::format_amount(snapshot.grand_total()?),
            snapshot.country_count(),
            snapshot.results.len()
        );
        println!("Digest: {}", snapshot.content_digest());

        if let Some(limit) = self.top {
            let top: Vec<TopRow> = top_countries(snapshot, limit)?
                .into_iter()
                .enumerate()
                .map(|(i, c)| TopRow {
                    rank: i + 1,
                    country: c.country,
                    total: money::format_amount(c.total),
                })
                .collect();
            println!();
            println!("Top countries");
            println!(
                "{}",
                Table::new(top)
                    .with(Style::rounded())
                    .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
            );
        }

        if !snapshot.is_valid {
            println!();
            println!("Entity data changed since this snapshot; run `k2agg aggregate` to refresh.");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k2agg::core::{AppState, ColumnKey, EntityStatus};

    #[test]
    fn rows_follow_snapshot_order() {
        let mut state = AppState::new();
        let id = state.create_entity("Acme", "1").unwrap();
        state.set_entity_status(id, EntityStatus::Submitted);
        for (line, country, amount) in [(2, "Spain", "7"), (1, "Peru", "3"), (1, "Chile", "1.5")] {
            let entry = state.add_country(id, line, country).unwrap();
            state.edit_column(id, line, entry, ColumnKey::B, amount).unwrap();
        }
        let snapshot = state.generate_report().unwrap().clone();

        let rows = report_rows(&snapshot);
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.line_number, r.country.as_str(), r.foreign_total.as_str()))
            .collect();
        assert_eq!(
            keys,
            [(1, "Chile", "1.5000"), (1, "Peru", "3.0000"), (2, "Spain", "7.0000")]
        );
        assert_eq!(rows[0].description, "Sales");
    }

    #[test]
    fn csv_header_uses_serde_names() {
        assert_eq!(
            ReportRow::csv_header(),
            ["line_number", "description", "country", "foreign_source_total"]
        );
        assert!(ReportRow::csv_schema().iter().all(|f| f.required));
    }
}

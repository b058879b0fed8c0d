use clap::{Args, Subcommand};
use k2agg::config::Settings;
use k2agg::core::{money, AggregationSnapshot, MoneyError};
use tabled::{settings::Style, Table, Tabled};

#[derive(Args, Debug)]
pub struct HistoryCommand {
    #[command(subcommand)]
    action: Option<HistoryAction>,
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List the current snapshot and the ones it replaced (default)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop archived snapshots, keeping the current one
    Clear,
    /// Drop the current snapshot, keeping the archive
    ClearCurrent,
}

#[derive(Debug, Tabled)]
struct SnapshotRow {
    #[tabled(rename = "")]
    slot: String,
    #[tabled(rename = "Generated")]
    generated: String,
    #[tabled(rename = "Tax Year")]
    tax_year: i32,
    #[tabled(rename = "Entities")]
    entities: usize,
    #[tabled(rename = "Lines")]
    lines: usize,
    #[tabled(rename = "Foreign Total")]
    total: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Digest")]
    digest: String,
}

impl SnapshotRow {
    fn new(slot: String, snapshot: &AggregationSnapshot) -> Result<Self, MoneyError> {
        let mut digest = snapshot.content_digest();
        digest.truncate(12);
        Ok(SnapshotRow {
            slot,
            generated: snapshot.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            tax_year: snapshot.tax_year,
            entities: snapshot.included_entity_ids.len(),
            lines: snapshot.results.len(),
            total: money::format_amount(snapshot.grand_total()?),
            status: if snapshot.is_valid { "current" } else { "stale" },
            digest,
        })
    }
}

impl HistoryCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut session = settings.open_session();
        match self.action {
            None => self.list(&session, false),
            Some(HistoryAction::List { json }) => self.list(&session, json),
            Some(HistoryAction::Clear) => {
                session.update(|s| s.clear_history());
                println!("Snapshot history cleared");
                Ok(())
            }
            Some(HistoryAction::ClearCurrent) => {
                session.update(|s| s.clear_aggregation());
                println!("Current snapshot cleared");
                Ok(())
            }
        }
    }

    fn list(&self, session: &k2agg::session::Session, json: bool) -> anyhow::Result<()> {
        let aggregation = session.state().aggregation();
        if json {
            println!("{}", serde_json::to_string_pretty(aggregation)?);
            return Ok(());
        }

        let mut rows = Vec::new();
        if let Some(current) = aggregation.current() {
            rows.push(SnapshotRow::new("current".to_string(), current)?);
        }
        for (i, snapshot) in aggregation.history().iter().enumerate() {
            rows.push(SnapshotRow::new(format!("-{}", i + 1), snapshot)?);
        }
        if rows.is_empty() {
            println!("No snapshots yet");
        } else {
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
        Ok(())
    }
}

use clap::Args;
use k2agg::config::Settings;
use k2agg::core::money;

#[derive(Args, Debug)]
pub struct AggregateCommand {
    /// Tax year to stamp on the snapshot (defaults to the stored preference)
    #[arg(short, long)]
    year: Option<i32>,
}

impl AggregateCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut session = settings.open_session();
        let snapshot = session.update(|s| {
            if let Some(year) = self.year {
                s.set_tax_year(year);
            }
            s.generate_report().cloned()
        })?;

        println!("Snapshot {} (tax year {})", snapshot.id, snapshot.tax_year);
        println!("  Entities included: {}", snapshot.included_entity_ids.len());
        println!("  Lines:             {}", snapshot.results.len());
        println!("  Countries:         {}", snapshot.country_count());
        println!(
            "  Foreign total:     {}",
            money::format_amount(snapshot.grand_total()?)
        );
        println!("  Digest:            {}", snapshot.content_digest());
        if snapshot.included_entity_ids.is_empty() {
            println!();
            println!("No SUBMITTED entities; submit one with `k2agg entity submit`.");
        }
        Ok(())
    }
}

//! Demo command - seed sample entities for trying out the reports

use clap::Args;
use k2agg::config::Settings;
use k2agg::core::{AppState, ColumnKey, EntityStatus};

#[derive(Args, Debug)]
pub struct DemoCommand {
    /// Seed even when entities already exist
    #[arg(long)]
    force: bool,
}

struct DemoRow {
    line: u32,
    country: &'static str,
    /// Columns a..f
    amounts: [&'static str; 6],
    category: &'static str,
}

struct DemoEntity {
    name: &'static str,
    identifier: &'static str,
    submitted: bool,
    rows: &'static [DemoRow],
}

const fn row(
    line: u32,
    country: &'static str,
    amounts: [&'static str; 6],
    category: &'static str,
) -> DemoRow {
    DemoRow {
        line,
        country,
        amounts,
        category,
    }
}

const DEMO: &[DemoEntity] = &[
    DemoEntity {
        name: "Tech Solutions Inc.",
        identifier: "12-3456789",
        submitted: true,
        rows: &[
            row(1, "United States", ["1000000", "500000", "250000", "150000", "100000", "50000"], "TECH-A"),
            row(1, "China", ["0", "300000", "150000", "100000", "75000", "25000"], "TECH-B"),
            row(1, "United Kingdom", ["0", "200000", "100000", "75000", "50000", "15000"], "TECH-C"),
            row(1, "Germany", ["0", "180000", "90000", "60000", "40000", "12000"], "TECH-D"),
            row(2, "India", ["0", "420000", "210000", "80000", "35000", "9000"], "SVC-A"),
            row(5, "Japan", ["0", "64000.5", "12000", "0", "0", "1800.25"], ""),
            row(8, "Ireland", ["0", "880000", "0", "0", "0", "0"], "ROY-1"),
        ],
    },
    DemoEntity {
        name: "Global Enterprises LLC",
        identifier: "98-7654321",
        submitted: true,
        rows: &[
            row(1, "Germany", ["0", "220000", "110000", "45000", "30000", "8000"], "GLB-A"),
            row(1, "Mexico", ["0", "95000", "40000", "12000", "6000", "1500"], "GLB-B"),
            row(6, "Canada", ["0", "155000", "0", "0", "0", "0"], ""),
            row(8, "Ireland", ["0", "125000", "0", "0", "0", "0"], "ROY-2"),
        ],
    },
    DemoEntity {
        name: "Innovation Partners Corp",
        identifier: "45-6789012",
        submitted: true,
        rows: &[
            row(2, "India", ["0", "75000", "30000", "0", "0", "0"], ""),
            row(3, "France", ["0", "310000", "0", "0", "0", "25000"], "RE-1"),
            row(10, "Singapore", ["0", "0", "0", "540000", "0", "0"], ""),
        ],
    },
    DemoEntity {
        name: "Pacific Trade Holdings",
        identifier: "23-8901234",
        submitted: true,
        rows: &[
            row(1, "Japan", ["0", "410000", "120000", "60000", "20000", "5000"], "PAC-A"),
            row(1, "Australia", ["0", "260000", "80000", "30000", "10000", "2500"], "PAC-B"),
            row(5, "Singapore", ["0", "48000", "0", "0", "0", "0"], ""),
        ],
    },
    DemoEntity {
        name: "Atlantic Financial Group",
        identifier: "67-4321098",
        submitted: true,
        rows: &[
            row(5, "United Kingdom", ["0", "720000", "0", "0", "0", "0"], ""),
            row(6, "Netherlands", ["0", "330000", "0", "0", "0", "0"], ""),
            row(9, "Luxembourg", ["0", "0", "0", "0", "190000", "0"], "CG-ST"),
        ],
    },
    DemoEntity {
        name: "Beta Industries Ltd",
        identifier: "89-1122334",
        submitted: false,
        rows: &[
            row(1, "Brazil", ["0", "90000", "15000", "0", "0", "0"], ""),
            row(4, "Chile", ["0", "0", "0", "0", "0", "0"], ""),
        ],
    },
];

/// Add the sample entities to `state`. Returns how many were created.
pub fn seed(state: &mut AppState) -> anyhow::Result<usize> {
    for demo in DEMO {
        let id = state.create_entity(demo.name, demo.identifier)?;
        for r in demo.rows {
            let entry = state.add_country(id, r.line, r.country)?;
            for (key, value) in ColumnKey::AMOUNTS.into_iter().zip(r.amounts) {
                state.edit_column(id, r.line, entry, key, value)?;
            }
            if !r.category.is_empty() {
                state.edit_column(id, r.line, entry, ColumnKey::ECategory, r.category)?;
            }
        }
        if demo.submitted {
            state.set_entity_status(id, EntityStatus::Submitted);
        }
    }
    Ok(DEMO.len())
}

impl DemoCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let mut session = settings.open_session();
        if !session.state().entities().is_empty() && !self.force {
            anyhow::bail!("Entities already exist; pass --force to add the samples anyway.");
        }
        let created = session.update(seed)?;
        println!("Seeded {} sample entities", created);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn seeds_and_aggregates() {
        let mut state = AppState::new();
        assert_eq!(seed(&mut state).unwrap(), 6);
        assert_eq!(state.entities().len(), 6);

        let snapshot = state.generate_report().unwrap().clone();
        assert_eq!(snapshot.included_entity_ids.len(), 5);
        // Brazil only appears on the draft entity
        assert!(snapshot
            .results
            .iter()
            .all(|r| r.country_totals.iter().all(|ct| ct.country != "Brazil")));

        let germany = snapshot
            .result(1)
            .unwrap()
            .country_totals
            .iter()
            .find(|ct| ct.country == "Germany")
            .unwrap();
        // 382000 + 413000
        assert_eq!(germany.foreign_total, dec!(795000));

        let ireland = &snapshot.result(8).unwrap().country_totals;
        assert_eq!(ireland.len(), 1);
        assert_eq!(ireland[0].foreign_total, dec!(1005000));
    }

    #[test]
    fn seeding_twice_duplicates_entities() {
        let mut state = AppState::new();
        seed(&mut state).unwrap();
        seed(&mut state).unwrap();
        assert_eq!(state.entities().len(), 12);
    }
}

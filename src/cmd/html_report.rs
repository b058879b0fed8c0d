//! HTML report generation for an aggregation snapshot
//!
//! Generates a self-contained HTML file with embedded CSS/JS for filtering by
//! line and country.

use crate::cmd::report::{report_rows, ReportRow};
use clap::Args;
use k2agg::config::Settings;
use k2agg::core::{
    included_names, money, top_countries, AggregationSnapshot, Entity, MoneyError,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct HtmlCommand {
    /// Output file path (default: opens in browser)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl HtmlCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let session = settings.open_session();
        let state = session.state();
        let Some(snapshot) = state.aggregation().current() else {
            anyhow::bail!("No aggregation yet. Run `k2agg aggregate` first.");
        };

        let html = generate(snapshot, state.entities().entities())?;

        if let Some(ref output_path) = self.output {
            std::fs::write(output_path, &html)?;
            println!("HTML report written to: {}", output_path.display());
        } else {
            let temp_path = std::env::temp_dir().join("k2agg-report.html");
            std::fs::write(&temp_path, &html)?;
            opener::open(&temp_path)?;
            println!("Opened HTML report in browser: {}", temp_path.display());
        }

        Ok(())
    }
}

/// Data embedded in the page as JSON
#[derive(Serialize)]
struct HtmlReportData {
    tax_year: i32,
    generated_at: String,
    is_valid: bool,
    digest: String,
    entities: Vec<String>,
    rows: Vec<ReportRow>,
    top: Vec<TopEntry>,
    grand_total: String,
}

#[derive(Serialize)]
struct TopEntry {
    country: String,
    total: String,
}

fn build_report_data<'a>(
    snapshot: &AggregationSnapshot,
    entities: impl IntoIterator<Item = &'a Entity>,
) -> Result<HtmlReportData, MoneyError> {
    Ok(HtmlReportData {
        tax_year: snapshot.tax_year,
        generated_at: snapshot
            .generated_at
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        is_valid: snapshot.is_valid,
        digest: snapshot.content_digest(),
        entities: included_names(snapshot, entities),
        rows: report_rows(snapshot),
        top: top_countries(snapshot, 10)?
            .into_iter()
            .map(|c| TopEntry {
                country: c.country,
                total: money::format_amount(c.total),
            })
            .collect(),
        grand_total: money::format_amount(snapshot.grand_total()?),
    })
}

pub fn generate<'a>(
    snapshot: &AggregationSnapshot,
    entities: impl IntoIterator<Item = &'a Entity>,
) -> Result<String, MoneyError> {
    let data = build_report_data(snapshot, entities)?;
    // keep the payload from closing the script element
    let json_data = serde_json::to_string(&data)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Schedule K-2 Part II Aggregation {year}</title>
    <style>
{css}
    </style>
</head>
<body>
    <header>
        <h1>Schedule K-2 Part II Aggregation</h1>
        <p class="meta" id="meta"></p>
        <p class="stale" id="stale" hidden>Entity data changed after this snapshot was generated.</p>
        <div class="filters">
            <div class="filter-group">
                <label for="line-filter">Line</label>
                <select id="line-filter" onchange="applyFilters()">
                    <option value="">All lines</option>
                </select>
            </div>
            <div class="filter-group">
                <label for="country-search">Country</label>
                <input type="text" id="country-search" placeholder="Search countries..." oninput="applyFilters()">
            </div>
        </div>
    </header>
    <main>
        <section>
            <h2>Foreign-source totals</h2>
            <table>
                <thead><tr><th>Line</th><th>Description</th><th>Country</th><th class="num">Foreign Total</th></tr></thead>
                <tbody id="rows"></tbody>
                <tfoot><tr><td colspan="3">Total</td><td class="num" id="total"></td></tr></tfoot>
            </table>
        </section>
        <section>
            <h2>Top countries</h2>
            <table>
                <thead><tr><th>#</th><th>Country</th><th class="num">Total</th></tr></thead>
                <tbody id="top"></tbody>
            </table>
        </section>
        <footer id="digest"></footer>
    </main>
    <script>
const DATA = {json};
{js}
    </script>
</body>
</html>
"##,
        year = snapshot.tax_year,
        css = CSS,
        json = json_data,
        js = JS,
    ))
}

const CSS: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; margin: 0; color: #1f2933; }
header { background: #f5f7fa; padding: 1.5rem 2rem; border-bottom: 1px solid #d9e2ec; }
h1 { margin: 0 0 0.5rem; font-size: 1.5rem; }
h2 { font-size: 1.1rem; }
main { padding: 1rem 2rem; }
.meta { color: #52606d; margin: 0; }
.stale { color: #b44d12; font-weight: 600; }
.filters { display: flex; gap: 1.5rem; margin-top: 1rem; }
.filter-group { display: flex; flex-direction: column; gap: 0.25rem; }
table { border-collapse: collapse; width: 100%; margin-bottom: 2rem; }
th, td { padding: 0.4rem 0.75rem; border-bottom: 1px solid #e4e7eb; text-align: left; }
th { background: #f0f4f8; }
.num { text-align: right; font-variant-numeric: tabular-nums; }
tfoot td { font-weight: 600; }
footer { color: #7b8794; font-size: 0.8rem; }
"#;

const JS: &str = r#"
function el(tag, text, cls) {
    const e = document.createElement(tag);
    e.textContent = text;
    if (cls) e.className = cls;
    return e;
}

function sum(values) {
    // totals are strings with 4 fraction digits; sum in ten-thousandths
    let total = 0n;
    for (const v of values) {
        const neg = v.startsWith('-');
        const [i, f = ''] = v.replace('-', '').split('.');
        const units = BigInt(i || '0') * 10000n + BigInt((f + '0000').slice(0, 4));
        total += neg ? -units : units;
    }
    const neg = total < 0n;
    const abs = neg ? -total : total;
    const frac = (abs % 10000n).toString().padStart(4, '0');
    return (neg ? '-' : '') + (abs / 10000n).toString() + '.' + frac;
}

function applyFilters() {
    const line = document.getElementById('line-filter').value;
    const query = document.getElementById('country-search').value.toLowerCase();
    const rows = DATA.rows.filter(r =>
        (!line || String(r.line_number) === line) &&
        (!query || r.country.toLowerCase().includes(query)));
    const body = document.getElementById('rows');
    body.replaceChildren();
    for (const r of rows) {
        const tr = document.createElement('tr');
        tr.append(el('td', r.line_number), el('td', r.description), el('td', r.country),
            el('td', r.foreign_source_total, 'num'));
        body.append(tr);
    }
    document.getElementById('total').textContent = sum(rows.map(r => r.foreign_source_total));
}

function init() {
    document.getElementById('meta').textContent =
        'Tax year ' + DATA.tax_year + ' · generated ' + DATA.generated_at +
        ' · entities: ' + (DATA.entities.length ? DATA.entities.join(', ') : 'none');
    document.getElementById('stale').hidden = DATA.is_valid;
    document.getElementById('digest').textContent = 'Digest ' + DATA.digest;

    const select = document.getElementById('line-filter');
    const lines = [...new Set(DATA.rows.map(r => r.line_number))];
    for (const n of lines) {
        const opt = el('option', 'Line ' + n);
        opt.value = String(n);
        select.append(opt);
    }

    const top = document.getElementById('top');
    DATA.top.forEach((c, i) => {
        const tr = document.createElement('tr');
        tr.append(el('td', i + 1), el('td', c.country), el('td', c.total, 'num'));
        top.append(tr);
    });
    applyFilters();
}

init();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use k2agg::core::{AppState, ColumnKey, EntityStatus};

    #[test]
    fn page_embeds_rows_and_escapes_script_close() {
        let mut state = AppState::new();
        let id = state.create_entity("Acme", "1").unwrap();
        state.set_entity_status(id, EntityStatus::Submitted);
        let entry = state.add_country(id, 5, "</script>Land").unwrap();
        state.edit_column(id, 5, entry, ColumnKey::C, "12").unwrap();
        let snapshot = state.generate_report().unwrap().clone();

        let html = generate(&snapshot, state.entities().entities()).unwrap();
        assert!(html.contains("Interest income"));
        assert!(html.contains("12.0000"));
        assert!(html.contains("<\\/script>Land"));
        assert_eq!(html.matches("</script>").count(), 1);
    }
}

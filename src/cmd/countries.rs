use clap::Args;
use k2agg::config::Settings;

#[derive(Args, Debug)]
pub struct CountriesCommand {
    /// Only names containing this text (case-insensitive)
    #[arg(short, long)]
    search: Option<String>,

    /// Drop the cached list and fetch again
    #[arg(long)]
    refresh: bool,

    /// Output as JSON with ISO codes
    #[arg(long)]
    json: bool,
}

impl CountriesCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        let catalog = settings.country_catalog();
        if self.refresh {
            catalog.clear_cache();
        }
        let mut countries = catalog.countries();
        if let Some(search) = &self.search {
            let search = search.to_lowercase();
            countries.retain(|c| c.name.to_lowercase().contains(&search));
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&countries)?);
        } else {
            for country in &countries {
                println!("{:4} {}", country.code, country.name);
            }
        }
        Ok(())
    }
}

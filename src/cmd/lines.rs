use clap::Args;
use k2agg::core::PART_II_LINES;
use tabled::{builder::Builder, settings::Style};

#[derive(Args, Debug)]
pub struct LinesCommand {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl LinesCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(PART_II_LINES)?);
            return Ok(());
        }
        let mut builder = Builder::default();
        builder.push_record(["Line", "Description"]);
        for line in PART_II_LINES {
            builder.push_record([line.line_number.to_string(), line.description.to_string()]);
        }
        println!("{}", builder.build().with(Style::rounded()));
        Ok(())
    }
}

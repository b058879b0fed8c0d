//! Schema command - print the stored state format or report CSV columns

use crate::cmd::report::ReportRow;
use clap::Args;
use k2agg::core::AppState;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema, csv-header or csv-fields
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema of the stored application state
    JsonSchema,
    /// CSV header row of the aggregation report
    CsvHeader,
    /// Aggregation report CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(AppState);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => println!("{}", ReportRow::csv_header().join(",")),
            SchemaFormat::CsvFields => {
                println!("Aggregation Report CSV");
                println!("======================");
                println!();
                for field in ReportRow::csv_schema() {
                    let req = if field.required { "required" } else { "optional" };
                    println!("{:22} ({:8})  {}", field.name, req, field.description);
                }
                println!();
                println!("Amounts carry exactly four decimal places.");
            }
        }
        Ok(())
    }
}

//! Runtime settings, from global command line flags with environment
//! fallbacks.

use crate::core::warnings::{ScanOptions, DEFAULT_LARGE_VALUE_THRESHOLD};
use crate::countries::{CountryCatalog, RestCountries};
use crate::session::Session;
use crate::store::persist::DEFAULT_DEBOUNCE;
use crate::store::{ChangeBus, FileStore, KeyValueStore};
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = ".k2agg";

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Directory holding the stored state
    #[arg(long, global = true, env = "K2AGG_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Save debounce window in milliseconds
    #[arg(long, global = true, env = "K2AGG_DEBOUNCE_MS")]
    pub debounce_ms: Option<u64>,

    /// Never fetch reference data over the network
    #[arg(long, global = true, env = "K2AGG_OFFLINE")]
    pub offline: bool,

    /// Magnitude above which an amount is flagged as unusually large
    #[arg(long, global = true, env = "K2AGG_LARGE_VALUE")]
    pub large_value: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub debounce: Duration,
    pub offline: bool,
    pub large_value_threshold: Decimal,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(&GlobalArgs::default())
    }
}

impl From<&GlobalArgs> for Settings {
    fn from(args: &GlobalArgs) -> Self {
        Settings {
            data_dir: args
                .data_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            debounce: args
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_DEBOUNCE),
            offline: args.offline,
            large_value_threshold: args
                .large_value
                .unwrap_or(DEFAULT_LARGE_VALUE_THRESHOLD),
        }
    }
}

impl Settings {
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::new(FileStore::new(&self.data_dir))
    }

    pub fn open_session(&self) -> Session {
        log::debug!("opening session in {}", self.data_dir.display());
        Session::open(self.store(), &ChangeBus::new(), self.debounce)
    }

    pub fn country_catalog(&self) -> CountryCatalog {
        let source = RestCountries::new(Duration::from_secs(10));
        CountryCatalog::new(self.store(), Box::new(source)).offline(self.offline)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            large_value_threshold: self.large_value_threshold,
        }
    }
}

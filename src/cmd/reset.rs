use clap::Args;
use k2agg::config::Settings;

#[derive(Args, Debug)]
pub struct ResetCommand {
    /// Required; there is no undo
    #[arg(long)]
    yes: bool,
}

impl ResetCommand {
    pub fn exec(&self, settings: &Settings) -> anyhow::Result<()> {
        if !self.yes {
            anyhow::bail!("This deletes all entities, snapshots and cached data. Re-run with --yes.");
        }
        let mut session = settings.open_session();
        session.reset()?;
        println!("All stored data removed from {}", settings.data_dir.display());
        Ok(())
    }
}

pub mod bundle;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle asset bundles
    Bundle {
        #[command(subcommand)]
        command: bundle::BundleCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Bundle { command } => command.handle(),
        }
    }
}

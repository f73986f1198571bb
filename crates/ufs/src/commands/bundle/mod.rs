use clap::{Args, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use std::{fs::File, io::BufReader, path::PathBuf};
use ufs_bundle::{ArchiveOptions, BlockLayout, BundleArchive};

pub mod dump;
pub mod extract;
pub mod list;
pub mod schema;

#[derive(clap::Subcommand)]
pub enum BundleCommands {
    /// List the members and objects of a bundle
    List(list::ListArgs),
    /// Extract every member of a bundle into a directory
    Extract(extract::ExtractArgs),
    /// Decode objects of a bundle as JSON
    Dump(dump::DumpArgs),
    /// Print the type trees embedded in a bundle
    Schema(schema::SchemaArgs),
}

impl BundleCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            BundleCommands::List(list) => list.handle(),
            BundleCommands::Extract(extract) => extract.handle(),
            BundleCommands::Dump(dump) => dump.handle(),
            BundleCommands::Schema(schema) => schema.handle(),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Layout {
    /// Slice members out of the concatenated blocks
    #[default]
    Contiguous,
    /// Read block `i` as member `i`
    PerBlock,
}

impl From<Layout> for BlockLayout {
    fn from(value: Layout) -> Self {
        match value {
            Layout::Contiguous => BlockLayout::Contiguous,
            Layout::PerBlock => BlockLayout::PerBlock,
        }
    }
}

/// Arguments shared by every bundle command
#[derive(Args)]
pub struct BundleArgs {
    /// An input bundle file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// How blocks map onto members
    #[arg(long, value_enum, default_value_t)]
    layout: Layout,
}

impl BundleArgs {
    pub fn open(&self) -> Result<BundleArchive> {
        let f = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;

        let options = ArchiveOptions::builder().layout(self.layout.into()).build();
        BundleArchive::open_with_options(BufReader::new(f), options)
            .context(format!("reading {}", &self.file.display()))
    }
}

use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{fs::File, io::Write, path::Path};
use tracing::info;

use super::BundleArgs;

#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    bundle: BundleArgs,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: std::path::PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let bundle = self.bundle.open()?;

        std::fs::create_dir_all(&self.directory)
            .into_diagnostic()
            .context(format!("creating {}", &self.directory.display()))?;

        for asset in bundle.assets() {
            let file_name = Path::new(asset.name())
                .file_name()
                .ok_or_else(|| miette!("member {:?} has no usable file name", asset.name()))?;
            let p = self.directory.join(file_name);
            info!("writing {}", p.display());

            let mut out = if !self.overwrite {
                File::create_new(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            } else {
                File::create(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            };

            out.write_all(asset.raw()).into_diagnostic()?;
        }
        Ok(())
    }
}

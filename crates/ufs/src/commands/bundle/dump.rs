use clap::Args;
use miette::{IntoDiagnostic, Result};
use std::io::Write;
use tracing::warn;
use ufs_bundle::error::ErrorKind;

use super::BundleArgs;

#[derive(Args)]
pub struct DumpArgs {
    #[command(flatten)]
    bundle: BundleArgs,

    /// Only dump objects of this member
    #[arg(short, long)]
    member: Option<String>,

    /// Only dump objects of these class ids
    #[arg(short, long = "class")]
    class_ids: Vec<i32>,

    /// Only dump objects with these path ids
    #[arg(short, long = "path-id", allow_negative_numbers = true)]
    path_ids: Vec<i64>,

    /// Pretty print the output
    #[arg(long, default_value_t = false)]
    pretty: bool,
}

impl DumpArgs {
    fn wanted(&self, class_id: i32, path_id: i64) -> bool {
        (self.class_ids.is_empty() || self.class_ids.contains(&class_id))
            && (self.path_ids.is_empty() || self.path_ids.contains(&path_id))
    }

    pub fn handle(&self) -> Result<()> {
        let bundle = self.bundle.open()?;
        let assets = match &self.member {
            Some(name) => vec![bundle.by_name(name)?],
            None => bundle.assets().filter(|a| !a.is_resource()).collect(),
        };

        let mut stdout = std::io::stdout().lock();
        for asset in assets {
            for info in asset.objects().filter(|i| self.wanted(i.class_id, i.path_id)) {
                let value = match asset.read_object(info.path_id) {
                    Ok(value) => value,
                    Err(e) if e.kind() == ErrorKind::UnresolvedReference => {
                        warn!(member = asset.name(), path_id = info.path_id, "skipping: {e}");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

                let entry = serde_json::json!({
                    "member": asset.name(),
                    "path_id": info.path_id,
                    "class_id": info.class_id,
                    "type": info.type_name(),
                    "value": serde_json::to_value(&value).into_diagnostic()?,
                });
                if self.pretty {
                    serde_json::to_writer_pretty(&mut stdout, &entry).into_diagnostic()?;
                } else {
                    serde_json::to_writer(&mut stdout, &entry).into_diagnostic()?;
                }
                writeln!(stdout).into_diagnostic()?;
            }
        }

        Ok(())
    }
}

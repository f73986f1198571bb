use clap::Args;
use miette::Result;
use owo_colors::{OwoColorize, Stream::Stdout};

use super::BundleArgs;

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    bundle: BundleArgs,

    /// Also list the objects of each member
    #[arg(short, long, default_value_t = false)]
    objects: bool,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let bundle = self.bundle.open()?;

        println!(
            "{} {} ({}, engine {})",
            bundle.signature(),
            bundle.format_version(),
            bundle.player_version(),
            bundle.engine_version()
        );

        for asset in bundle.assets() {
            let asset_name = asset.name();
            let name = asset_name.if_supports_color(Stdout, |n| n.bold());
            if asset.is_resource() {
                println!("{name}  resource, {} bytes", asset.raw().len());
                continue;
            }

            println!(
                "{name}  format {}, {} objects, {} external refs",
                asset.format(),
                asset.object_count(),
                asset.references().len()
            );

            if !self.objects {
                continue;
            }

            for info in asset.objects() {
                let raw_type_name = info.type_name();
                let raw_type_name = raw_type_name.unwrap_or("<no type tree>");
                let type_name = raw_type_name.if_supports_color(Stdout, |t| t.cyan());
                println!(
                    "  {:>20} class {:>6} {type_name} ({} bytes)",
                    info.path_id, info.class_id, info.size
                );
            }
        }

        Ok(())
    }
}

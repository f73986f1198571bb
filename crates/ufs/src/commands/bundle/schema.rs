use clap::Args;
use miette::{IntoDiagnostic, Result};

use super::BundleArgs;

#[derive(Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    bundle: BundleArgs,

    /// Only print this class id
    #[arg(short, long = "class", allow_negative_numbers = true)]
    class_id: Option<i32>,

    /// Print the trees as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl SchemaArgs {
    pub fn handle(&self) -> Result<()> {
        let bundle = self.bundle.open()?;

        for asset in bundle.assets() {
            let Some(metadata) = asset.type_metadata() else {
                continue;
            };

            let mut trees = metadata
                .type_trees()
                .filter(|(id, _)| self.class_id.map_or(true, |c| c == *id))
                .collect::<Vec<_>>();
            trees.sort_by_key(|(id, _)| *id);

            println!("# {} ({})", asset.name(), metadata.generator_version);
            for (class_id, tree) in trees {
                if self.json {
                    println!("{}", serde_json::to_string(&tree).into_diagnostic()?);
                } else {
                    println!("// class {class_id}");
                    print!("{tree}");
                }
            }
        }

        Ok(())
    }
}

use anyhow::Result;
use clap::Args;

use crate::config::AppConfig;

#[derive(Args)]
pub struct ListArgs {
    /// Print names as a JSON array
    #[arg(long)]
    json: bool,
}

pub async fn run(args: ListArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let store = config.open_store()?;
    let names = store.list_all().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else if names.is_empty() {
        println!("No images stored.");
    } else {
        for name in &names {
            println!("{name}");
        }
    }
    Ok(())
}

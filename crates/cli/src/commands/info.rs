use anyhow::Result;
use clap::Args;

use crate::config::AppConfig;

#[derive(Args)]
pub struct InfoArgs {
    /// Stored names to describe
    #[arg(required = true)]
    names: Vec<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: InfoArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let store = config.open_store()?;
    let infos = store.info_multiple(&args.names).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("{:<44} {:<8} {:>10} {:<20}", "NAME", "EXISTS", "SIZE", "TYPE");
    println!("{}", "-".repeat(85));
    for info in &infos {
        println!(
            "{:<44} {:<8} {:>10} {:<20}",
            info.name,
            if info.exists { "yes" } else { "no" },
            info.size.map(format_bytes).unwrap_or_else(|| "-".into()),
            info.content_type.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

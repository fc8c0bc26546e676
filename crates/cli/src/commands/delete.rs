use anyhow::Result;
use clap::Args;
use console::style;
use dialoguer::Confirm;

use imgstore_core::BatchSummary;

use crate::config::AppConfig;

#[derive(Args)]
pub struct DeleteArgs {
    /// Stored names to delete
    #[arg(required = true)]
    names: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
}

pub async fn run(args: DeleteArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let store = config.open_store()?;

    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete {} image(s)?",
                args.names.len()
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    if let [name] = args.names.as_slice() {
        store.delete(name).await?;
        println!("Deleted {name}");
        return Ok(());
    }

    let results = store.delete_multiple(&args.names).await;
    let mut printed = std::collections::HashSet::new();
    for name in &args.names {
        if !printed.insert(name.as_str()) {
            continue;
        }
        if results.get(name).copied().unwrap_or(false) {
            println!("{} {name}", style("deleted").green());
        } else {
            println!("{} {name}", style("not found").yellow());
        }
    }

    let summary = BatchSummary::from_deletes(&results);
    println!(
        "\n{} images: {} deleted, {} failed",
        summary.total, summary.succeeded, summary.failed
    );
    Ok(())
}

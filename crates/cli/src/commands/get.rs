use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Args;
use console::style;

use crate::config::AppConfig;

#[derive(Args)]
pub struct GetArgs {
    /// Stored names to download
    #[arg(required = true)]
    names: Vec<String>,

    /// Directory to write the images into
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

async fn write_image(out: &Path, name: &str, data: &Bytes) -> Result<()> {
    let path = out.join(name);
    tokio::fs::write(&path, data)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

pub async fn run(args: GetArgs) -> Result<()> {
    let config = AppConfig::load()?;
    let store = config.open_store()?;
    tokio::fs::create_dir_all(&args.out).await?;

    if let [name] = args.names.as_slice() {
        let data = store.load(name).await?;
        write_image(&args.out, name, &data).await?;
        println!("Saved {name} ({} bytes)", data.len());
        return Ok(());
    }

    let mut loaded = store.load_multiple(&args.names).await;
    let requested = loaded.len();
    let mut saved = 0usize;
    for name in &args.names {
        // Duplicates collapse to one entry; print each name once.
        let Some(entry) = loaded.remove(name) else {
            continue;
        };
        match entry {
            Some(data) => {
                write_image(&args.out, name, &data).await?;
                saved += 1;
                println!("{} {name} ({} bytes)", style("saved").green(), data.len());
            }
            None => println!("{} {name}", style("missing").yellow()),
        }
    }
    println!(
        "\nSaved {saved} of {requested} images to {}",
        args.out.display()
    );

    if saved == 0 {
        anyhow::bail!("none of the requested images exist");
    }
    Ok(())
}

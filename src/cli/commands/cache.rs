//! Cache command - manage the component store

use crate::cache::{CacheKey, ComponentEntry, ComponentStore, LocalComponentStore};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::KilnResult;
use console::style;
use std::io::{self, Write};
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> KilnResult<()> {
    let store = LocalComponentStore::new(ConfigManager::store_dir(config));

    match args.action {
        CacheAction::List { format } => list_components(&store, format).await,
        CacheAction::Path => {
            println!("{}", store.root().display());
            Ok(())
        }
        CacheAction::Remove { key } => remove_component(&store, &key).await,
        CacheAction::Clear { yes } => clear_components(&store, yes).await,
    }
}

/// List all published components
async fn list_components(store: &LocalComponentStore, format: OutputFormat) -> KilnResult<()> {
    let entries = store.list().await?;

    if entries.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            _ => println!("No cached components found."),
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_table(entries: &[ComponentEntry]) {
    let width = entries
        .iter()
        .map(|e| e.key.len())
        .max()
        .unwrap_or(0)
        .max(3);

    println!("{:<width$}  {:<6}  {:<16}", "KEY", "FILES", "DEFINED");
    println!("{}", "-".repeat(width + 26));

    for entry in entries {
        println!(
            "{:<width$}  {:<6}  {:<16}",
            entry.key,
            entry.files.len(),
            entry.defined_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("Total: {} component(s)", entries.len());
}

async fn remove_component(store: &LocalComponentStore, key: &str) -> KilnResult<()> {
    let key = CacheKey::parse(key)?;
    if store.remove(&key).await? {
        println!("{} removed {}", style("✓").green(), key);
    } else {
        println!("No cached component named {}", key);
    }
    Ok(())
}

/// Remove every published component
async fn clear_components(store: &LocalComponentStore, skip_confirm: bool) -> KilnResult<()> {
    let entries = store.list().await?;

    if entries.is_empty() {
        println!("No cached components to clear.");
        return Ok(());
    }

    println!("This will remove {} cached component(s):", entries.len());
    for entry in &entries {
        println!("  {} {}", style("•").red(), entry.key);
    }
    println!();

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let mut removed = 0;
    for entry in entries {
        debug!("Removing component: {}", entry.key);
        if store.remove(&CacheKey::parse(&entry.key)?).await? {
            removed += 1;
        }
    }

    println!("{} cleared {} component(s)", style("✓").green(), removed);

    Ok(())
}

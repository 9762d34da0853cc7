//! Catalog maintenance subcommands: list, delete, wipe, send.

use anyhow::{bail, Context, Result};

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::operator::{ConsoleOperator, Operator};
use crate::transport::{TcpTransport, Transport};

/// Prints every cataloged command.
pub fn list() -> Result<()> {
    let config = Config::load()?;
    let store = CatalogStore::load(&config.catalog_path)?;

    if store.is_empty() {
        println!("Catalog is empty ({}).", config.catalog_path.display());
        return Ok(());
    }

    println!("{} commands in {}:", store.len(), config.catalog_path.display());
    for (name, entry) in store.list() {
        let mark = if entry.verified { "verified" } else { "unverified" };
        println!("\n  {name}  [{mark}, captured {}]", entry.captured_at.format("%Y-%m-%d %H:%M"));
        println!("    on : {}", entry.on);
        match &entry.off {
            Some(off) => println!("    off: {off}"),
            None => println!("    off: -"),
        }
    }
    Ok(())
}

/// Deletes one command after a y/n confirmation.
pub fn delete(name: &str) -> Result<()> {
    let config = Config::load()?;
    let mut store = CatalogStore::load(&config.catalog_path)?;
    if !store.contains(name) {
        bail!("no command named {name:?} in the catalog");
    }

    let mut operator = ConsoleOperator::new();
    if !operator.confirm(&format!("Delete {name:?}?"))? {
        println!("Nothing deleted.");
        return Ok(());
    }
    store.delete(name)?;
    println!("Deleted {name:?}.");
    Ok(())
}

/// Erases the whole catalog.
///
/// Deliberately harder than [`delete`]: the operator must type the word
/// `WIPE` verbatim, not just answer y/n.
pub fn wipe() -> Result<()> {
    let config = Config::load()?;
    let mut store = CatalogStore::load(&config.catalog_path)?;
    if store.is_empty() {
        println!("Catalog is already empty.");
        return Ok(());
    }

    println!(
        "This erases all {} commands in {}.",
        store.len(),
        config.catalog_path.display()
    );
    let answer = prompt_line("Type WIPE to proceed: ")?;
    if answer != "WIPE" {
        println!("Catalog left untouched.");
        return Ok(());
    }
    store.wipe()?;
    println!("Catalog wiped.");
    Ok(())
}

/// Replays a cataloged command on the bus.
pub fn send(host: &str, port: u16, name: &str, off: bool) -> Result<()> {
    let config = Config::load()?;
    let store = CatalogStore::load(&config.catalog_path)?;
    let entry = store
        .get(name)
        .with_context(|| format!("no command named {name:?} in the catalog"))?;
    let (on_frame, off_frame) = entry.frames()?;

    let frame = if off {
        off_frame.with_context(|| format!("{name:?} has no OFF frame"))?
    } else {
        on_frame
    };

    let mut transport = TcpTransport::connect(host, port)?;
    println!("Transmitting: {frame}");
    transport.write_all(frame.as_bytes())?;
    println!("Sent.");
    Ok(())
}

fn prompt_line(prompt: &str) -> Result<String> {
    use std::io::{BufRead, Write};
    print!("{prompt}");
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

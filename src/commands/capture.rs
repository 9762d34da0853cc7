//! Interactive capture subcommand.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::operator::{ConsoleOperator, Operator};
use crate::session::{SessionOutcome, SessionRunner, SessionSettings};
use crate::transport::TcpTransport;

/// Runs one capture session for `name` and, on validation, upserts the
/// resulting entry into the catalog.
///
/// If `name` already exists the operator must confirm the overwrite before
/// the bridge is even contacted; declining leaves catalog and session
/// untouched.
pub fn run(
    host: &str,
    port: u16,
    name: &str,
    paired: bool,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    let config = Config::load()?;
    let mut catalog = CatalogStore::load(&config.catalog_path)?;
    let mut operator = ConsoleOperator::new();

    if catalog.contains(name)
        && !operator.confirm(&format!("{name:?} is already cataloged. Overwrite it?"))?
    {
        println!("Keeping the existing entry.");
        return Ok(());
    }

    let mut transport = TcpTransport::connect(host, port)?;
    let settings = SessionSettings::from(&config);
    let mut runner = SessionRunner::new(&mut transport, &mut operator, settings, cancel);

    let outcome = if paired {
        runner.run_paired(name)?
    } else {
        runner.run_single(name)?
    };

    match outcome {
        SessionOutcome::Validated(entry) => {
            catalog.upsert(name, entry)?;
            println!(
                "Saved {name:?} to {} ({} commands cataloged).",
                config.catalog_path.display(),
                catalog.len()
            );
        }
        SessionOutcome::Abandoned => {
            println!("Session abandoned; catalog unchanged.");
        }
    }
    Ok(())
}

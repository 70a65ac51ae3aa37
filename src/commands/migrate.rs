use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::batch::{self, BatchOptions};
use crate::config;
use crate::module::find_module_root;
use crate::notify::ConsoleSink;
use crate::status::StatusTracker;

/// Migrate synthetics to view binding in the target file or directory.
/// Flags win over `rebind.toml` at the module root.
pub fn execute(
    target: &str,
    package: Option<String>,
    include_subdirs: bool,
    mask: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let start = Instant::now();
    let target = PathBuf::from(target);

    let config = match find_module_root(&target) {
        Some(module) => config::load_config(&module)?.unwrap_or_default(),
        None => config::Config::default(),
    };

    let mask = mask
        .or_else(|| config.batch.mask.clone())
        .map(|m| Regex::new(&m).with_context(|| format!("Invalid mask pattern: {}", m)))
        .transpose()?;

    let options = BatchOptions {
        package_override: package.or_else(|| config.project.package.clone()),
        helper_package: config.project.helper_package.clone(),
        include_subdirs: include_subdirs || config.batch.include_subdirs,
        mask,
        dry_run,
        collapse_threshold: config.project.collapse_threshold,
    };

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))
            .context("Failed to install interrupt handler")?;
    }

    let tracker = StatusTracker::new();
    let summary = batch::run(&target, &options, &tracker, &ConsoleSink, &cancel)?;

    if summary.failed > 0 {
        anyhow::bail!("Migration finished with {} failed file(s)", summary.failed);
    }

    let elapsed = start.elapsed();
    println!(
        "   {} {} file(s) in {:.2}s",
        "Migrated".green().bold(),
        summary.migrated,
        elapsed.as_secs_f64()
    );
    Ok(())
}

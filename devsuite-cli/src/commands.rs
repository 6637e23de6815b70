//! Command implementations.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use devsuite_core::{
    detection_channel, ConfirmController, Database, DetectionEvent, InstallEnv, InstallReport,
    InstallerData, ItemKey, LogProgress, Platform, ProgressSink, Settings,
};
use indicatif::MultiProgress;

use crate::progress::BarProgress;

/// Open the settings store, creating it on first use.
pub fn open_settings() -> Result<(Database, Settings)> {
    let mut db = Database::open().context("Failed to open settings database")?;
    db.migrate().context("Failed to migrate settings database")?;
    let settings = Settings::load(&db);
    Ok((db, settings))
}

fn controller(settings: &Settings) -> Result<ConfirmController> {
    let platform = Platform::detect().context("This platform is not supported")?;
    tracing::info!(?platform, "Detected platform");

    let env = InstallEnv::from_settings(settings, platform);
    Ok(ConfirmController::new(
        InstallerData::new(env),
        settings.detection_timeout(),
    ))
}

/// Auto-detect, then check each folder given on the command line.
async fn run_detection(
    controller: &mut ConfirmController,
    paths: &[(ItemKey, PathBuf)],
) -> Result<()> {
    let (tx, mut rx) = detection_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                DetectionEvent::Started(key) => eprintln!("Checking {}...", key),
                DetectionEvent::CheckComplete(done) if !done.found => {
                    eprintln!("  {} not found", done.key)
                }
                DetectionEvent::CheckComplete(_) | DetectionEvent::Finished => {}
            }
        }
    });

    controller.set_events(Some(tx));
    controller.detect_all().await;
    for (key, dir) in paths {
        let done = controller.select_item(*key, Some(dir.clone())).await?;
        if !done.found {
            eprintln!("  {} is not usable at {}", key, dir.display());
        }
    }
    controller.set_events(None);

    printer.await.context("Detection printer panicked")?;
    Ok(())
}

fn print_summary(controller: &ConfirmController) {
    println!();
    println!("{:<34} {:<10} {:<10} {}", "ITEM", "SELECTED", "STATUS", "LOCATION");
    for item in controller.data().all() {
        let state = item.state();
        let key = state.key;
        let status = if state.existing_install {
            "installed"
        } else if controller.is_configured(key) {
            "ok"
        } else {
            "missing"
        };
        let location = controller
            .item_root(key)
            .unwrap_or_else(|| controller.data().paths().item_dir(key));
        println!(
            "{:<34} {:<10} {:<10} {}",
            format!("{} {} ({})", state.display_name, state.version, key),
            if state.selected { "yes" } else { "no" },
            status,
            location.display()
        );
    }

    let missing = controller.missing_items();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(ItemKey::as_str).collect();
        println!();
        println!("Not configured: {}", names.join(", "));
    }
}

fn ask(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_report(report: &InstallReport) {
    println!();
    for outcome in &report.outcomes {
        let took = outcome.finished_at - outcome.started_at;
        match &outcome.error {
            None => println!(
                "  {} complete ({}s){}",
                outcome.key,
                took.num_seconds(),
                outcome
                    .installed_at
                    .as_ref()
                    .map(|p| format!(" at {}", p.display()))
                    .unwrap_or_default()
            ),
            Some(error) => println!("  {} failed: {}", outcome.key, error),
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

pub async fn cmd_detect(settings: &Settings, paths: &[(ItemKey, PathBuf)]) -> Result<()> {
    let mut controller = controller(settings)?;
    run_detection(&mut controller, paths).await?;
    print_summary(&controller);
    Ok(())
}

pub async fn cmd_install(
    settings: &Settings,
    select: &[ItemKey],
    deselect: &[ItemKey],
    paths: &[(ItemKey, PathBuf)],
    yes: bool,
) -> Result<()> {
    let mut controller = controller(settings)?;
    run_detection(&mut controller, paths).await?;

    for key in deselect {
        controller.set_selected(*key, false)?;
    }
    for key in select {
        controller.set_selected(*key, true)?;
    }

    print_summary(&controller);
    if !yes && !ask("Install the selected items?")? {
        println!("Cancelled.");
        return Ok(());
    }

    controller.confirm()?;
    let mut data = controller.into_data();

    // Bars only make sense on a terminal; otherwise progress goes to the log
    let interactive = io::stderr().is_terminal();
    let multi = MultiProgress::new();
    let report = data
        .install_all(|state| -> Box<dyn ProgressSink> {
            if interactive {
                Box::new(BarProgress::new(&multi, state))
            } else {
                Box::new(LogProgress::new(state.key))
            }
        })
        .await;
    print_report(&report);

    if !report.succeeded() {
        let failed: Vec<&str> = report.failures().map(|o| o.key.as_str()).collect();
        bail!("Installation failed for: {}", failed.join(", "));
    }
    println!("Development Suite installed to {}", data.paths().install_dir.display());
    Ok(())
}

pub fn cmd_settings_show(db: &Database, settings: &Settings) -> Result<()> {
    println!("# {}", db.path().display());
    println!("{}", serde_json::to_string_pretty(settings)?);
    println!();
    println!("install_root (effective): {}", settings.install_root().display());
    println!("temp_dir (effective):     {}", settings.temp_dir().display());
    println!("bundle_dir (effective):   {}", settings.bundle_dir().display());
    Ok(())
}

pub fn cmd_settings_set(db: &Database, settings: &mut Settings, field: &str, value: &str) -> Result<()> {
    settings.set_field(field, value)?;
    settings.save(db)?;
    println!("Saved {}.", field);
    Ok(())
}

pub fn cmd_settings_reset(db: &Database) -> Result<()> {
    Settings::reset(db)?;
    println!("Settings reset to defaults.");
    Ok(())
}

//! Environment readiness check.

use std::path::Path;

use anyhow::Result;

use crate::browser::chromium::find_chromium;

/// Checks Chromium availability and storage writability.
pub async fn run(storage_dir: &Path) -> Result<()> {
    println!("Offprint Doctor");
    println!("===============");
    println!();

    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    let chromium = find_chromium();
    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => {
            println!("[!!] Chromium NOT found. Install chromium or set OFFPRINT_CHROMIUM.")
        }
    }

    let storage = check_storage(storage_dir).await;
    match &storage {
        Ok(()) => println!(
            "[OK] Storage root {} is writable",
            storage_dir.display()
        ),
        Err(e) => println!(
            "[!!] Storage root {} is not writable: {e}",
            storage_dir.display()
        ),
    }

    println!();
    if chromium.is_some() && storage.is_ok() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}

async fn check_storage(root: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(root).await?;
    let probe = root.join(".offprint-probe");
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

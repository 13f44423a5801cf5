//! Rebuild the site whenever the source directory changes.

use super::{compile, SitePaths};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;

pub async fn watch_site(site: SitePaths) -> Result<()> {
    // A broken initial state is fine; the next edit may fix it
    rebuild(&site).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut _watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .context("Failed to initialize file watcher")?;

    _watcher
        .watch(&site.input, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {:?}", site.input))?;

    println!("Watching {:?} for changes (Ctrl+C to stop)...", site.input);

    while let Some(event) = rx.recv().await {
        let mut dirty = match event {
            Ok(ev) => triggers_rebuild(&ev, &site.output),
            Err(err) => {
                tracing::warn!("Watcher error: {}", err);
                false
            }
        };

        // Drain the rest of the burst
        while let Ok(event) = rx.try_recv() {
            match event {
                Ok(ev) => dirty |= triggers_rebuild(&ev, &site.output),
                Err(err) => tracing::warn!("Watcher error: {}", err),
            }
        }

        if dirty {
            tracing::info!("Change detected, rebuilding...");
            rebuild(&site).await;
        }
    }

    Ok(())
}

async fn rebuild(site: &SitePaths) {
    let res = tokio::task::spawn_blocking({
        let site = site.clone();
        move || compile(&site)
    })
    .await;

    match res {
        Ok(Ok(report)) => tracing::info!(
            "Rebuild complete: {} pages, {} assets, {} broken links",
            report.pages.len(),
            report.assets.len(),
            report.broken_links
        ),
        Ok(Err(e)) => tracing::error!("Rebuild failed: {:?}", e),
        Err(e) => tracing::error!("Rebuild task panicked: {}", e),
    }
}

/// Content changes outside the output folder
fn triggers_rebuild(event: &Event, output: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|path| !path.starts_with(output))
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Watch mode: rebuild whenever a watched input changes

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wpbuild_plugins::{BuildOutput, Bundler};

/// Watch `files` and rebuild on change. Runs until the watcher shuts down.
pub async fn watch(bundler: &Bundler, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // receiver gone means we are shutting down
        let _ = event_tx.send(res);
    })?;

    let mut watched = Vec::new();
    let mut last_good = files.clone();
    refresh(&mut watcher, &mut watched, files);
    info!("watching {} files", watched.len());

    while let Some(event) = event_rx.recv().await {
        match event {
            Ok(event) if is_change(&event) => {
                debug!(paths = ?event.paths, "change detected");
            }
            Ok(_) => continue,
            Err(err) => {
                warn!("watch error: {}", err);
                continue;
            }
        }

        // coalesce a burst of events into one rebuild
        while event_rx.try_recv().is_ok() {}

        let files = settle(crate::build_once(bundler).await, &mut last_good);
        refresh(&mut watcher, &mut watched, files);
    }

    Ok(())
}

/// Log a rebuild and pick the watch set to register next.
///
/// A failed rebuild falls back to the last successful set: a save that
/// replaced a file has dropped its watch, and the fix must still be seen.
fn settle(outcome: anyhow::Result<BuildOutput>, last_good: &mut Vec<PathBuf>) -> Vec<PathBuf> {
    match outcome {
        Ok(output) => {
            info!(watch_files = output.watch_files.len(), "rebuild succeeded");
            *last_good = output.watch_files;
        }
        Err(err) => warn!("rebuild failed: {:#}", err),
    }
    last_good.clone()
}

fn is_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Replace the watched set. Everything is re-registered so files replaced on
/// save (remove + create) keep being watched.
fn refresh(watcher: &mut RecommendedWatcher, watched: &mut Vec<PathBuf>, files: Vec<PathBuf>) {
    for path in watched.drain(..) {
        if let Err(err) = watcher.unwatch(&path) {
            debug!(path = %path.display(), "unwatch failed: {}", err);
        }
    }

    for path in files {
        match watcher.watch(&path, RecursiveMode::NonRecursive) {
            Ok(()) => watched.push(path),
            Err(err) => warn!(path = %path.display(), "cannot watch: {}", err),
        }
    }
}

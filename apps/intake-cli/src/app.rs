use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ycloud_backend::StorageBackend;
use ycloud_intake::{
    FileHandle, FsByteReader, IntakeController, IntakeView, RpcInvoker, SelectionEvent,
    StatusMarker, StatusTracker,
};

use crate::adapter::LocalChannel;
use crate::config::IntakeConfig;

/// Totals of one CLI run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    /// Paths that could not be turned into a file handle.
    pub skipped: usize,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Uploads `paths` as one selection and prints every view change.
pub async fn run(cfg: &IntakeConfig, paths: &[PathBuf]) -> anyhow::Result<Summary> {
    let backend = StorageBackend::new(&cfg.storage_dir, cfg.write_chunk_size)
        .with_checksum_verification(cfg.verify_checksum);
    info!(storage = %backend.storage_dir().display(), "local backend ready");

    let invoker =
        RpcInvoker::new(LocalChannel::new(Arc::new(backend))).with_checksum(cfg.send_checksum);
    let tracker = Arc::new(StatusTracker::new());
    let mut controller =
        IntakeController::new(tracker.clone(), Arc::new(FsByteReader), Arc::new(invoker));
    let mut reports = controller
        .take_reports()
        .context("batch reports already taken")?;

    let mut summary = Summary::default();
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match FileHandle::open(path) {
            Ok(handle) => files.push(handle),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                eprintln!("skipped {}: {e}", path.display());
                summary.skipped += 1;
            }
        }
    }

    let (tx, rx) = mpsc::channel(1);
    tx.send(SelectionEvent::new(files))
        .await
        .context("selection channel closed")?;
    drop(tx);

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut views = tracker.subscribe();
    let driver = controller.run(rx, shutdown.clone());
    tokio::pin!(driver);
    loop {
        tokio::select! {
            _ = &mut driver => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                print!("{}", render_view(&view));
            }
        }
    }
    if views.has_changed().unwrap_or(false) {
        print!("{}", render_view(&views.borrow_and_update()));
    }

    while let Ok(report) = reports.try_recv() {
        summary.succeeded += report.succeeded();
        summary.failed += report.failed();
        for outcome in report.outcomes.iter().filter(|o| o.error.is_some()) {
            eprintln!(
                "failed {}: {}",
                outcome.name,
                outcome.error.as_deref().unwrap_or_default()
            );
        }
    }
    if shutdown.is_cancelled() {
        anyhow::bail!("interrupted");
    }

    Ok(summary)
}

/// Renders a view as the count label followed by one line per file.
pub fn render_view(view: &IntakeView) -> String {
    let mut out = format!("{}\n", view.count_label);
    for row in &view.rows {
        let marker = match row.marker {
            StatusMarker::Spinner => "...",
            StatusMarker::Success => "ok ",
            StatusMarker::Failure => "ERR",
        };
        out.push_str(&format!(
            "  [{marker}] {:<32} {:>10}  {:?}\n",
            row.name, row.display_size, row.status
        ));
    }
    out
}

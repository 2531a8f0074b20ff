//! Intake controller: drives read → transfer → status for every selected file.
//!
//! Each selection resets the [`StatusTracker`] synchronously, then every
//! file runs its own pipeline. Pipelines of one selection are joined on the
//! calling task, and successive selections are interleaved inside
//! [`IntakeController::run`], so nothing here needs its own thread.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::future::join_all;
use futures_util::stream::FuturesUnordered;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::descriptor::{FileDescriptor, FileHandle};
use crate::invoker::TransferInvoker;
use crate::reader::ByteReader;
use crate::status::{Advance, EntryKey, StatusTracker, TransferStatus};

/// Capacity of the batch report channel.
const REPORT_CHANNEL_CAPACITY: usize = 64;

/// A file-selection event: the ordered files the user picked.
#[derive(Debug, Clone, Default)]
pub struct SelectionEvent {
    pub files: Vec<FileHandle>,
}

impl SelectionEvent {
    pub fn new(files: Vec<FileHandle>) -> Self {
        Self { files }
    }
}

/// Final state of one file's pipeline run.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub key: EntryKey,
    pub name: String,
    pub status: TransferStatus,
    /// Why the file failed, when it did.
    pub error: Option<String>,
}

/// Outcomes of every file of one selection, in selection order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub generation: u64,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Number of files that reached `Succeeded`.
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == TransferStatus::Succeeded)
            .count()
    }

    /// Number of files that reached `Failed`.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == TransferStatus::Failed)
            .count()
    }
}

/// Future driving every pipeline of one selection.
pub type BatchFuture = Pin<Box<dyn Future<Output = BatchReport> + Send>>;

/// Shared pieces every per-file pipeline needs.
#[derive(Clone)]
struct Pipeline {
    tracker: Arc<StatusTracker>,
    reader: Arc<dyn ByteReader>,
    invoker: Arc<dyn TransferInvoker>,
}

impl Pipeline {
    /// Records a transition; stale and invalid writes are logged, never raised.
    fn mark(&self, key: EntryKey, name: &str, next: TransferStatus) {
        match self.tracker.advance(key, next) {
            Ok(Advance::Applied) => {}
            Ok(Advance::Stale) => {
                debug!(
                    file = %name,
                    generation = key.generation(),
                    ?next,
                    "selection replaced, status dropped"
                );
            }
            Err(e) => {
                error!(file = %name, error = %e, "status tracker rejected transition");
            }
        }
    }

    async fn run_file(self, key: EntryKey, file: FileHandle) -> FileOutcome {
        let name = file.name.clone();
        let finish = |status, error: Option<String>| FileOutcome {
            key,
            name: name.clone(),
            status,
            error,
        };

        self.mark(key, &name, TransferStatus::Reading);
        let bytes = match self.reader.read(&file).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = %name, error = %e, "read failed");
                self.mark(key, &name, TransferStatus::Failed);
                return finish(TransferStatus::Failed, Some(e.to_string()));
            }
        };

        self.mark(key, &name, TransferStatus::Uploading);
        let size = bytes.len();
        match self.invoker.transfer(&name, bytes).await {
            Ok(true) => {
                info!(file = %name, bytes = size, "upload succeeded");
                self.mark(key, &name, TransferStatus::Succeeded);
                finish(TransferStatus::Succeeded, None)
            }
            Ok(false) => {
                warn!(file = %name, "backend reported upload failure");
                self.mark(key, &name, TransferStatus::Failed);
                finish(
                    TransferStatus::Failed,
                    Some("backend reported failure".into()),
                )
            }
            Err(e) => {
                warn!(file = %name, error = %e, "upload call failed");
                self.mark(key, &name, TransferStatus::Failed);
                finish(TransferStatus::Failed, Some(e.to_string()))
            }
        }
    }
}

/// Orchestrates the intake pipeline for every selection event.
pub struct IntakeController {
    pipeline: Pipeline,
    reports_tx: mpsc::Sender<BatchReport>,
    reports_rx: Option<mpsc::Receiver<BatchReport>>,
}

impl IntakeController {
    /// Creates a controller writing into `tracker`.
    pub fn new(
        tracker: Arc<StatusTracker>,
        reader: Arc<dyn ByteReader>,
        invoker: Arc<dyn TransferInvoker>,
    ) -> Self {
        let (reports_tx, reports_rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY);
        Self {
            pipeline: Pipeline {
                tracker,
                reader,
                invoker,
            },
            reports_tx,
            reports_rx: Some(reports_rx),
        }
    }

    /// Takes the receiver of batch reports produced by [`run`](Self::run).
    /// Can only be called once.
    pub fn take_reports(&mut self) -> Option<mpsc::Receiver<BatchReport>> {
        self.reports_rx.take()
    }

    /// The tracker this controller writes into.
    pub fn tracker(&self) -> &Arc<StatusTracker> {
        &self.pipeline.tracker
    }

    /// Starts processing one selection.
    ///
    /// The tracker is reset before this returns; the returned future then
    /// runs every file's pipeline concurrently and resolves once all of them
    /// reached a terminal state. A failing file never affects the others.
    pub fn process(&self, selection: SelectionEvent) -> BatchFuture {
        let descriptors: Vec<FileDescriptor> =
            selection.files.iter().map(FileDescriptor::from).collect();
        let keys = self.pipeline.tracker.reset(&descriptors);
        let generation = keys.first().map_or_else(
            || self.pipeline.tracker.generation(),
            |k| k.generation(),
        );
        info!(generation, files = descriptors.len(), "processing selection");

        let pipeline = self.pipeline.clone();
        Box::pin(async move {
            let runs = keys
                .into_iter()
                .zip(selection.files)
                .map(|(key, file)| pipeline.clone().run_file(key, file));
            let outcomes = join_all(runs).await;
            BatchReport {
                generation,
                outcomes,
            }
        })
    }

    /// Consumes selection events until the channel closes or `shutdown` fires.
    ///
    /// A new event resets the view at once, even while earlier selections are
    /// still in flight; their remaining writes are dropped as stale. When the
    /// channel closes, in-flight batches are drained first. Cancelling
    /// `shutdown` returns immediately and abandons them.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<SelectionEvent>,
        shutdown: CancellationToken,
    ) {
        let mut batches: FuturesUnordered<BatchFuture> = FuturesUnordered::new();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(in_flight = batches.len(), "intake controller cancelled");
                    return;
                }
                event = events.recv() => match event {
                    Some(selection) => batches.push(self.process(selection)),
                    None => break,
                },
                Some(report) = batches.next(), if !batches.is_empty() => {
                    self.publish(report);
                }
            }
        }

        debug!(in_flight = batches.len(), "selection channel closed, draining");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(in_flight = batches.len(), "intake controller cancelled while draining");
                    return;
                }
                next = batches.next() => match next {
                    Some(report) => self.publish(report),
                    None => break,
                },
            }
        }
        info!("intake controller stopped");
    }

    fn publish(&self, report: BatchReport) {
        info!(
            generation = report.generation,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "selection finished"
        );
        // Reports are best effort: a full or closed receiver drops them.
        if let Err(e) = self.reports_tx.try_send(report) {
            warn!(error = %e, "batch report not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use tokio::sync::Notify;

    use crate::error::{ReadError, TransferError};
    use crate::status::StatusMarker;

    /// Returns scripted bytes or errors per file name.
    #[derive(Default)]
    struct ScriptedReader {
        fail: HashSet<String>,
        gates: HashMap<String, Arc<Notify>>,
    }

    impl ScriptedReader {
        fn failing(names: &[&str]) -> Self {
            Self {
                fail: names.iter().map(|n| n.to_string()).collect(),
                gates: HashMap::new(),
            }
        }

        fn gated(name: &str, gate: Arc<Notify>) -> Self {
            let mut gates = HashMap::new();
            gates.insert(name.to_string(), gate);
            Self {
                fail: HashSet::new(),
                gates,
            }
        }
    }

    impl ByteReader for ScriptedReader {
        fn read<'a>(
            &'a self,
            file: &'a FileHandle,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>, ReadError>> + Send + 'a>> {
            Box::pin(async move {
                if let Some(gate) = self.gates.get(&file.name) {
                    gate.notified().await;
                }
                if self.fail.contains(&file.name) {
                    return Err(ReadError {
                        name: file.name.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::PermissionDenied,
                            "permission revoked",
                        ),
                    });
                }
                Ok(vec![0u8; file.size_bytes as usize])
            })
        }
    }

    enum Reply {
        Ok(bool),
        Broken,
    }

    /// Replies per file name (default success) and records each call.
    #[derive(Default)]
    struct ScriptedInvoker {
        replies: HashMap<String, Reply>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedInvoker {
        fn with(mut self, name: &str, reply: Reply) -> Self {
            self.replies.insert(name.to_string(), reply);
            self
        }

        fn calls(&self) -> Vec<(String, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TransferInvoker for ScriptedInvoker {
        fn transfer<'a>(
            &'a self,
            file_name: &'a str,
            bytes: Vec<u8>,
        ) -> Pin<Box<dyn Future<Output = Result<bool, TransferError>> + Send + 'a>> {
            self.calls
                .lock()
                .unwrap()
                .push((file_name.to_string(), bytes.len()));
            let result = match self.replies.get(file_name) {
                None | Some(Reply::Ok(true)) => Ok(true),
                Some(Reply::Ok(false)) => Ok(false),
                Some(Reply::Broken) => Err(TransferError::Channel("pipe closed".into())),
            };
            Box::pin(async move {
                tokio::task::yield_now().await;
                result
            })
        }
    }

    fn selection(files: &[(&str, u64)]) -> SelectionEvent {
        SelectionEvent::new(
            files
                .iter()
                .map(|(name, size)| FileHandle::new(*name, *size, format!("/media/{name}")))
                .collect(),
        )
    }

    fn controller(
        reader: ScriptedReader,
        invoker: Arc<ScriptedInvoker>,
    ) -> (IntakeController, Arc<StatusTracker>) {
        let tracker = Arc::new(StatusTracker::new());
        let ctrl = IntakeController::new(tracker.clone(), Arc::new(reader), invoker);
        (ctrl, tracker)
    }

    fn statuses(tracker: &StatusTracker) -> Vec<(String, TransferStatus)> {
        tracker
            .view()
            .rows
            .into_iter()
            .map(|r| (r.name, r.status))
            .collect()
    }

    #[tokio::test]
    async fn reset_happens_before_any_pipeline_work() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let (ctrl, tracker) = controller(ScriptedReader::default(), invoker.clone());

        let batch = ctrl.process(selection(&[("a.bin", 500), ("b.bin", 2_097_152)]));

        // Not polled yet: the view already shows the new selection, all pending.
        let view = tracker.view();
        assert_eq!(view.count_label, "2 Files Selected");
        assert_eq!(view.rows[0].name, "a.bin");
        assert_eq!(view.rows[0].display_size, "0.5KB");
        assert_eq!(view.rows[1].name, "b.bin");
        assert_eq!(view.rows[1].display_size, "2.0MB");
        assert!(view.rows.iter().all(|r| r.status == TransferStatus::Pending));
        assert!(invoker.calls().is_empty());

        let report = batch.await;
        assert_eq!(report.succeeded(), 2);
        assert_eq!(
            statuses(&tracker),
            vec![
                ("a.bin".to_string(), TransferStatus::Succeeded),
                ("b.bin".to_string(), TransferStatus::Succeeded),
            ]
        );
    }

    #[tokio::test]
    async fn each_file_is_uploaded_once_with_full_bytes() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let (ctrl, _tracker) = controller(ScriptedReader::default(), invoker.clone());

        ctrl.process(selection(&[("a.bin", 500), ("b.bin", 2048), ("c.bin", 0)]))
            .await;

        let mut calls = invoker.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("a.bin".to_string(), 500),
                ("b.bin".to_string(), 2048),
                ("c.bin".to_string(), 0),
            ]
        );
    }

    #[tokio::test]
    async fn read_failure_is_isolated() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let (ctrl, tracker) = controller(ScriptedReader::failing(&["b.bin"]), invoker.clone());

        let report = ctrl
            .process(selection(&[("a.bin", 10), ("b.bin", 20), ("c.bin", 30)]))
            .await;

        assert_eq!(report.outcomes[1].status, TransferStatus::Failed);
        assert!(
            report.outcomes[1]
                .error
                .as_deref()
                .unwrap()
                .contains("b.bin")
        );
        assert_eq!(report.succeeded(), 2);
        assert_eq!(
            statuses(&tracker),
            vec![
                ("a.bin".to_string(), TransferStatus::Succeeded),
                ("b.bin".to_string(), TransferStatus::Failed),
                ("c.bin".to_string(), TransferStatus::Succeeded),
            ]
        );
        // A failed read never reaches the backend.
        assert!(invoker.calls().iter().all(|(name, _)| name != "b.bin"));
    }

    #[tokio::test]
    async fn backend_false_fails_only_that_file() {
        let invoker = Arc::new(ScriptedInvoker::default().with("a.bin", Reply::Ok(false)));
        let (ctrl, tracker) = controller(ScriptedReader::default(), invoker);

        let report = ctrl
            .process(selection(&[("a.bin", 1), ("b.bin", 1)]))
            .await;

        assert_eq!(report.outcomes[0].status, TransferStatus::Failed);
        assert_eq!(report.outcomes[1].status, TransferStatus::Succeeded);
        let view = tracker.view();
        assert_eq!(view.rows[0].marker, StatusMarker::Failure);
        assert_eq!(view.rows[1].marker, StatusMarker::Success);
    }

    #[tokio::test]
    async fn transfer_error_fails_only_that_file() {
        let invoker = Arc::new(ScriptedInvoker::default().with("b.bin", Reply::Broken));
        let (ctrl, tracker) = controller(ScriptedReader::default(), invoker);

        let report = ctrl
            .process(selection(&[("a.bin", 1), ("b.bin", 1)]))
            .await;

        assert_eq!(report.failed(), 1);
        assert!(report.outcomes[1].error.as_deref().unwrap().contains("pipe closed"));
        assert_eq!(
            statuses(&tracker),
            vec![
                ("a.bin".to_string(), TransferStatus::Succeeded),
                ("b.bin".to_string(), TransferStatus::Failed),
            ]
        );
    }

    #[tokio::test]
    async fn empty_selection_clears_view() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let (ctrl, tracker) = controller(ScriptedReader::default(), invoker);

        ctrl.process(selection(&[("a.bin", 1)])).await;
        let report = ctrl.process(SelectionEvent::default()).await;

        assert!(report.outcomes.is_empty());
        assert_eq!(report.generation, 2);
        let view = tracker.view();
        assert_eq!(view.count_label, "0 Files Selected");
        assert!(view.rows.is_empty());
    }

    #[tokio::test]
    async fn replaced_selection_writes_are_dropped() {
        let invoker = Arc::new(ScriptedInvoker::default());
        let (ctrl, tracker) = controller(ScriptedReader::default(), invoker);

        let first = ctrl.process(selection(&[("old-1", 1), ("old-2", 1), ("old-3", 1)]));
        let second = ctrl.process(selection(&[("new", 1)]));

        // The first batch runs to completion after being replaced.
        let first_report = first.await;
        assert_eq!(first_report.succeeded(), 3);
        let view = tracker.view();
        assert_eq!(view.count_label, "1 Files Selected");
        assert_eq!(
            statuses(&tracker),
            vec![("new".to_string(), TransferStatus::Pending)]
        );

        second.await;
        assert_eq!(
            statuses(&tracker),
            vec![("new".to_string(), TransferStatus::Succeeded)]
        );
    }

    #[tokio::test]
    async fn run_interleaves_selections_and_drops_stale_results() {
        let gate = Arc::new(Notify::new());
        let invoker = Arc::new(ScriptedInvoker::default());
        let (mut ctrl, tracker) =
            controller(ScriptedReader::gated("slow.bin", gate.clone()), invoker.clone());
        let mut reports = ctrl.take_reports().unwrap();
        let mut views = tracker.subscribe();

        let (tx, rx) = mpsc::channel(4);
        let driver = async move {
            tx.send(selection(&[("slow.bin", 8), ("fast.bin", 4)]))
                .await
                .unwrap();
            tx.send(selection(&[("x.bin", 1), ("y.bin", 2), ("z.bin", 3)]))
                .await
                .unwrap();
            views
                .wait_for(|v| v.generation == 2)
                .await
                .unwrap();
            gate.notify_one();
            drop(tx);
        };

        tokio::join!(ctrl.run(rx, CancellationToken::new()), driver);

        let view = tracker.view();
        assert_eq!(view.generation, 2);
        assert_eq!(view.count_label, "3 Files Selected");
        assert_eq!(
            statuses(&tracker),
            vec![
                ("x.bin".to_string(), TransferStatus::Succeeded),
                ("y.bin".to_string(), TransferStatus::Succeeded),
                ("z.bin".to_string(), TransferStatus::Succeeded),
            ]
        );

        // Both batches finished; the stale one still uploaded its files.
        let mut finished = Vec::new();
        while let Ok(report) = reports.try_recv() {
            finished.push(report.generation);
        }
        finished.sort_unstable();
        assert_eq!(finished, vec![1, 2]);
        assert!(invoker.calls().iter().any(|(name, _)| name == "slow.bin"));
    }

    #[tokio::test]
    async fn shutdown_stops_run_loop() {
        let gate = Arc::new(Notify::new());
        let invoker = Arc::new(ScriptedInvoker::default());
        let (ctrl, tracker) = controller(ScriptedReader::gated("stuck.bin", gate), invoker.clone());

        let (tx, rx) = mpsc::channel(1);
        let shutdown = CancellationToken::new();
        let mut views = tracker.subscribe();

        let sender = tx.clone();
        let token = shutdown.clone();
        let driver = async move {
            sender.send(selection(&[("stuck.bin", 1)])).await.unwrap();
            views
                .wait_for(|v| {
                    v.rows
                        .first()
                        .is_some_and(|r| r.status == TransferStatus::Reading)
                })
                .await
                .unwrap();
            token.cancel();
        };

        tokio::join!(ctrl.run(rx, shutdown), driver);

        assert!(invoker.calls().is_empty());
        assert_eq!(
            statuses(&tracker),
            vec![("stuck.bin".to_string(), TransferStatus::Reading)]
        );
        drop(tx);
    }

    #[tokio::test]
    async fn reports_beyond_capacity_are_dropped() {
        let mut ctrl = controller(
            ScriptedReader::default(),
            Arc::new(ScriptedInvoker::default()),
        )
        .0;
        let mut reports = ctrl.take_reports().unwrap();

        let (tx, rx) = mpsc::channel(REPORT_CHANNEL_CAPACITY + 1);
        for _ in 0..=REPORT_CHANNEL_CAPACITY {
            tx.send(selection(&[])).await.unwrap();
        }
        drop(tx);

        ctrl.run(rx, CancellationToken::new()).await;

        let mut delivered = 0;
        while reports.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, REPORT_CHANNEL_CAPACITY);
    }

    #[tokio::test]
    async fn take_reports_once() {
        let mut ctrl = controller(
            ScriptedReader::default(),
            Arc::new(ScriptedInvoker::default()),
        )
        .0;
        assert!(ctrl.take_reports().is_some());
        assert!(ctrl.take_reports().is_none());
    }
}

//! Single-Writer Persistence Queue

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::log::RecordLog;
use crate::{Record, StorageError};

/// Work item for the writer task
pub(crate) enum Command {
    /// Persist the sequence as of at least `version`
    Save {
        version: u64,
        ack: oneshot::Sender<Result<(), StorageError>>,
    },
    Clear {
        ack: oneshot::Sender<Result<(), StorageError>>,
    },
    Load {
        ack: oneshot::Sender<Result<Vec<Record>, StorageError>>,
    },
    Barrier {
        ack: oneshot::Sender<()>,
    },
}

/// Current sequence and the mutation count it reflects
pub(crate) struct Snapshot {
    pub(crate) version: u64,
    pub(crate) records: Vec<Record>,
}

/// Outcome of one scheduled write
///
/// Await it to learn whether the write landed, or drop it to fire and forget.
/// Failures are logged by the writer either way.
#[must_use = "await the ticket or drop it explicitly to fire and forget"]
pub struct PersistTicket {
    rx: oneshot::Receiver<Result<(), StorageError>>,
}

impl PersistTicket {
    /// Wait for the write to complete
    pub async fn wait(self) -> Result<(), StorageError> {
        self.rx.await.unwrap_or(Err(StorageError::WriterClosed))
    }
}

/// Sender half of the writer queue
///
/// One task owns the [`RecordLog`] and runs commands strictly one after
/// another, so a write in flight blocks the next from starting. A save
/// writes the newest sequence at the time it starts; queued saves already
/// covered by that write resolve with its outcome instead of writing again.
#[derive(Clone)]
pub(crate) struct PersistQueue {
    tx: mpsc::UnboundedSender<Command>,
}

impl PersistQueue {
    /// Spawn the writer task on the current tokio runtime
    ///
    /// A `held` writer refuses every save and clear, leaving the stored blob
    /// untouched; loads still go through.
    pub(crate) fn spawn<F>(log: RecordLog, snapshot: F, held: bool) -> Self
    where
        F: Fn() -> Snapshot + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(log, snapshot, held, rx));
        Self { tx }
    }

    pub(crate) fn save(&self, version: u64) -> PersistTicket {
        let (ack, rx) = oneshot::channel();
        // A closed queue drops `ack`, which resolves the ticket as WriterClosed
        let _ = self.tx.send(Command::Save { version, ack });
        PersistTicket { rx }
    }

    pub(crate) fn clear(&self) -> PersistTicket {
        let (ack, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Clear { ack });
        PersistTicket { rx }
    }

    pub(crate) async fn load(&self) -> Result<Vec<Record>, StorageError> {
        let (ack, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Load { ack });
        rx.await.unwrap_or(Err(StorageError::WriterClosed))
    }

    pub(crate) async fn barrier(&self) -> Result<(), StorageError> {
        let (ack, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Barrier { ack });
        rx.await.map_err(|_| StorageError::WriterClosed)
    }
}

async fn run<F>(log: RecordLog, snapshot: F, held: bool, mut rx: mpsc::UnboundedReceiver<Command>)
where
    F: Fn() -> Snapshot,
{
    if held {
        error!("Persistence writer for '{}' started with writes held", log.key());
    } else {
        info!("Starting persistence writer for '{}'", log.key());
    }
    // Version covered by the last write, with that write's outcome
    let mut written: Option<(u64, Result<(), StorageError>)> = None;

    while let Some(command) = rx.recv().await {
        match command {
            Command::Save { ack, .. } | Command::Clear { ack } if held => {
                debug!("Refusing write to '{}', writes are held", log.key());
                let _ = ack.send(Err(StorageError::WritesHeld(log.key().to_string())));
            }
            Command::Save { version, ack } => {
                if let Some((covered, result)) = &written {
                    if version <= *covered {
                        let _ = ack.send(result.clone());
                        continue;
                    }
                }

                let Snapshot { version, records } = snapshot();
                let result = log.save(&records).await;
                if let Err(e) = &result {
                    warn!("Failed to persist {} records: {}", records.len(), e);
                    metrics::counter!("aqualog_persist_failures_total").increment(1);
                }
                written = Some((version, result.clone()));
                let _ = ack.send(result);
            }
            Command::Clear { ack } => {
                let result = log.clear().await;
                if let Err(e) = &result {
                    warn!("Failed to clear persisted records: {}", e);
                    metrics::counter!("aqualog_persist_failures_total").increment(1);
                }
                // Saves queued behind a clear must write again
                written = None;
                let _ = ack.send(result);
            }
            Command::Load { ack } => {
                let _ = ack.send(log.load().await);
            }
            Command::Barrier { ack } => {
                let _ = ack.send(());
            }
        }
    }

    debug!("Persistence writer for '{}' stopped", log.key());
}

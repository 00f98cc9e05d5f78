use super::DbPool;
use crate::errors::StorageError;
use diesel::SqliteConnection;
use log::{debug, error};
use loanbook_core::errors::{DatabaseError, Error, Result};
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// A write job runs against the actor's connection inside one transaction.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type AnyBox = Box<dyn Any + Send + 'static>;
type Envelope = (Job<AnyBox>, oneshot::Sender<Result<AnyBox>>);

const QUEUE_DEPTH: usize = 1024;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<Envelope>,
}

fn writer_gone() -> Error {
    Error::Database(DatabaseError::Internal(
        "database writer is no longer running".to_string(),
    ))
}

impl WriteHandle {
    /// Executes `job` on the writer's dedicated connection.
    ///
    /// The job runs inside an immediate transaction: any error it returns rolls
    /// back every statement it issued.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as AnyBox)),
                ret_tx,
            ))
            .await
            .map_err(|_| writer_gone())?;

        let boxed = ret_rx.await.map_err(|_| writer_gone())??;
        boxed.downcast::<T>().map(|v| *v).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "writer returned an unexpected result type".to_string(),
            ))
        })
    }
}

/// Spawns a background Tokio task that is the only writer to the database.
///
/// The actor holds one pooled connection for its lifetime and processes jobs
/// strictly one at a time.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(QUEUE_DEPTH);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("Writer actor could not acquire a connection: {}", e);
                return;
            }
        };
        debug!("Database writer actor started");

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<AnyBox> = conn
                .immediate_transaction::<_, StorageError, _>(|c| job(c).map_err(StorageError::from))
                .map_err(Error::from);

            // The requester may have gone away; nothing to do then.
            let _ = reply_tx.send(result);
        }
        debug!("Database writer actor stopped");
    });

    WriteHandle { tx }
}

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::WorkerMessage;
use crate::error::Error;
use crate::response::Response;

/// The dispatcher-side end of one worker's channel pair.
///
/// The handle owns the request sender and the response receiver; the
/// worker owns the other two ends plus the model agent. [`call`] performs
/// the synchronous request/response exchange: the response receiver is
/// locked across the send so concurrent callers against the same model
/// serialize in FIFO order and can never steal each other's response.
///
/// No deadline is imposed here. A caller that abandons a `call` leaves an
/// unread response in the channel; the worker keeps running.
///
/// [`call`]: WorkerHandle::call
#[derive(Debug)]
pub struct WorkerHandle {
    id: String,

    /// Request sender; `None` once shutdown has been initiated.
    requests: Option<UnboundedSender<WorkerMessage>>,

    /// Response receiver, locked for the whole send/receive pair.
    responses: Mutex<UnboundedReceiver<Response>>,

    /// Handle to the worker task, taken on shutdown.
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn new(
        id: String,
        requests: UnboundedSender<WorkerMessage>,
        responses: UnboundedReceiver<Response>,
        join: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            requests: Some(requests),
            responses: Mutex::new(responses),
            join: Some(join),
        }
    }

    /// The model identifier this worker serves.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the worker loop is still receiving.
    pub fn is_alive(&self) -> bool {
        self.requests
            .as_ref()
            .map(|requests| !requests.is_closed())
            .unwrap_or(false)
    }

    /// Submits one message and blocks until its response arrives.
    pub(crate) async fn call(&self, message: WorkerMessage) -> Result<Response, Error> {
        let mut responses = self.responses.lock().await;
        self.requests
            .as_ref()
            .ok_or(Error::ChannelClosed)?
            .send(message)
            .map_err(|_| Error::ChannelClosed)?;
        responses.recv().await.ok_or(Error::ChannelClosed)
    }

    /// Initiates a graceful shutdown of the worker task.
    ///
    /// Closing the request channel lets the loop drain pending messages
    /// and exit; the task itself is awaited from a detached task so the
    /// caller never blocks.
    pub fn shutdown(&mut self) {
        self.requests = None;
        if let Some(join) = self.join.take() {
            tokio::spawn(async move {
                let _ = join.await;
            });
        }
    }
}

impl Drop for WorkerHandle {
    /// Ensures the worker task is shut down when the handle is dropped.
    fn drop(&mut self) {
        self.shutdown();
    }
}

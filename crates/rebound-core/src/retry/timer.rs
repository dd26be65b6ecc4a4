//! Tokio-backed timer service
//!
//! Honors [`Scheduled`] values by sleeping on the tokio runtime and then
//! pushing the attached message into the host's dispatch queue.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::coordinator::Scheduled;

/// Delivers scheduled messages into an unbounded mpsc queue
///
/// The timer holds no state between schedules. If the receiving end has been
/// dropped by the time a delay elapses, the message is discarded.
#[derive(Debug)]
pub struct TokioTimer<M> {
    queue: mpsc::UnboundedSender<M>,
}

impl<M> Clone for TokioTimer<M> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<M: Send + 'static> TokioTimer<M> {
    /// Create a timer feeding the given queue
    pub fn new(queue: mpsc::UnboundedSender<M>) -> Self {
        Self { queue }
    }

    /// Deliver `scheduled.message` after `scheduled.delay`
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, scheduled: Scheduled<M>) -> JoinHandle<()> {
        let queue = self.queue.clone();
        let Scheduled { delay, message } = scheduled;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if queue.send(message).is_err() {
                tracing::debug!("dispatch queue closed before scheduled message fired");
            }
        })
    }

    /// Push a message into the queue without delay
    ///
    /// Returns `false` if the queue is closed.
    pub fn send_now(&self, message: M) -> bool {
        self.queue.send(message).is_ok()
    }
}

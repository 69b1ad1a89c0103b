//! Unbounded hand-off queues with an explicit end-of-stream marker.
//!
//! Every queue carries a sequence of items followed by exactly one terminal
//! marker. The marker is sent by [`QueueSender::finish`]; after it, pushes from
//! any clone of the sender are rejected, so the marker is always the last thing
//! the consumer observes.
//!
//! A receiver can tell the two ways a stream ends apart:
//! - [`Delivery::Finished`]: the producer sent the marker.
//! - [`QueueError::Disconnected`]: every sender was dropped without a marker,
//!   meaning the producing stage aborted.
//!
//! The channel is `Send` on both ends and supports [`QueueReceiver::blocking_recv`],
//! so one end can live on the async runtime and the other on a blocking thread.

use std::sync::{Arc, Mutex};

use futures::stream::{self, Stream};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by queue operations.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The terminal marker was already sent.
    #[error("queue '{0}' is already finished")]
    Closed(&'static str),

    /// The consumer dropped its receiver; nobody will read further items.
    #[error("consumer of queue '{0}' has hung up")]
    ReceiverGone(&'static str),

    /// All producers went away without sending the terminal marker.
    #[error("producer of queue '{0}' went away without finishing the stream")]
    Disconnected(&'static str),
}

/// What a consumer gets from [`QueueReceiver::recv`].
#[derive(Debug, PartialEq, Eq)]
pub enum Delivery<T> {
    Item(T),
    /// Terminal marker: no further items will arrive.
    Finished,
}

enum Message<T> {
    Item(T),
    End,
}

/// Create a named queue.
pub fn hand_off<T>(name: &'static str) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sender = QueueSender {
        tx,
        finished: Arc::new(Mutex::new(false)),
        name,
    };
    let receiver = QueueReceiver {
        rx,
        finished: false,
        name,
    };
    (sender, receiver)
}

/// Producing end. Clones share the same finished state.
pub struct QueueSender<T> {
    tx: mpsc::UnboundedSender<Message<T>>,
    finished: Arc<Mutex<bool>>,
    name: &'static str,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            finished: Arc::clone(&self.finished),
            name: self.name,
        }
    }
}

impl<T> std::fmt::Debug for QueueSender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueSender")
            .field("name", &self.name)
            .field("receiver_gone", &self.tx.is_closed())
            .finish()
    }
}

impl<T> QueueSender<T> {
    /// Enqueue one item.
    pub fn push(&self, item: T) -> Result<(), QueueError> {
        // Holding the lock across the send keeps a concurrent `finish` from
        // slipping its marker in ahead of this item.
        let finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        if *finished {
            return Err(QueueError::Closed(self.name));
        }
        self.tx
            .send(Message::Item(item))
            .map_err(|_| QueueError::ReceiverGone(self.name))
    }

    /// Enqueue the terminal marker. Succeeds at most once per queue.
    pub fn finish(self) -> Result<(), QueueError> {
        let mut finished = self.finished.lock().unwrap_or_else(|e| e.into_inner());
        if *finished {
            return Err(QueueError::Closed(self.name));
        }
        *finished = true;
        self.tx
            .send(Message::End)
            .map_err(|_| QueueError::ReceiverGone(self.name))
    }

    /// Whether the consumer has dropped its receiver.
    pub fn is_receiver_gone(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer drops its receiver.
    pub async fn receiver_gone(&self) {
        self.tx.closed().await
    }
}

/// Consuming end. There is exactly one per queue.
pub struct QueueReceiver<T> {
    rx: mpsc::UnboundedReceiver<Message<T>>,
    finished: bool,
    name: &'static str,
}

impl<T> std::fmt::Debug for QueueReceiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueReceiver")
            .field("name", &self.name)
            .field("finished", &self.finished)
            .finish()
    }
}

impl<T> QueueReceiver<T> {
    /// Wait for the next item or the terminal marker.
    ///
    /// Once the marker has been observed, every further call returns
    /// [`Delivery::Finished`] again.
    pub async fn recv(&mut self) -> Result<Delivery<T>, QueueError> {
        if self.finished {
            return Ok(Delivery::Finished);
        }
        let message = self.rx.recv().await;
        self.accept(message)
    }

    /// Blocking variant of [`recv`](Self::recv) for use off the async runtime.
    ///
    /// Panics if called from within an async execution context.
    pub fn blocking_recv(&mut self) -> Result<Delivery<T>, QueueError> {
        if self.finished {
            return Ok(Delivery::Finished);
        }
        let message = self.rx.blocking_recv();
        self.accept(message)
    }

    fn accept(&mut self, message: Option<Message<T>>) -> Result<Delivery<T>, QueueError> {
        match message {
            Some(Message::Item(item)) => Ok(Delivery::Item(item)),
            Some(Message::End) => {
                self.finished = true;
                self.rx.close();
                Ok(Delivery::Finished)
            }
            None => Err(QueueError::Disconnected(self.name)),
        }
    }

    /// Turn the receiver into a stream of items.
    ///
    /// The stream ends after the terminal marker, or yields a single
    /// [`QueueError::Disconnected`] and ends if the producers vanish.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, QueueError>> {
        stream::unfold(Some(self), |state| async move {
            let mut receiver = state?;
            match receiver.recv().await {
                Ok(Delivery::Item(item)) => Some((Ok(item), Some(receiver))),
                Ok(Delivery::Finished) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

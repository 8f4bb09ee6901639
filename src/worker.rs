//! Named background threads fed by a bounded queue.

use crossbeam_channel::{Receiver, Sender};
use std::io;
use std::ops::ControlFlow;
use std::thread::{self, JoinHandle};

/// A running worker thread and the sending half of its queue
pub struct Worker<I: Send + 'static> {
    sender: Sender<I>,
    handle: JoinHandle<()>,
}

impl<I: Send + 'static> Worker<I> {
    /// Spawn a thread named `name` that feeds each message to `handler`.
    ///
    /// The thread exits when `handler` returns [`ControlFlow::Break`] or when
    /// every sender has been dropped.
    pub fn spawn<F>(name: &str, capacity: usize, mut handler: F) -> io::Result<Self>
    where
        F: FnMut(I) -> ControlFlow<()> + Send + 'static,
    {
        let (sender, recv): (Sender<I>, Receiver<I>) = crossbeam_channel::bounded(capacity);
        let thread_name = name.to_string();
        let handle = thread::Builder::new().name(thread_name.clone()).spawn(move || {
            log::trace!("worker '{thread_name}' starting");
            for message in recv {
                if handler(message).is_break() {
                    break;
                }
            }
            log::trace!("worker '{thread_name}' exiting");
        })?;

        Ok(Self { sender, handle })
    }

    /// Another handle onto the worker's queue
    pub fn sender(&self) -> Sender<I> {
        self.sender.clone()
    }

    /// Drop this handle's sender and wait for the thread to finish.
    ///
    /// If the thread panicked, the panic is forwarded to the caller.
    pub fn join(self) {
        drop(self.sender);
        if let Err(payload) = self.handle.join() {
            std::panic::resume_unwind(payload);
        }
    }
}

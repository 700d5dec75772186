use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::trace;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Scripted in-memory transport.
///
/// Replies are queued up front and handed out one per
/// [`receive`](Transport::receive); an exhausted script behaves like a silent
/// endpoint and times out immediately. Every sent message is recorded.
///
/// Clones share state, so a test can keep one clone as a handle while the
/// other is moved into an engine.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    script: VecDeque<Scripted>,
    sent: Vec<String>,
    initialize_calls: usize,
    initialized: bool,
    fail_initialize: bool,
    fail_send: bool,
}

#[derive(Debug)]
enum Scripted {
    Reply(String),
    Timeout,
    Disconnect,
    Failure(String),
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply message.
    pub fn reply(&self, message: impl Into<String>) -> &Self {
        self.lock().script.push_back(Scripted::Reply(message.into()));
        self
    }

    /// Queue a receive that times out.
    pub fn reply_timeout(&self) -> &Self {
        self.lock().script.push_back(Scripted::Timeout);
        self
    }

    /// Queue a receive that reports a closed channel.
    pub fn reply_disconnect(&self) -> &Self {
        self.lock().script.push_back(Scripted::Disconnect);
        self
    }

    /// Queue a receive that fails with an implementation-specific error.
    pub fn reply_failure(&self, message: impl Into<String>) -> &Self {
        self.lock()
            .script
            .push_back(Scripted::Failure(message.into()));
        self
    }

    /// Make every subsequent `send` fail as if the channel dropped.
    pub fn fail_sends(&self, fail: bool) -> &Self {
        self.lock().fail_send = fail;
        self
    }

    /// Make every subsequent `initialize` fail.
    pub fn fail_initialize(&self, fail: bool) -> &Self {
        self.lock().fail_initialize = fail;
        self
    }

    /// Messages sent so far, oldest first.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Number of messages sent so far.
    pub fn send_count(&self) -> usize {
        self.lock().sent.len()
    }

    /// Number of `initialize` calls, successful or not.
    pub fn initialize_count(&self) -> usize {
        self.lock().initialize_calls
    }

    /// Whether an `initialize` call has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Number of scripted receives not yet consumed.
    pub fn pending(&self) -> usize {
        self.lock().script.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryTransport {
    fn initialize(&mut self, _timeout: Duration) -> Result<()> {
        let mut state = self.lock();
        state.initialize_calls += 1;
        if state.fail_initialize {
            return Err(TransportError::NotReady(
                "memory channel refused initialization".to_string(),
            ));
        }
        state.initialized = true;
        Ok(())
    }

    fn send(&mut self, message: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_send {
            return Err(TransportError::Disconnected);
        }
        trace!(line = message, "memory send");
        state.sent.push(message.to_string());
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<String> {
        match self.lock().script.pop_front() {
            Some(Scripted::Reply(message)) => Ok(message),
            Some(Scripted::Timeout) | None => Err(TransportError::Timeout(timeout)),
            Some(Scripted::Disconnect) => Err(TransportError::Disconnected),
            Some(Scripted::Failure(message)) => Err(TransportError::Other(message)),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

use std::collections::VecDeque;
use std::time::Duration;

use vscp_transport::{Result, Transport, TransportError};

use crate::emulator::Emulator;

/// Loopback [`Transport`] whose far end is an in-process [`Emulator`].
///
/// Each `send` is answered immediately and the reply is queued for the
/// next `receive`. With nothing queued, `receive` times out.
#[derive(Debug, Default)]
pub struct EmulatorTransport {
    emulator: Emulator,
    replies: VecDeque<String>,
    initialized: bool,
}

impl EmulatorTransport {
    pub fn new(emulator: Emulator) -> Self {
        Self {
            emulator,
            replies: VecDeque::new(),
            initialized: false,
        }
    }

    pub fn emulator(&self) -> &Emulator {
        &self.emulator
    }

    pub fn emulator_mut(&mut self) -> &mut Emulator {
        &mut self.emulator
    }

    pub fn into_emulator(self) -> Emulator {
        self.emulator
    }
}

impl Transport for EmulatorTransport {
    fn initialize(&mut self, _timeout: Duration) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn send(&mut self, message: &str) -> Result<()> {
        if !self.initialized {
            return Err(TransportError::NotReady(
                "emulator transport not initialized".to_string(),
            ));
        }
        let reply = self.emulator.handle(message);
        self.replies.push_back(reply);
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<String> {
        self.replies
            .pop_front()
            .ok_or(TransportError::Timeout(timeout))
    }

    fn name(&self) -> &'static str {
        "emulator"
    }
}

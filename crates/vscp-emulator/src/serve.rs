use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};
use vscp_transport::{StreamTransport, TimeoutStream, Transport, TransportError};

use crate::emulator::Emulator;
use crate::error::Result;

const OVERSIZE_REPLY: &str = "?status=0&error=Request too large";

/// Counters for one served connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// Requests answered.
    pub requests: usize,
    /// Oversized lines rejected without reaching the emulator.
    pub rejected: usize,
}

/// Answer line-framed requests on `transport` until the peer disconnects
/// or `running` is cleared.
///
/// `poll` bounds each wait so a cleared flag is noticed promptly. Build the
/// transport with [`StreamConfig::serving`](vscp_transport::StreamConfig::serving)
/// so pipelined requests are not discarded before each reply.
pub fn serve<S: TimeoutStream>(
    emulator: &mut Emulator,
    transport: &mut StreamTransport<S>,
    running: &AtomicBool,
    poll: Duration,
) -> Result<ServeSummary> {
    transport.initialize(poll)?;
    let mut summary = ServeSummary::default();

    while running.load(Ordering::SeqCst) {
        let reply = match transport.receive(poll) {
            Ok(request) => {
                summary.requests += 1;
                emulator.handle(&request)
            }
            Err(TransportError::Timeout(_)) => continue,
            Err(TransportError::Disconnected) => {
                debug!("client disconnected");
                break;
            }
            Err(TransportError::MessageTooLarge { len, max }) => {
                warn!(len, max, "rejecting oversized request");
                summary.rejected += 1;
                OVERSIZE_REPLY.to_string()
            }
            Err(err) => return Err(err.into()),
        };

        match transport.send(&reply) {
            Ok(()) => {}
            Err(TransportError::Disconnected) => {
                debug!("client disconnected before reply");
                break;
            }
            Err(err) => return Err(err.into()),
        }
    }

    info!(
        requests = summary.requests,
        rejected = summary.rejected,
        "connection closed"
    );
    Ok(summary)
}

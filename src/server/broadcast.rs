use mio::Token;
use std::io::{self, Write};

use crate::logger::Logger;
use crate::server::registry::{ConnectionRegistry, Peer, SendState};

/// Result of handing one payload to one target.
#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered,
    /// Accepted, but part of it waits in the target's outbound queue.
    Queued,
    Failed(io::Error),
}

#[derive(Debug)]
pub struct Delivery {
    pub token: Token,
    pub outcome: DeliveryOutcome,
}

impl Delivery {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Failed(_))
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Queued)
    }
}

/// Sends `text` to every peer in `registry` except `source`.
///
/// Each target gets its own outcome; a failed send is logged and the fan-out
/// moves on. A slow target queues up to `queue_limit` bytes instead of failing.
/// Nothing is removed here, see [`take_failed`].
pub fn broadcast<S: Write>(
    registry: &mut ConnectionRegistry<S>,
    source: Token,
    text: &str,
    queue_limit: usize,
    logger: &Logger,
) -> Vec<Delivery> {
    let payload = text.as_bytes();
    let mut deliveries = Vec::with_capacity(registry.len().saturating_sub(1));

    for (token, peer) in registry.iter_mut() {
        if token == source {
            continue;
        }

        let outcome = match peer.send(payload, queue_limit) {
            Ok(SendState::Sent) => DeliveryOutcome::Delivered,
            Ok(SendState::Queued) => DeliveryOutcome::Queued,
            Err(e) => {
                logger.warn(&format!("❌ Failed to send to client {}: {}", peer.addr, e));
                DeliveryOutcome::Failed(e)
            }
        };

        deliveries.push(Delivery { token, outcome });
    }

    deliveries
}

/// Removes every target whose delivery failed, so later fan-outs skip it.
pub fn take_failed<S>(registry: &mut ConnectionRegistry<S>, deliveries: &[Delivery]) -> Vec<(Token, Peer<S>)> {
    deliveries
        .iter()
        .filter(|d| d.is_failed())
        .filter_map(|d| registry.remove(d.token).map(|peer| (d.token, peer)))
        .collect()
}

//! Sequencer — request ids and the pending-request table.
//!
//! DESIGN
//! ======
//! Each outbound request gets the next sequence id and a `PendingRequest`
//! holding its completion handle and deadline. An entry leaves the table
//! exactly once: when a response with its id arrives, when its deadline
//! passes, or immediately if the frame could not be sent.
//!
//! Responses are matched by id only, so the server may answer out of order.
//! Anything that does not complete a live entry (broadcasts, `seq == 0`, late
//! or duplicate responses, responses whose caller already went away) is handed
//! back to the caller for the generic notification channel. Entries whose
//! caller dropped its receiver are pruned before each new submission.

use std::collections::HashMap;

use protocol::{InboundMessage, Request, RequestEnvelope, ResponseEnvelope};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::Credentials;
use crate::error::{ClientError, TransportError};

/// Resolver for one in-flight request.
pub type Completion = oneshot::Sender<Result<ResponseEnvelope, ClientError>>;

struct PendingRequest {
    kind: &'static str,
    deadline: Instant,
    completion: Completion,
}

#[derive(Default)]
pub struct Sequencer {
    last_seq: u32,
    pending: HashMap<u32, PendingRequest>,
}

impl Sequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a sequence id, encode the envelope, hand it to `send`, and
    /// register the pending entry.
    ///
    /// On send failure the completion is resolved with the transport error
    /// and no entry is kept.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `send`.
    pub fn submit<F>(
        &mut self,
        credentials: &Credentials,
        request: Request,
        deadline: Instant,
        completion: Completion,
        send: F,
    ) -> Result<u32, TransportError>
    where
        F: FnOnce(Vec<u8>) -> Result<(), TransportError>,
    {
        let seq = self.allocate();
        let kind = request.name();
        let envelope = RequestEnvelope {
            seq,
            player_id: credentials.player_id,
            player_token: credentials.player_token,
            request,
        };

        if let Err(error) = send(protocol::encode_request(&envelope)) {
            warn!(seq, kind, error = %error, "sequencer: send failed");
            let _ = completion.send(Err(ClientError::Transport(error.clone())));
            return Err(error);
        }

        debug!(seq, kind, "sequencer: request sent");
        self.pending.insert(seq, PendingRequest { kind, deadline, completion });
        Ok(seq)
    }

    /// Route an inbound message. Returns it back when it was not fully
    /// handled by a pending request.
    pub fn resolve(&mut self, message: InboundMessage) -> Option<InboundMessage> {
        let Some(seq) = message.seq() else {
            return Some(message);
        };
        let Some(pending) = self.pending.remove(&seq) else {
            debug!(seq, "sequencer: no pending request for response");
            return Some(message);
        };

        let InboundMessage { response, broadcast } = message;
        let Some(response) = response else {
            return Some(InboundMessage { response: None, broadcast });
        };

        match pending.completion.send(Ok(response)) {
            Ok(()) => {
                debug!(seq, kind = pending.kind, "sequencer: response matched");
                broadcast.map(|broadcast| InboundMessage { response: None, broadcast: Some(broadcast) })
            }
            // Caller stopped waiting; treat as unhandled.
            Err(returned) => Some(InboundMessage { response: returned.ok(), broadcast }),
        }
    }

    /// Earliest deadline among pending requests.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.deadline).min()
    }

    /// Fail every request whose deadline is at or before `now` with
    /// [`ClientError::Timeout`]. Returns the expired ids.
    pub fn expire(&mut self, now: Instant) -> Vec<u32> {
        let mut expired: Vec<u32> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(seq, _)| *seq)
            .collect();
        expired.sort_unstable();

        for seq in &expired {
            if let Some(pending) = self.pending.remove(seq) {
                warn!(seq, kind = pending.kind, "sequencer: request timed out");
                let _ = pending.completion.send(Err(ClientError::Timeout { seq: *seq }));
            }
        }
        expired
    }

    /// Drop entries whose caller stopped waiting. Returns how many went.
    pub fn prune_abandoned(&mut self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| !pending.completion.is_closed());
        let pruned = before - self.pending.len();
        if pruned > 0 {
            debug!(pruned, "sequencer: dropped abandoned requests");
        }
        pruned
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self, seq: u32) -> bool {
        self.pending.contains_key(&seq)
    }

    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // Skips 0 (reserved for unsolicited messages) and any id still pending
    // after a full wrap of the u32 space.
    fn allocate(&mut self) -> u32 {
        loop {
            self.last_seq = self.last_seq.wrapping_add(1);
            if self.last_seq != 0 && !self.pending.contains_key(&self.last_seq) {
                return self.last_seq;
            }
        }
    }
}

#[cfg(test)]
#[path = "sequencer_test.rs"]
mod tests;

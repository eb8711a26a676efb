//! Sending side of the bridge.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use prompto_protocols::{
    BridgeMessage, BridgeReply, BridgeRequest, CorrelationId, Failure, ReplyPayload,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::endpoint::{BridgeEndpoint, ReplySender};
use crate::error::BridgeError;

/// Pending call waiting for its reply.
struct PendingRequest {
    kind: &'static str,
    tx: oneshot::Sender<Result<BridgeReply, BridgeError>>,
}

type PendingMap = Arc<Mutex<HashMap<CorrelationId, PendingRequest>>>;

/// Reply bookkeeping, observable for diagnostics and tests.
#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    accepted: AtomicU64,
    discarded: AtomicU64,
}

/// Snapshot of bridge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Requests handed to the transport.
    pub sent: u64,
    /// Replies matched to a pending call.
    pub accepted: u64,
    /// Duplicate, late or unknown replies that were dropped.
    pub discarded: u64,
}

/// Engine-side handle of the bridge.
///
/// Share it behind an `Arc`; every call is independent, so overlapping
/// calls may complete in any order.
pub struct MessageBridge {
    outbound: mpsc::UnboundedSender<BridgeMessage>,
    request_id: AtomicU64,
    pending: PendingMap,
    counters: Arc<Counters>,
    timeout: Duration,
    closed: AtomicBool,
    recv_task: tokio::task::JoinHandle<()>,
}

impl MessageBridge {
    /// Create a connected bridge/endpoint pair.
    ///
    /// Must be called from within a tokio runtime.
    pub fn channel(timeout: Duration) -> (Self, BridgeEndpoint) {
        let (outbound, requests) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let counters = Arc::new(Counters::default());

        let recv_task = {
            let pending = pending.clone();
            let counters = counters.clone();
            tokio::spawn(async move {
                Self::receive_loop(reply_rx, pending, counters).await;
            })
        };

        let bridge = Self {
            outbound,
            request_id: AtomicU64::new(1),
            pending,
            counters,
            timeout,
            closed: AtomicBool::new(false),
            recv_task,
        };
        let endpoint = BridgeEndpoint::new(requests, ReplySender::new(reply_tx));
        (bridge, endpoint)
    }

    /// Reply receive loop.
    async fn receive_loop(
        mut replies: mpsc::UnboundedReceiver<BridgeReply>,
        pending: PendingMap,
        counters: Arc<Counters>,
    ) {
        while let Some(reply) = replies.recv().await {
            let id = reply.correlation_id;
            let waiting = pending.lock().remove(&id);
            match waiting {
                Some(req) => {
                    trace!(correlation_id = %id, kind = req.kind, "Bridge reply accepted");
                    counters.accepted.fetch_add(1, Ordering::Relaxed);
                    // The caller may have given up already; nothing to do then.
                    let _ = req.tx.send(Ok(reply));
                }
                None => {
                    debug!(correlation_id = %id, "Discarding duplicate or late bridge reply");
                    counters.discarded.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        debug!("Bridge reply channel closed");
        Self::fail_pending(&pending, BridgeError::Disconnected);
    }

    fn fail_pending(pending: &PendingMap, error: BridgeError) {
        let drained: Vec<_> = pending.lock().drain().collect();
        for (id, req) in drained {
            debug!(correlation_id = %id, kind = req.kind, "Abandoning pending bridge call");
            let _ = req.tx.send(Err(error.clone()));
        }
    }

    /// Send a request and wait for its single reply.
    ///
    /// Never hangs: expiry of the bounded wait, a vanished peer, or a
    /// closed bridge all come back as a failure reply carrying this call's id.
    pub async fn send(&self, request: BridgeRequest) -> BridgeReply {
        let id = CorrelationId(self.request_id.fetch_add(1, Ordering::SeqCst));
        match self.dispatch(id, request).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(correlation_id = %id, error = %err, "Bridge call failed");
                BridgeReply::failure(id, err.reason(), err.to_string())
            }
        }
    }

    /// Send a request and split the reply into payload or failure.
    pub async fn call(&self, request: BridgeRequest) -> Result<ReplyPayload, Failure> {
        self.send(request).await.into_result()
    }

    async fn dispatch(
        &self,
        id: CorrelationId,
        request: BridgeRequest,
    ) -> Result<BridgeReply, BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }

        let kind = request.kind();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { kind, tx });

        trace!(correlation_id = %id, kind, "Bridge send");
        let message = BridgeMessage {
            correlation_id: id,
            request,
        };
        if self.outbound.send(message).is_err() {
            self.pending.lock().remove(&id);
            return Err(BridgeError::Disconnected);
        }
        self.counters.sent.fetch_add(1, Ordering::Relaxed);

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::Closed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(BridgeError::Timeout {
                    kind,
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Abandon every pending call and refuse new ones.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.recv_task.abort();
        Self::fail_pending(&self.pending, BridgeError::Closed);
        debug!("Bridge closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of calls still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
        }
    }
}

impl Drop for MessageBridge {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;

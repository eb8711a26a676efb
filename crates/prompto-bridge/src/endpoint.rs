//! Receiving side of the bridge.

use std::sync::Arc;

use async_trait::async_trait;
use prompto_protocols::{BridgeMessage, BridgeReply, BridgeRequest, Failure, ReplyPayload};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Answers bridge requests in the privileged context.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(&self, request: BridgeRequest) -> Result<ReplyPayload, Failure>;
}

/// Cloneable reply path back to the engine.
#[derive(Clone)]
pub struct ReplySender {
    tx: mpsc::UnboundedSender<BridgeReply>,
}

impl ReplySender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<BridgeReply>) -> Self {
        Self { tx }
    }

    /// Deliver a reply. Returns false once the engine side is gone.
    pub fn reply(&self, reply: BridgeReply) -> bool {
        self.tx.send(reply).is_ok()
    }
}

/// Request stream plus reply path, held by the coordinator.
pub struct BridgeEndpoint {
    requests: mpsc::UnboundedReceiver<BridgeMessage>,
    replies: ReplySender,
}

impl BridgeEndpoint {
    pub(crate) fn new(
        requests: mpsc::UnboundedReceiver<BridgeMessage>,
        replies: ReplySender,
    ) -> Self {
        Self { requests, replies }
    }

    /// Split into the raw request receiver and reply sender.
    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<BridgeMessage>, ReplySender) {
        (self.requests, self.replies)
    }

    /// Serve requests with `handler` until the engine side closes.
    ///
    /// Each message is handled on its own task, so a slow request never
    /// holds up the ones behind it.
    pub fn serve<H: RequestHandler>(self, handler: Arc<H>) -> tokio::task::JoinHandle<()> {
        let (mut requests, replies) = self.into_parts();
        tokio::spawn(async move {
            while let Some(message) = requests.recv().await {
                let handler = handler.clone();
                let replies = replies.clone();
                tokio::spawn(async move {
                    let id = message.correlation_id;
                    let kind = message.request.kind();
                    trace!(correlation_id = %id, kind, "Handling bridge request");
                    let reply = match handler.handle(message.request).await {
                        Ok(payload) => BridgeReply::success(id, payload),
                        Err(failure) => {
                            debug!(correlation_id = %id, kind, reason = %failure.reason, "Bridge request failed");
                            BridgeReply::failure(id, failure.reason, failure.message)
                        }
                    };
                    if !replies.reply(reply) {
                        debug!(correlation_id = %id, "Engine gone before reply");
                    }
                });
            }
            debug!("Bridge request stream ended");
        })
    }
}

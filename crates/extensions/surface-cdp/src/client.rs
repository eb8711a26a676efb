//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use crate::error::CdpError;
use crate::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageInfo};
use crate::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;
type PendingMap = Arc<Mutex<HashMap<u64, PendingRequest>>>;
type EventHandlers = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>>;

/// Default wait for one CDP command.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Pending request waiting for response.
struct PendingRequest {
    tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Write half of a browser connection, shared by the client and its sessions.
pub(crate) struct Connection {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: PendingMap,
    timeout: Duration,
}

impl Connection {
    /// Send a CDP command and wait for its response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        let sent = {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await
        };
        if let Err(e) = sent {
            self.pending.lock().remove(&id);
            return Err(e.into());
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }
}

/// Fetch `/json/version` from a debugging endpoint.
pub async fn browser_version(endpoint: &str) -> Result<BrowserVersion, CdpError> {
    let version_url = format!("{}/json/version", endpoint.trim_end_matches('/'));
    debug!("Fetching browser version from {}", version_url);

    reqwest::get(&version_url)
        .await
        .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
        .json()
        .await
        .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))
}

/// List targets from `/json/list`.
pub async fn list_pages(endpoint: &str) -> Result<Vec<PageInfo>, CdpError> {
    let url = format!("{}/json/list", endpoint.trim_end_matches('/'));
    let pages: Vec<PageInfo> = reqwest::get(&url).await?.error_for_status()?.json().await?;
    Ok(pages)
}

/// Browser-level CDP connection.
///
/// Pages are attached with flattened sessions, so every tab shares this
/// one WebSocket.
pub struct CdpClient {
    http_endpoint: String,
    browser_ws_url: String,
    conn: Arc<Connection>,
    event_handlers: EventHandlers,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to Chrome at the given endpoint, e.g. `http://localhost:9222`.
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        Self::connect_with_timeout(endpoint, DEFAULT_CALL_TIMEOUT).await
    }

    pub async fn connect_with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();
        let version = browser_version(&http_endpoint).await?;
        debug!("Connected to browser: {}", version.browser);

        let browser_ws_url = version.web_socket_debugger_url;
        let (ws_stream, _) = tokio_tungstenite::connect_async(browser_ws_url.as_str())
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let event_handlers: EventHandlers = Arc::new(Mutex::new(HashMap::new()));

        let recv_task = tokio::spawn(Self::receive_loop(
            ws_source,
            pending.clone(),
            event_handlers.clone(),
        ));

        debug!("CDP client connected to {}", browser_ws_url);

        Ok(Self {
            http_endpoint,
            browser_ws_url,
            conn: Arc::new(Connection {
                ws_tx: tokio::sync::Mutex::new(ws_sink),
                request_id: AtomicU64::new(1),
                pending,
                timeout,
            }),
            event_handlers,
            recv_task,
        })
    }

    /// WebSocket receive loop.
    async fn receive_loop(mut ws_source: WsSource, pending: PendingMap, event_handlers: EventHandlers) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => {
                            if let Some(id) = resp.id {
                                let pending_req = pending.lock().remove(&id);
                                if let Some(req) = pending_req {
                                    let _ = req.tx.send(resp.into_result());
                                }
                            } else if resp.method.is_some() {
                                let session_id = resp.session_id.clone().unwrap_or_default();
                                let mut handlers = event_handlers.lock();
                                let closed = match handlers.get(&session_id) {
                                    Some(tx) => tx.send(resp).is_err(),
                                    None => false,
                                };
                                if closed {
                                    handlers.remove(&session_id);
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        // Nothing more will arrive: fail waiters and end every session stream.
        for (_, req) in pending.lock().drain() {
            let _ = req.tx.send(Err(CdpError::SessionClosed));
        }
        event_handlers.lock().clear();
    }

    /// Send a browser-level CDP command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.conn.call(method, params, None).await
    }

    pub fn endpoint(&self) -> &str {
        &self.http_endpoint
    }

    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// List open tabs.
    pub async fn list_pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        Ok(list_pages(&self.http_endpoint)
            .await?
            .into_iter()
            .filter(PageInfo::is_page)
            .collect())
    }

    /// Attach to an existing tab.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await
            .map_err(|e| match e {
                CdpError::Protocol { message, .. } => {
                    CdpError::PageNotFound(format!("{}: {}", target_id, message))
                }
                other => other,
            })?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_handlers.lock().insert(session_id.clone(), event_tx);

        let session = PageSession::new(
            target_id.to_string(),
            session_id,
            self.conn.clone(),
            event_rx,
        );
        session.enable_domains().await?;
        Ok(session)
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;

//! Scripted DevTools endpoint for tests.
//!
//! Serves `/json/version` through wiremock and one browser WebSocket on a
//! local port. Each command is answered by a responder closure; returning
//! `None` leaves the command unanswered.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) type Reply = Option<Result<Value, String>>;
pub(crate) type Responder = Arc<dyn Fn(&str, &Value) -> Reply + Send + Sync>;

pub(crate) struct FakeBrowser {
    http: MockServer,
    push: mpsc::UnboundedSender<Option<Value>>,
    log: Arc<Mutex<Vec<Value>>>,
    _task: tokio::task::JoinHandle<()>,
}

impl FakeBrowser {
    pub(crate) async fn start(responder: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws_url = format!(
            "ws://{}/devtools/browser/fake",
            listener.local_addr().unwrap()
        );

        let http = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Browser": "FakeChrome/1.0",
                "Protocol-Version": "1.3",
                "webSocketDebuggerUrl": ws_url,
            })))
            .mount(&http)
            .await;

        let (push, mut push_rx) = mpsc::unbounded_channel::<Option<Value>>();
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = log.clone();

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let (mut sink, mut source) = ws.split();
            loop {
                tokio::select! {
                    msg = source.next() => match msg {
                        Some(Ok(Message::Text(text))) => {
                            let request: Value = serde_json::from_str(&text).unwrap();
                            seen.lock().push(request.clone());
                            let method = request["method"].as_str().unwrap_or_default();
                            let params = request.get("params").cloned().unwrap_or(Value::Null);
                            let mut reply = match responder(method, &params) {
                                Some(Ok(result)) => json!({ "id": request["id"], "result": result }),
                                Some(Err(message)) => json!({
                                    "id": request["id"],
                                    "error": { "code": -32000, "message": message },
                                }),
                                None => continue,
                            };
                            if let Some(session) = request.get("sessionId") {
                                reply["sessionId"] = session.clone();
                            }
                            if sink.send(Message::Text(reply.to_string().into())).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(_)) => {}
                        _ => break,
                    },
                    pushed = push_rx.recv() => match pushed {
                        Some(Some(msg)) => {
                            if sink.send(Message::Text(msg.to_string().into())).await.is_err() {
                                break;
                            }
                        }
                        _ => {
                            let _ = sink.close().await;
                            break;
                        }
                    },
                }
            }
        });

        Self {
            http,
            push,
            log,
            _task: task,
        }
    }

    pub(crate) fn endpoint(&self) -> String {
        self.http.uri()
    }

    pub(crate) fn http(&self) -> &MockServer {
        &self.http
    }

    /// Send an unsolicited message (an event) to the client.
    pub(crate) fn push(&self, message: Value) {
        let _ = self.push.send(Some(message));
    }

    /// Close the WebSocket from the browser side.
    pub(crate) fn close(&self) {
        let _ = self.push.send(None);
    }

    /// Methods received so far, in order.
    pub(crate) fn methods(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|r| r["method"].as_str().map(str::to_string))
            .collect()
    }

    pub(crate) fn requests(&self, method: &str) -> Vec<Value> {
        self.log
            .lock()
            .iter()
            .filter(|r| r["method"] == method)
            .cloned()
            .collect()
    }
}

/// Answers the commands every attach sequence sends.
pub(crate) fn attach_reply(method: &str, params: &Value) -> Reply {
    match method {
        "Target.attachToTarget" if params["targetId"] == "missing" => {
            Some(Err("No target with given id found".to_string()))
        }
        "Target.attachToTarget" => Some(Ok(json!({ "sessionId": "S1" }))),
        "Page.enable" | "Runtime.enable" | "Runtime.addBinding" | "Runtime.removeBinding"
        | "Page.removeScriptToEvaluateOnNewDocument" => Some(Ok(json!({}))),
        "Page.addScriptToEvaluateOnNewDocument" => Some(Ok(json!({ "identifier": "1" }))),
        _ => None,
    }
}

/// A `Runtime.evaluate` result carrying `value`.
pub(crate) fn value(value: Value) -> Reply {
    Some(Ok(json!({ "result": { "type": "object", "value": value } })))
}

/// A `Runtime.evaluate` result for a thrown error.
pub(crate) fn thrown(description: &str) -> Reply {
    Some(Ok(json!({
        "result": { "type": "object", "subtype": "error" },
        "exceptionDetails": {
            "exceptionId": 1,
            "text": "Uncaught",
            "exception": { "type": "object", "description": description },
        },
    })))
}

//! [`Surface`] over a CDP page session.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use prompto_engine::{
    ControlId, ControlView, NodeId, NodeInfo, Notice, NoticeId, ObserveOptions, Rect, Surface,
    SurfaceError, SurfaceEvent, ToolbarAction,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::CdpError;
use crate::protocol::CdpResponse;
use crate::script::{BINDING, BOOTSTRAP, invocation, observing_bootstrap};
use crate::session::PageSession;

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryResult {
    Nodes(Vec<u64>),
    Failed { error: String, message: String },
}

/// Map a thrown script error back onto the handle it names.
fn script_error(err: CdpError) -> SurfaceError {
    if let CdpError::JavaScript(text) = &err {
        for (marker, make) in [
            ("detached:", (|id| SurfaceError::Detached(NodeId(id))) as fn(u64) -> SurfaceError),
            ("unknown-control:", |id| SurfaceError::UnknownControl(ControlId(id))),
        ] {
            if let Some(id) = text
                .split_once(marker)
                .and_then(|(_, rest)| leading_number(rest))
            {
                return make(id);
            }
        }
    }
    err.into()
}

fn leading_number(s: &str) -> Option<u64> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

/// Translate one session event into a surface event.
///
/// Returns `Some(SurfaceEvent::Closed)` when the tab is gone.
pub fn translate_event(event: &CdpResponse) -> Option<SurfaceEvent> {
    let params = event.params();
    match event.method.as_deref()? {
        "Runtime.bindingCalled" if params["name"] == BINDING => {
            let payload = params["payload"].as_str()?;
            match serde_json::from_str(payload) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(error = %e, "Unreadable surface event");
                    None
                }
            }
        }
        "Page.frameNavigated" if params["frame"].get("parentId").is_none() => {
            let location = params["frame"]["url"].as_str()?;
            Some(SurfaceEvent::Navigated {
                location: location.to_string(),
            })
        }
        "Inspector.detached" | "Page.targetCrashed" => Some(SurfaceEvent::Closed),
        _ => None,
    }
}

/// Drives one Chrome tab through the in-page runtime.
pub struct CdpSurface {
    session: Arc<PageSession>,
    pump: Mutex<Option<JoinHandle<()>>>,
    observe_script: Mutex<Option<String>>,
}

impl CdpSurface {
    /// Install the runtime into the current and all future documents.
    pub async fn attach(session: PageSession) -> Result<Self, CdpError> {
        session.add_script_on_new_document(BOOTSTRAP).await?;
        session.evaluate(BOOTSTRAP).await?;
        info!(target_id = %session.target_id(), "Surface runtime installed");
        Ok(Self {
            session: Arc::new(session),
            pump: Mutex::new(None),
            observe_script: Mutex::new(None),
        })
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    async fn invoke<T: DeserializeOwned>(&self, function: &str, args: &[Value]) -> Result<T, SurfaceError> {
        let expression = invocation(function, args);
        trace!(function, "Surface call");
        let value = self.session.evaluate(&expression).await.map_err(script_error)?;
        serde_json::from_value(value)
            .map_err(|e| SurfaceError::Backend(format!("{function}: unexpected result: {e}")))
    }

    async fn invoke_unit(&self, function: &str, args: &[Value]) -> Result<(), SurfaceError> {
        self.invoke::<Value>(function, args).await.map(|_| ())
    }

    fn render_payload(view: &ControlView) -> Result<(Value, Value), SurfaceError> {
        let mut payload =
            serde_json::to_value(view).map_err(|e| SurfaceError::Backend(e.to_string()))?;
        payload["declarations"] = json!(view.style.declarations());

        let mut labels = Map::new();
        for action in ToolbarAction::ALL {
            if let Value::String(name) = json!(action) {
                labels.insert(name, json!(action.label()));
            }
        }
        Ok((payload, Value::Object(labels)))
    }

    fn spawn_pump(
        mut events: mpsc::UnboundedReceiver<CdpResponse>,
        tx: mpsc::UnboundedSender<SurfaceEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(event) = translate_event(&event) else {
                    continue;
                };
                let closed = event == SurfaceEvent::Closed;
                if tx.send(event).is_err() || closed {
                    return;
                }
            }
            debug!("Session event stream ended");
            let _ = tx.send(SurfaceEvent::Closed);
        })
    }
}

#[async_trait]
impl Surface for CdpSurface {
    async fn location(&self) -> Result<String, SurfaceError> {
        self.invoke("location", &[]).await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, SurfaceError> {
        match self.invoke("query", &[json!(selector)]).await? {
            QueryResult::Nodes(ids) => Ok(ids.into_iter().map(NodeId).collect()),
            QueryResult::Failed { error, message } if error == "invalid-selector" => {
                Err(SurfaceError::InvalidSelector {
                    selector: selector.to_string(),
                    message,
                })
            }
            QueryResult::Failed { error, message } => {
                Err(SurfaceError::Backend(format!("{error}: {message}")))
            }
        }
    }

    async fn describe(&self, node: NodeId) -> Result<Option<NodeInfo>, SurfaceError> {
        self.invoke("describe", &[json!(node.0)]).await
    }

    async fn is_connected(&self, node: NodeId) -> Result<bool, SurfaceError> {
        self.invoke("connected", &[json!(node.0)]).await
    }

    async fn bounding_rect(&self, node: NodeId) -> Result<Option<Rect>, SurfaceError> {
        self.invoke("rect", &[json!(node.0)]).await
    }

    async fn read_value(&self, node: NodeId) -> Result<String, SurfaceError> {
        self.invoke("readValue", &[json!(node.0)]).await
    }

    async fn write_value(&self, node: NodeId, text: &str) -> Result<(), SurfaceError> {
        self.invoke_unit("writeValue", &[json!(node.0), json!(text)]).await
    }

    async fn read_text(&self, node: NodeId) -> Result<String, SurfaceError> {
        self.invoke("readText", &[json!(node.0)]).await
    }

    async fn write_text(&self, node: NodeId, text: &str) -> Result<(), SurfaceError> {
        self.invoke_unit("writeText", &[json!(node.0), json!(text)]).await
    }

    async fn dispatch_event(&self, node: NodeId, event: &str) -> Result<(), SurfaceError> {
        self.invoke_unit("dispatch", &[json!(node.0), json!(event)]).await
    }

    async fn focus(&self, node: NodeId) -> Result<(), SurfaceError> {
        self.invoke_unit("focus", &[json!(node.0)]).await
    }

    async fn mount_control(&self, anchor: NodeId) -> Result<ControlId, SurfaceError> {
        self.invoke::<u64>("mount", &[json!(anchor.0)])
            .await
            .map(ControlId)
    }

    async fn render_control(
        &self,
        control: ControlId,
        view: &ControlView,
    ) -> Result<(), SurfaceError> {
        let (payload, labels) = Self::render_payload(view)?;
        self.invoke_unit("render", &[json!(control.0), payload, labels])
            .await
    }

    async fn remove_control(&self, control: ControlId) -> Result<(), SurfaceError> {
        self.invoke_unit("remove", &[json!(control.0)]).await
    }

    async fn show_notice(&self, notice: &Notice) -> Result<NoticeId, SurfaceError> {
        let notice = serde_json::to_value(notice).map_err(|e| SurfaceError::Backend(e.to_string()))?;
        self.invoke::<u64>("notice", &[notice]).await.map(NoticeId)
    }

    async fn dismiss_notice(&self, notice: NoticeId) -> Result<(), SurfaceError> {
        self.invoke_unit("dismissNotice", &[json!(notice.0)]).await
    }

    async fn observe(
        &self,
        options: &ObserveOptions,
    ) -> Result<mpsc::UnboundedReceiver<SurfaceEvent>, SurfaceError> {
        let events = self
            .session
            .take_events()
            .ok_or_else(|| SurfaceError::Backend("surface is already observed".to_string()))?;

        let options = serde_json::to_value(options).map_err(|e| SurfaceError::Backend(e.to_string()))?;
        self.session.add_binding(BINDING).await?;
        let script_id = self
            .session
            .add_script_on_new_document(&observing_bootstrap(&options))
            .await?;
        *self.observe_script.lock() = Some(script_id);
        self.invoke_unit("observe", &[options]).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        *self.pump.lock() = Some(Self::spawn_pump(events, tx));
        debug!(target_id = %self.session.target_id(), "Observing surface");
        Ok(rx)
    }

    async fn disconnect(&self) -> Result<(), SurfaceError> {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
        let script_id = self.observe_script.lock().take();
        if let Some(script_id) = script_id {
            self.session.remove_script_on_new_document(&script_id).await?;
        }
        self.invoke_unit("disconnect", &[]).await?;
        self.session.remove_binding(BINDING).await?;
        Ok(())
    }
}

impl Drop for CdpSurface {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;

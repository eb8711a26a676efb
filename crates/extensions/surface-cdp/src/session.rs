//! CDP page session for a single attached tab.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::Connection;
use crate::error::CdpError;
use crate::protocol::CdpResponse;

/// A flattened session attached to one page target.
pub struct PageSession {
    target_id: String,
    session_id: String,
    conn: Arc<Connection>,
    events: Mutex<Option<mpsc::UnboundedReceiver<CdpResponse>>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        conn: Arc<Connection>,
        events: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            conn,
            events: Mutex::new(Some(events)),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.conn.call(method, params, Some(&self.session_id)).await
    }

    /// Take the session's event stream. Only the first caller gets it.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<CdpResponse>> {
        self.events.lock().take()
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Evaluate a JavaScript expression and return its value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Run `source` in every future document of this tab.
    pub async fn add_script_on_new_document(&self, source: &str) -> Result<String, CdpError> {
        let result = self
            .call(
                "Page.addScriptToEvaluateOnNewDocument",
                Some(json!({ "source": source })),
            )
            .await?;
        result["identifier"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::InvalidResponse("Missing script identifier".to_string()))
    }

    pub async fn remove_script_on_new_document(&self, identifier: &str) -> Result<(), CdpError> {
        self.call(
            "Page.removeScriptToEvaluateOnNewDocument",
            Some(json!({ "identifier": identifier })),
        )
        .await?;
        Ok(())
    }

    /// Expose `window[name]` to page scripts; calls arrive as
    /// `Runtime.bindingCalled` events.
    pub async fn add_binding(&self, name: &str) -> Result<(), CdpError> {
        self.call("Runtime.addBinding", Some(json!({ "name": name })))
            .await?;
        Ok(())
    }

    pub async fn remove_binding(&self, name: &str) -> Result<(), CdpError> {
        self.call("Runtime.removeBinding", Some(json!({ "name": name })))
            .await?;
        Ok(())
    }
}

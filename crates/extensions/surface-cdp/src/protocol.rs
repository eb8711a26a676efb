//! CDP wire messages and the HTTP discovery documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CdpError;

/// Outgoing command. `session_id` routes it to an attached page.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// Incoming frame: a command reply when `id` is set, an event otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

impl CdpResponse {
    /// Event parameters, or `Null` when absent.
    pub fn params(&self) -> &Value {
        self.params.as_ref().unwrap_or(&Value::Null)
    }

    /// The command outcome carried by a reply.
    pub fn into_result(self) -> Result<Value, CdpError> {
        match self.error {
            Some(error) => Err(CdpError::Protocol {
                code: error.code,
                message: error.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// One entry of `/json/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub url: String,
}

impl PageInfo {
    /// A regular tab, as opposed to workers, extensions or devtools.
    pub fn is_page(&self) -> bool {
        self.page_type == "page"
    }

    /// Host of the tab's URL, if it has one.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// `/json/version`. Chrome spells these keys in PascalCase.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;

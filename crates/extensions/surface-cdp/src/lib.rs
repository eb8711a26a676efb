//! Chrome DevTools Protocol surface for the Prompto engine.
//!
//! Connects to a running Chrome (`--remote-debugging-port`), attaches to a
//! tab over a flattened session and installs a small in-page runtime. The
//! engine then drives the tab through [`CdpSurface`] exactly as it drives
//! the in-memory surface in tests.

mod client;
mod error;
mod protocol;
mod script;
mod session;
mod surface;

#[cfg(test)]
mod fake_browser;

pub use client::{CdpClient, DEFAULT_CALL_TIMEOUT, browser_version, list_pages};
pub use error::CdpError;
pub use protocol::{BrowserVersion, CdpResponse, PageInfo};
pub use script::{BINDING, BOOTSTRAP};
pub use session::PageSession;
pub use surface::{CdpSurface, translate_event};

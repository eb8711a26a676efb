//! `prompto attach`: one engine per Chrome tab.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use tracing::{info, warn};

use prompto_engine::{EngineHandle, ProfileRegistry, SurfaceEngine};
use prompto_surface_cdp::{CdpClient, CdpSurface, PageInfo};

use crate::context::Context;

const REAP_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) async fn handle_attach(
    ctx: &Context,
    endpoint: &str,
    target: Option<String>,
) -> anyhow::Result<()> {
    let client = CdpClient::connect(endpoint)
        .await
        .with_context(|| format!("connecting to Chrome at {}", endpoint))?;
    let profiles = Arc::new(ProfileRegistry::builtin());

    let pages = client.list_pages().await?;
    let tabs = select_tabs(pages, &profiles, target.as_deref());
    if tabs.is_empty() {
        match target {
            Some(id) => bail!("no tab with target id {}", id),
            None => bail!("no chat tabs open at {}", endpoint),
        }
    }

    let mut engines: Vec<(String, EngineHandle)> = Vec::new();
    for tab in &tabs {
        match attach_tab(ctx, &client, &profiles, tab).await {
            Ok(engine) => {
                info!(target_id = %tab.id, url = %tab.url, "Attached to tab");
                engines.push((tab.id.clone(), engine));
            }
            Err(e) => warn!(target_id = %tab.id, error = %e, "Could not attach to tab"),
        }
    }
    if engines.is_empty() {
        bail!("could not attach to any tab");
    }

    let sync = ctx.start_sync();
    info!(tabs = engines.len(), "Running; press Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut reap = tokio::time::interval(REAP_INTERVAL);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            _ = reap.tick() => {
                let (finished, running): (Vec<_>, Vec<_>) =
                    engines.into_iter().partition(|(_, engine)| engine.is_finished());
                engines = running;
                for (id, mut engine) in finished {
                    let stats = engine.wait().await;
                    info!(target_id = %id, ?stats, "Tab closed");
                }
                if engines.is_empty() {
                    break;
                }
            }
        }
    }

    for (id, engine) in engines {
        let stats = engine.stop().await;
        info!(target_id = %id, ?stats, "Detached from tab");
    }
    if let Some(sync) = sync {
        sync.abort();
    }
    Ok(())
}

/// Tabs to attach to: the named target, or every tab whose host has a
/// platform profile.
fn select_tabs(pages: Vec<PageInfo>, profiles: &ProfileRegistry, target: Option<&str>) -> Vec<PageInfo> {
    pages
        .into_iter()
        .filter(|page| match target {
            Some(id) => page.id == id,
            None => page
                .host()
                .is_some_and(|host| profiles.resolve(&host).is_some()),
        })
        .collect()
}

async fn attach_tab(
    ctx: &Context,
    client: &CdpClient,
    profiles: &Arc<ProfileRegistry>,
    tab: &PageInfo,
) -> anyhow::Result<EngineHandle> {
    let session = client.attach_page(&tab.id).await?;
    let surface = CdpSurface::attach(session).await?;
    let engine = SurfaceEngine::new(
        Arc::new(surface),
        ctx.connect(),
        profiles.clone(),
        ctx.config.engine.clone(),
    );
    Ok(engine.spawn())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, url: &str) -> PageInfo {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "type": "page",
            "title": id,
            "url": url,
        }))
        .unwrap()
    }

    #[test]
    fn test_select_tabs_by_profile() {
        let profiles = ProfileRegistry::builtin();
        let pages = vec![
            page("A", "https://chatgpt.com/c/1"),
            page("B", "https://news.example.com/"),
            page("C", "https://claude.ai/new"),
            page("D", "chrome://newtab/"),
        ];
        let ids: Vec<String> = select_tabs(pages, &profiles, None)
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn test_select_tabs_by_target() {
        let profiles = ProfileRegistry::builtin();
        let pages = vec![
            page("A", "https://chatgpt.com/"),
            page("B", "https://news.example.com/"),
        ];
        let tabs = select_tabs(pages, &profiles, Some("B"));
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].url, "https://news.example.com/");
    }
}

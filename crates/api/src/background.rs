//! Long-running tasks spawned next to the server.

use std::time::Duration;

use advisory_site_core::events::bus::EventBus;
use advisory_site_core::site::SiteData;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// How often idle cache entries are swept.
pub const GC_INTERVAL: Duration = Duration::from_secs(60);

/// Write every published event to the log.
pub fn spawn_audit_log(bus: &EventBus) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => tracing::info!(target: "audit", event = %json, "site event"),
                    Err(err) => tracing::warn!(error = %err, "could not serialize site event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "audit log fell behind the event bus");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Evict idle cache entries every `interval`.
pub fn spawn_cache_sweeper(site: SiteData, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = site.collect_garbage();
            if evicted > 0 {
                tracing::debug!(evicted, "evicted idle cache entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use advisory_site_core::config::CacheConfig;
    use advisory_site_core::fetch::ContentFetcher;
    use advisory_site_core::store::memory::MemoryContentRepository;

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_idle_entries() {
        let repo = Arc::new(MemoryContentRepository::new());
        let site = SiteData::new(ContentFetcher::new(repo), CacheConfig::default());
        site.site_content().await;
        assert_eq!(site.cached_entries(), 1);

        let sweeper = spawn_cache_sweeper(site.clone(), GC_INTERVAL);
        let gc = CacheConfig::default().site_content.gc_time;
        tokio::time::sleep(gc + GC_INTERVAL * 2).await;

        assert_eq!(site.cached_entries(), 0);
        sweeper.abort();
    }

    #[tokio::test]
    async fn audit_log_stops_when_bus_is_dropped() {
        let bus = EventBus::new(8);
        let handle = spawn_audit_log(&bus);
        assert_eq!(bus.subscriber_count(), 1);
        drop(bus);
        handle.await.unwrap();
    }
}

//! Catalog provider interface.
//!
//! A provider wraps whatever music service backs the listener's library.
//! It must hand back fully normalized [`Track`] values; the engine never
//! sees provider-specific shapes.

use crate::track::Track;
use anyhow::Result;
use async_trait::async_trait;
use log::warn;
use std::future::Future;
use std::time::Duration;

/// Kinds of catalog object a search may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
    Track,
    Artist,
    Album,
    Playlist,
}

/// Everything the engine needs from a music service.
///
/// Every method may fail; the engine decides which failures are fatal.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Makes sure the provider is ready to serve requests.
    async fn authenticate(&self) -> Result<()> {
        Ok(())
    }

    /// Up to `limit` tracks from a linked source (playlist, station, library).
    async fn fetch_tracks(&self, source_id: &str, limit: usize) -> Result<Vec<Track>>;

    /// Up to `limit` tracks matching `term`.
    async fn search_catalog(&self, term: &str, kinds: &[SearchKind], limit: usize)
        -> Result<Vec<Track>>;

    /// Catalog id of the artist called `name`, if the provider knows one.
    async fn resolve_artist(&self, name: &str) -> Result<Option<String>>;
}

/// Runs one provider call under `timeout`.
///
/// Errors and timeouts are logged and collapse to `None`; the caller
/// treats that as an empty result.
pub(crate) async fn attempt<T, Fut>(timeout: Duration, what: &str, call: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("{what} failed: {e:#}");
            None
        }
        Err(_) => {
            warn!("{what} timed out after {timeout:?}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attempt_passes_values_through() {
        let value = attempt(Duration::from_secs(1), "call", async { Ok(3) }).await;
        assert_eq!(value, Some(3));
    }

    #[tokio::test]
    async fn test_attempt_swallows_errors() {
        let value: Option<u8> = attempt(Duration::from_secs(1), "call", async {
            Err(anyhow::anyhow!("boom"))
        })
        .await;
        assert_eq!(value, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_times_out() {
        let value = attempt(Duration::from_millis(10), "slow call", async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(1)
        })
        .await;
        assert_eq!(value, None);
    }
}

use async_trait::async_trait;
use landstream_core::{FetchError, TileIndex};
use landstream_system_fetch::ContentSource;
use tracing::trace;

/// URL of the payload for `index` below `base_url`.
#[must_use]
pub fn content_url(base_url: &str, index: TileIndex) -> String {
    format!(
        "{}/{}.{}.lnd",
        base_url.trim_end_matches('/'),
        index.x(),
        index.z()
    )
}

/// Downloads tile payloads with plain `GET` requests.
#[derive(Clone, Debug)]
pub struct HttpContentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentSource {
    /// Creates a content source rooted at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Base URL payloads are fetched from.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch(&self, index: TileIndex, _hash: &str) -> Result<Vec<u8>, FetchError> {
        let url = content_url(&self.base_url, index);
        trace!(%index, %url, "downloading payload");
        let bytes = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(FetchError::network)?
            .bytes()
            .await
            .map_err(FetchError::network)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_names_tile_by_coordinates() {
        assert_eq!(
            content_url("https://decentraland.org/content", TileIndex::new(-4, 12)),
            "https://decentraland.org/content/-4.12.lnd"
        );
        assert_eq!(
            content_url("http://lvh.me/tiles/", TileIndex::ORIGIN),
            "http://lvh.me/tiles/0.0.lnd"
        );
    }

    #[tokio::test]
    async fn unsupported_scheme_is_a_network_failure() {
        let client = crate::build_client(None).expect("client");
        let source = HttpContentSource::new(client, "ftp://mirror.invalid/tiles");

        let outcome = source.fetch(TileIndex::new(1, 1), "hash").await;
        assert!(matches!(outcome, Err(FetchError::Network(_))));
    }
}

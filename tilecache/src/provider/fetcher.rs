//! Remote tile retrieval.

use std::future::Future;
use std::sync::Arc;

use tracing::trace;

use crate::coord::TileIndex;
use crate::error::{FetchError, TileError};
use crate::provider::http::{AsyncHttpClient, FetchFn, FnClient, ReqwestClient};
use crate::provider::template::UrlTemplate;

/// Produces the raw bytes of one tile.
///
/// No retries happen at this layer; retry policy belongs to the caller.
pub trait TileFetcher: Send + Sync {
    /// Fetches the tile at `index`.
    ///
    /// # Errors
    ///
    /// `FetchFailed` carrying the resolved address and the transport cause.
    fn fetch(&self, index: &TileIndex) -> impl Future<Output = Result<Vec<u8>, TileError>> + Send;
}

impl<F: TileFetcher> TileFetcher for Arc<F> {
    fn fetch(&self, index: &TileIndex) -> impl Future<Output = Result<Vec<u8>, TileError>> + Send {
        (**self).fetch(index)
    }
}

/// Fetcher that resolves a [`UrlTemplate`] and hands the address to a
/// transport.
///
/// # Example
///
/// ```no_run
/// use tilecache::provider::{HttpTileFetcher, UrlTemplate};
///
/// let template = UrlTemplate::simple("https://tile.openstreetmap.org/{z}/{x}/{y}.png")?;
/// let fetcher = HttpTileFetcher::new(template)?;
/// # Ok::<(), tilecache::TileError>(())
/// ```
pub struct HttpTileFetcher<C: AsyncHttpClient> {
    template: UrlTemplate,
    client: C,
}

impl HttpTileFetcher<ReqwestClient> {
    /// Creates a fetcher using a default reqwest client.
    pub fn new(template: UrlTemplate) -> Result<Self, TileError> {
        Ok(Self::with_client(template, ReqwestClient::new()?))
    }
}

impl HttpTileFetcher<FnClient> {
    /// Creates a fetcher whose transport is entirely replaced by `fetch`.
    ///
    /// The function receives the resolved address.
    pub fn with_fetch_fn<F, Fut>(template: UrlTemplate, fetch: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>, FetchError>> + Send + 'static,
    {
        Self::with_client(template, FnClient::new(fetch))
    }

    /// Like [`with_fetch_fn`](Self::with_fetch_fn) for an already boxed function.
    pub fn with_boxed_fetch_fn(template: UrlTemplate, fetch: FetchFn) -> Self {
        Self::with_client(template, FnClient::from_fn(fetch))
    }
}

impl<C: AsyncHttpClient> HttpTileFetcher<C> {
    pub fn with_client(template: UrlTemplate, client: C) -> Self {
        Self { template, client }
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: AsyncHttpClient> TileFetcher for HttpTileFetcher<C> {
    async fn fetch(&self, index: &TileIndex) -> Result<Vec<u8>, TileError> {
        let url = self.template.resolve(index);
        trace!(url = %url, "Fetching tile");

        let result = self.client.get(&url).await;
        result.map_err(|source| TileError::FetchFailed { url, source })
    }
}

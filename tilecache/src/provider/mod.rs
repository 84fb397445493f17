//! Remote tile retrieval.
//!
//! This module provides the [`TileFetcher`] capability and its HTTP-backed
//! implementation. A fetcher resolves an addressing [`UrlTemplate`] for a
//! tile index and hands the address to a transport:
//!
//! - [`ReqwestClient`]: real network access with timeout and header injection
//! - [`FnClient`]: a caller-supplied function replacing the transport
//! - [`HttpTransport`]: either of the above, picked at runtime
//!
//! ```ignore
//! use tilecache::provider::{HttpTileFetcher, UrlTemplate};
//!
//! let template = UrlTemplate::new(
//!     "http://{s}.tile.example.org/{z}/{x}/{y}.png",
//!     vec!["a".into(), "b".into(), "c".into()],
//!     None,
//! )?;
//! let fetcher = HttpTileFetcher::new(template)?;
//! let bytes = fetcher.fetch(&TileIndex::new(3, 4, 2)).await?;
//! ```

mod fetcher;
mod http;
mod template;

pub use fetcher::{HttpTileFetcher, TileFetcher};
pub use http::{
    AsyncHttpClient, FetchFn, FnClient, HttpConfig, HttpTransport, ReqwestClient, DEFAULT_TIMEOUT,
};
pub use template::UrlTemplate;

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;

//! INI-backed tile source configuration.
//!
//! A configuration file describes one source and its disk cache:
//!
//! ```ini
//! [source]
//! name = osm
//! url = https://{s}.tile.example.org/{z}/{x}/{y}.png
//! subdomains = a, b, c
//! user_agent = my-map/1.0
//! min_zoom = 0
//! max_zoom = 18
//! timeout_secs = 30
//!
//! [cache]
//! directory = /var/cache/tiles/osm
//! format = png
//! expiration_secs = 86400
//! max_concurrent_io = 64
//! ```
//!
//! Instead of `url`, `known = BingAerial` selects a catalog entry (which
//! then also needs `api_key`). Without `directory`, tiles are cached under
//! the platform cache directory in `tilecache/<name>`. Setting
//! `enabled = false` in `[cache]` disables persistence, and an
//! `expiration_secs` of 0 keeps entries forever.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ini::{Ini, Properties};
use tracing::info;

use crate::cache::{
    CacheExpiration, DiskTileCache, NullCache, PersistentCache, DEFAULT_MAX_CONCURRENT_IO,
};
use crate::catalog::{create_known_source, KnownSourceOptions, KnownTileSource, DEFAULT_MAX_ZOOM};
use crate::error::TileError;
use crate::provider::{
    FetchFn, HttpConfig, HttpTileFetcher, HttpTransport, UrlTemplate, DEFAULT_TIMEOUT,
};
use crate::schema::TileSchema;
use crate::source::{CachingTileSource, RemoteTileSource};

/// Directory under the platform cache directory holding default caches.
pub const CACHE_DIR_NAME: &str = "tilecache";

/// Default image format for template sources.
pub const DEFAULT_FORMAT: &str = "png";

/// `[source]` section.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceSection {
    pub name: Option<String>,
    /// Addressing template for a custom source.
    pub url: Option<String>,
    /// Catalog entry, as an alternative to `url`.
    pub known: Option<KnownTileSource>,
    pub subdomains: Vec<String>,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub timeout: Duration,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            name: None,
            url: None,
            known: None,
            subdomains: Vec::new(),
            api_key: None,
            user_agent: None,
            min_zoom: 0,
            max_zoom: DEFAULT_MAX_ZOOM,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// `[cache]` section.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheSection {
    pub enabled: bool,
    pub directory: Option<PathBuf>,
    pub format: Option<String>,
    pub expiration: CacheExpiration,
    pub max_concurrent_io: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            format: None,
            expiration: CacheExpiration::Never,
            max_concurrent_io: DEFAULT_MAX_CONCURRENT_IO,
        }
    }
}

/// Parsed configuration for one tile source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileSourceConfig {
    pub source: SourceSection,
    pub cache: CacheSection,
}

impl TileSourceConfig {
    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TileError> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path).map_err(|e| {
            TileError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_ini(&ini)
    }

    /// Parses configuration text.
    pub fn from_ini_str(text: &str) -> Result<Self, TileError> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| TileError::config(format!("malformed config: {}", e)))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, TileError> {
        let mut config = TileSourceConfig::default();

        if let Some(section) = ini.section(Some("source")) {
            let source = &mut config.source;
            source.name = text(section, "name");
            source.url = text(section, "url");
            source.known = parse(section, "source", "known")?;
            source.subdomains = section
                .get("subdomains")
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            source.api_key = text(section, "api_key");
            source.user_agent = text(section, "user_agent");
            if let Some(zoom) = parse(section, "source", "min_zoom")? {
                source.min_zoom = zoom;
            }
            if let Some(zoom) = parse(section, "source", "max_zoom")? {
                source.max_zoom = zoom;
            }
            if let Some(secs) = parse(section, "source", "timeout_secs")? {
                source.timeout = Duration::from_secs(secs);
            }
        }

        if let Some(section) = ini.section(Some("cache")) {
            let cache = &mut config.cache;
            if let Some(enabled) = parse(section, "cache", "enabled")? {
                cache.enabled = enabled;
            }
            cache.directory = text(section, "directory").map(PathBuf::from);
            cache.format = text(section, "format");
            if let Some(secs) = parse(section, "cache", "expiration_secs")? {
                cache.expiration = CacheExpiration::from_duration(Duration::from_secs(secs));
            }
            if let Some(n) = parse(section, "cache", "max_concurrent_io")? {
                cache.max_concurrent_io = n;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), TileError> {
        match (&self.source.url, &self.source.known) {
            (Some(_), Some(_)) => Err(TileError::config(
                "[source] sets both 'url' and 'known'; choose one",
            )),
            (None, None) => Err(TileError::config("[source] needs either 'url' or 'known'")),
            (Some(_), None) if self.source.name.is_none() => {
                Err(TileError::config("[source] 'name' is required with 'url'"))
            }
            _ if self.source.min_zoom > self.source.max_zoom => Err(TileError::config(format!(
                "[source] min_zoom {} exceeds max_zoom {}",
                self.source.min_zoom, self.source.max_zoom
            ))),
            _ => Ok(()),
        }
    }

    /// Name used for logging and the default cache directory.
    pub fn source_name(&self) -> String {
        match (&self.source.name, &self.source.known) {
            (Some(name), _) => name.clone(),
            (None, Some(known)) => known.name().to_string(),
            (None, None) => String::new(),
        }
    }

    /// File extension of cached tiles.
    pub fn format(&self) -> String {
        match (&self.cache.format, &self.source.known) {
            (Some(format), _) => format.clone(),
            (None, Some(known)) => known.params().format.to_string(),
            (None, None) => DEFAULT_FORMAT.to_string(),
        }
    }

    /// Configured cache directory, or `<platform cache dir>/tilecache/<name>`.
    pub fn cache_directory(&self) -> Result<PathBuf, TileError> {
        if let Some(dir) = &self.cache.directory {
            return Ok(dir.clone());
        }
        dirs::cache_dir()
            .map(|base| base.join(CACHE_DIR_NAME).join(self.source_name()))
            .ok_or_else(|| TileError::config("no platform cache directory; set [cache] directory"))
    }

    /// Opens the configured persistent cache.
    pub fn open_cache(&self) -> Result<Arc<dyn PersistentCache>, TileError> {
        if !self.cache.enabled {
            return Ok(Arc::new(NullCache));
        }
        let cache =
            DiskTileCache::new(self.cache_directory()?, self.format(), self.cache.expiration)?
                .with_max_concurrent_io(self.cache.max_concurrent_io);
        Ok(Arc::new(cache))
    }

    /// Builds the configured source with the network transport.
    pub fn build(&self) -> Result<RemoteTileSource, TileError> {
        self.build_source(None)
    }

    /// Builds the configured source with `fetch` replacing the transport.
    pub fn build_with_fetch_fn(&self, fetch: FetchFn) -> Result<RemoteTileSource, TileError> {
        self.build_source(Some(fetch))
    }

    fn build_source(&self, fetch: Option<FetchFn>) -> Result<RemoteTileSource, TileError> {
        let cache = self.open_cache()?;
        let name = self.source_name();

        let source = match (&self.source.known, &self.source.url) {
            (Some(known), _) => {
                let mut options = KnownSourceOptions::default()
                    .with_cache(cache)
                    .with_timeout(self.source.timeout)
                    .with_zoom_range(self.source.min_zoom, self.source.max_zoom);
                options.api_key = self.source.api_key.clone();
                options.user_agent = self.source.user_agent.clone();
                options.fetch_fn = fetch;
                create_known_source(*known, options)?.with_name(name.clone())
            }
            (None, Some(url)) => {
                let template = UrlTemplate::new(
                    url,
                    self.source.subdomains.clone(),
                    self.source.api_key.clone(),
                )?;
                let mut http = HttpConfig::default().with_timeout(self.source.timeout);
                if let Some(agent) = &self.source.user_agent {
                    http = http.with_user_agent(agent.clone());
                }
                let transport = HttpTransport::select(fetch, &http)?;
                let schema = TileSchema::global_spherical_mercator(
                    self.source.min_zoom,
                    self.source.max_zoom,
                )?
                .with_name(name.clone())
                .with_format(self.format());

                CachingTileSource::new(schema, HttpTileFetcher::with_client(template, transport))
                    .with_cache(cache)
            }
            (None, None) => {
                return Err(TileError::config("[source] needs either 'url' or 'known'"))
            }
        };

        info!(
            source = %name,
            cache_enabled = self.cache.enabled,
            expiration = %self.cache.expiration,
            "Tile source configured"
        );
        Ok(source)
    }
}

fn text(section: &Properties, key: &str) -> Option<String> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse<T>(section: &Properties, section_name: &str, key: &str) -> Result<Option<T>, TileError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match text(section, key) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|e| {
            TileError::config(format!(
                "invalid value '{}' for [{}] {}: {}",
                raw, section_name, key, e
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoxFuture;
    use crate::coord::TileIndex;
    use crate::error::FetchError;
    use crate::source::TileSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type FetchFuture = BoxFuture<'static, Result<Vec<u8>, FetchError>>;

    #[test]
    fn test_parse_full_template_config() {
        let config = TileSourceConfig::from_ini_str(
            r#"
[source]
name = osm
url = https://{s}.tile.example.org/{z}/{x}/{y}.png
subdomains = a, b ,c
user_agent = tests/1.0
min_zoom = 2
max_zoom = 15
timeout_secs = 10

[cache]
directory = /tmp/tiles/osm
format = jpg
expiration_secs = 3600
max_concurrent_io = 8
"#,
        )
        .unwrap();

        assert_eq!(config.source.name.as_deref(), Some("osm"));
        assert_eq!(config.source.subdomains, vec!["a", "b", "c"]);
        assert_eq!(config.source.min_zoom, 2);
        assert_eq!(config.source.max_zoom, 15);
        assert_eq!(config.source.timeout, Duration::from_secs(10));
        assert_eq!(config.cache.directory, Some(PathBuf::from("/tmp/tiles/osm")));
        assert_eq!(config.format(), "jpg");
        assert_eq!(
            config.cache.expiration,
            CacheExpiration::After(Duration::from_secs(3600))
        );
        assert_eq!(config.cache.max_concurrent_io, 8);
    }

    #[test]
    fn test_known_source_defaults() {
        let config = TileSourceConfig::from_ini_str("[source]\nknown = EsriWorldTopo\n").unwrap();

        assert_eq!(config.source.known, Some(KnownTileSource::EsriWorldTopo));
        assert_eq!(config.source_name(), "EsriWorldTopo");
        assert_eq!(config.format(), "jpg");
        assert_eq!(config.cache.expiration, CacheExpiration::Never);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_zero_expiration_never_expires() {
        let config = TileSourceConfig::from_ini_str(
            "[source]\nknown = OpenStreetMap\n[cache]\nexpiration_secs = 0\n",
        )
        .unwrap();
        assert_eq!(config.cache.expiration, CacheExpiration::Never);
    }

    #[test]
    fn test_default_cache_directory_uses_name() {
        let config = TileSourceConfig::from_ini_str("[source]\nknown = OpenStreetMap\n").unwrap();
        if let Some(base) = dirs::cache_dir() {
            assert_eq!(
                config.cache_directory().unwrap(),
                base.join("tilecache").join("OpenStreetMap")
            );
        }
    }

    #[test]
    fn test_rejects_invalid_values() {
        let bad_zoom =
            TileSourceConfig::from_ini_str("[source]\nknown = OpenStreetMap\nmax_zoom = high\n");
        assert!(matches!(bad_zoom, Err(TileError::SchemaConfiguration(_))));

        let unknown = TileSourceConfig::from_ini_str("[source]\nknown = Nowhere\n");
        assert!(unknown.is_err());

        let inverted = TileSourceConfig::from_ini_str(
            "[source]\nknown = OpenStreetMap\nmin_zoom = 9\nmax_zoom = 3\n",
        );
        assert!(inverted.is_err());
    }

    #[test]
    fn test_rejects_ambiguous_or_missing_source() {
        assert!(TileSourceConfig::from_ini_str("[cache]\nformat = png\n").is_err());
        assert!(TileSourceConfig::from_ini_str(
            "[source]\nname = x\nurl = http://h/{z}/{x}/{y}\nknown = OpenStreetMap\n"
        )
        .is_err());
        assert!(TileSourceConfig::from_ini_str("[source]\nurl = http://h/{z}/{x}/{y}\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("source.ini");
        std::fs::write(&path, "[source]\nknown = StamenToner\n").unwrap();

        let config = TileSourceConfig::load(&path).unwrap();
        assert_eq!(config.source.known, Some(KnownTileSource::StamenToner));

        assert!(TileSourceConfig::load(temp_dir.path().join("missing.ini")).is_err());
    }

    #[tokio::test]
    async fn test_build_caches_in_configured_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let text = format!(
            "[source]\nname = local\nurl = mem://{{z}}/{{x}}/{{y}}\nmax_zoom = 8\n[cache]\ndirectory = {}\n",
            temp_dir.path().display()
        );
        let config = TileSourceConfig::from_ini_str(&text).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetch: FetchFn = Arc::new(move |url: String| -> FetchFuture {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(url.into_bytes()) })
        });

        let source = config.build_with_fetch_fn(fetch).unwrap();
        assert_eq!(source.name(), "local");
        assert_eq!(source.schema().max_zoom(), 8);

        let index = TileIndex::new(4, 3, 2);
        assert_eq!(source.fetch_tile(&index).await.unwrap(), b"mem://4/3/2".to_vec());
        assert_eq!(source.fetch_tile(&index).await.unwrap(), b"mem://4/3/2".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(temp_dir.path().join("4").join("3").join("2.png").is_file());
    }

    #[tokio::test]
    async fn test_build_with_oversized_io_limit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let text = format!(
            "[source]\nname = wide\nurl = mem://{{z}}/{{x}}/{{y}}\n[cache]\ndirectory = {}\nmax_concurrent_io = {}\n",
            temp_dir.path().display(),
            usize::MAX
        );
        let config = TileSourceConfig::from_ini_str(&text).unwrap();
        assert_eq!(config.cache.max_concurrent_io, usize::MAX);

        let fetch: FetchFn = Arc::new(|_url: String| -> FetchFuture {
            Box::pin(async { Ok(vec![5]) })
        });
        let source = config.build_with_fetch_fn(fetch).unwrap();
        assert_eq!(source.fetch_tile(&TileIndex::new(2, 0, 0)).await.unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn test_build_without_cache() {
        let config = TileSourceConfig::from_ini_str(
            "[source]\nname = nocache\nurl = mem://{z}/{x}/{y}\n[cache]\nenabled = false\n",
        )
        .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let fetch: FetchFn = Arc::new(move |_url: String| -> FetchFuture {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(vec![7]) })
        });

        let source = config.build_with_fetch_fn(fetch).unwrap();
        let index = TileIndex::new(1, 1, 1);
        source.fetch_tile(&index).await.unwrap();
        source.fetch_tile(&index).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

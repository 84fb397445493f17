//! Preconfigured remote tile sources.
//!
//! The catalog is plain data: [`KnownTileSource::params`] maps each key to an
//! immutable [`KnownSourceParams`] record, and [`create_known_source`] turns
//! a record plus caller options into a ready [`RemoteTileSource`]. Nothing in
//! the engine depends on this module.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::{NullCache, PersistentCache};
use crate::coord::Extent;
use crate::error::TileError;
use crate::provider::{
    FetchFn, HttpConfig, HttpTileFetcher, HttpTransport, UrlTemplate, DEFAULT_TIMEOUT,
};
use crate::schema::TileSchema;
use crate::source::{Attribution, CachingTileSource, RemoteTileSource};

const OSM_ATTRIBUTION: (&str, &str) = (
    "© OpenStreetMap contributors",
    "https://www.openstreetmap.org/copyright",
);
const MICROSOFT_ATTRIBUTION: (&str, &str) = ("© Microsoft", "");
const BKG_ATTRIBUTION: (&str, &str) = (
    "© Bundesamt für Kartographie und Geodäsie",
    "https://sg.geodatenzentrum.de/web_public/Datenquellen_TopPlus_Open.pdf",
);
const NO_ATTRIBUTION: (&str, &str) = ("", "");

const ABC: &[&str] = &["a", "b", "c"];
const ABCD: &[&str] = &["a", "b", "c", "d"];
const BING_SERVERS: &[&str] = &["0", "1", "2", "3", "4", "5", "6", "7"];

/// Default upper zoom requested when the caller does not narrow it.
pub const DEFAULT_MAX_ZOOM: u8 = 20;

/// Well-known tile services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KnownTileSource {
    #[default]
    OpenStreetMap,
    OpenCycleMap,
    OpenCycleMapTransport,
    BingAerial,
    BingHybrid,
    BingRoads,
    BingAerialStaging,
    BingHybridStaging,
    BingRoadsStaging,
    StamenToner,
    StamenTonerLite,
    StamenWatercolor,
    StamenTerrain,
    EsriWorldTopo,
    EsriWorldPhysical,
    EsriWorldShadedRelief,
    EsriWorldReferenceOverlay,
    EsriWorldTransportation,
    EsriWorldBoundariesAndPlaces,
    EsriWorldDarkGrayBase,
    BkgTopPlusColor,
    BkgTopPlusGrey,
}

/// Construction parameters for one known source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnownSourceParams {
    pub url_template: &'static str,
    pub subdomains: &'static [&'static str],
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Content extent when the source covers only part of the world.
    pub extent: Option<Extent>,
    /// File extension of the served images.
    pub format: &'static str,
    pub attribution: (&'static str, &'static str),
}

impl KnownSourceParams {
    const fn osm_style(
        url_template: &'static str,
        subdomains: &'static [&'static str],
        max_zoom: u8,
    ) -> Self {
        Self {
            url_template,
            subdomains,
            min_zoom: 0,
            max_zoom,
            extent: None,
            format: "png",
            attribution: OSM_ATTRIBUTION,
        }
    }

    const fn bing(url_template: &'static str, attribution: (&'static str, &'static str)) -> Self {
        Self {
            url_template,
            subdomains: BING_SERVERS,
            min_zoom: 1,
            max_zoom: 19,
            extent: None,
            format: "jpg",
            attribution,
        }
    }

    const fn esri(url_template: &'static str, max_zoom: u8) -> Self {
        Self {
            url_template,
            subdomains: &[],
            min_zoom: 0,
            max_zoom,
            extent: None,
            format: "jpg",
            attribution: NO_ATTRIBUTION,
        }
    }

    const fn bkg(url_template: &'static str) -> Self {
        Self {
            url_template,
            subdomains: &[],
            min_zoom: 0,
            max_zoom: 19,
            extent: None,
            format: "png",
            attribution: BKG_ATTRIBUTION,
        }
    }

    pub fn attribution(&self) -> Attribution {
        Attribution::new(self.attribution.0, self.attribution.1)
    }

    /// Whether the template carries an API key token.
    pub fn requires_api_key(&self) -> bool {
        self.url_template.contains("{k}")
    }
}

impl KnownTileSource {
    pub const ALL: [KnownTileSource; 22] = [
        KnownTileSource::OpenStreetMap,
        KnownTileSource::OpenCycleMap,
        KnownTileSource::OpenCycleMapTransport,
        KnownTileSource::BingAerial,
        KnownTileSource::BingHybrid,
        KnownTileSource::BingRoads,
        KnownTileSource::BingAerialStaging,
        KnownTileSource::BingHybridStaging,
        KnownTileSource::BingRoadsStaging,
        KnownTileSource::StamenToner,
        KnownTileSource::StamenTonerLite,
        KnownTileSource::StamenWatercolor,
        KnownTileSource::StamenTerrain,
        KnownTileSource::EsriWorldTopo,
        KnownTileSource::EsriWorldPhysical,
        KnownTileSource::EsriWorldShadedRelief,
        KnownTileSource::EsriWorldReferenceOverlay,
        KnownTileSource::EsriWorldTransportation,
        KnownTileSource::EsriWorldBoundariesAndPlaces,
        KnownTileSource::EsriWorldDarkGrayBase,
        KnownTileSource::BkgTopPlusColor,
        KnownTileSource::BkgTopPlusGrey,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            KnownTileSource::OpenStreetMap => "OpenStreetMap",
            KnownTileSource::OpenCycleMap => "OpenCycleMap",
            KnownTileSource::OpenCycleMapTransport => "OpenCycleMapTransport",
            KnownTileSource::BingAerial => "BingAerial",
            KnownTileSource::BingHybrid => "BingHybrid",
            KnownTileSource::BingRoads => "BingRoads",
            KnownTileSource::BingAerialStaging => "BingAerialStaging",
            KnownTileSource::BingHybridStaging => "BingHybridStaging",
            KnownTileSource::BingRoadsStaging => "BingRoadsStaging",
            KnownTileSource::StamenToner => "StamenToner",
            KnownTileSource::StamenTonerLite => "StamenTonerLite",
            KnownTileSource::StamenWatercolor => "StamenWatercolor",
            KnownTileSource::StamenTerrain => "StamenTerrain",
            KnownTileSource::EsriWorldTopo => "EsriWorldTopo",
            KnownTileSource::EsriWorldPhysical => "EsriWorldPhysical",
            KnownTileSource::EsriWorldShadedRelief => "EsriWorldShadedRelief",
            KnownTileSource::EsriWorldReferenceOverlay => "EsriWorldReferenceOverlay",
            KnownTileSource::EsriWorldTransportation => "EsriWorldTransportation",
            KnownTileSource::EsriWorldBoundariesAndPlaces => "EsriWorldBoundariesAndPlaces",
            KnownTileSource::EsriWorldDarkGrayBase => "EsriWorldDarkGrayBase",
            KnownTileSource::BkgTopPlusColor => "BKGTopPlusColor",
            KnownTileSource::BkgTopPlusGrey => "BKGTopPlusGrey",
        }
    }

    /// Construction parameters for this source.
    pub fn params(&self) -> KnownSourceParams {
        match self {
            KnownTileSource::OpenStreetMap => KnownSourceParams::osm_style(
                "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
                &[],
                18,
            ),
            KnownTileSource::OpenCycleMap => KnownSourceParams::osm_style(
                "http://{s}.tile.opencyclemap.org/cycle/{z}/{x}/{y}.png",
                ABC,
                17,
            ),
            KnownTileSource::OpenCycleMapTransport => KnownSourceParams::osm_style(
                "http://{s}.tile2.opencyclemap.org/transport/{z}/{x}/{y}.png",
                ABC,
                20,
            ),
            KnownTileSource::BingAerial => KnownSourceParams::bing(
                "https://t{s}.tiles.virtualearth.net/tiles/a{quadkey}.jpeg?g=517&token={k}",
                MICROSOFT_ATTRIBUTION,
            ),
            KnownTileSource::BingHybrid => KnownSourceParams::bing(
                "https://t{s}.tiles.virtualearth.net/tiles/h{quadkey}.jpeg?g=517&token={k}",
                MICROSOFT_ATTRIBUTION,
            ),
            KnownTileSource::BingRoads => KnownSourceParams::bing(
                "https://t{s}.tiles.virtualearth.net/tiles/r{quadkey}.jpeg?g=517&token={k}",
                MICROSOFT_ATTRIBUTION,
            ),
            KnownTileSource::BingAerialStaging => KnownSourceParams::bing(
                "http://t{s}.staging.tiles.virtualearth.net/tiles/a{quadkey}.jpeg?g=517&token={k}",
                NO_ATTRIBUTION,
            ),
            KnownTileSource::BingHybridStaging => KnownSourceParams::bing(
                "http://t{s}.staging.tiles.virtualearth.net/tiles/h{quadkey}.jpeg?g=517&token={k}",
                NO_ATTRIBUTION,
            ),
            KnownTileSource::BingRoadsStaging => KnownSourceParams::bing(
                "http://t{s}.staging.tiles.virtualearth.net/tiles/r{quadkey}.jpeg?g=517&token={k}",
                NO_ATTRIBUTION,
            ),
            KnownTileSource::StamenToner => KnownSourceParams::osm_style(
                "http://{s}.tile.stamen.com/toner/{z}/{x}/{y}.png",
                ABCD,
                19,
            ),
            KnownTileSource::StamenTonerLite => KnownSourceParams::osm_style(
                "http://{s}.tile.stamen.com/toner-lite/{z}/{x}/{y}.png",
                ABCD,
                19,
            ),
            KnownTileSource::StamenWatercolor => KnownSourceParams::osm_style(
                "http://{s}.tile.stamen.com/watercolor/{z}/{x}/{y}.png",
                ABCD,
                19,
            ),
            KnownTileSource::StamenTerrain => KnownSourceParams {
                min_zoom: 4,
                extent: Some(Extent {
                    min_x: -14871588.04,
                    min_y: 2196494.41775,
                    max_x: -5831227.94199995,
                    max_y: 10033429.95725,
                }),
                ..KnownSourceParams::osm_style(
                    "http://{s}.tile.stamen.com/terrain/{z}/{x}/{y}.png",
                    ABCD,
                    19,
                )
            },
            KnownTileSource::EsriWorldTopo => KnownSourceParams::esri(
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Topo_Map/MapServer/tile/{z}/{y}/{x}",
                19,
            ),
            KnownTileSource::EsriWorldPhysical => KnownSourceParams::esri(
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Physical_Map/MapServer/tile/{z}/{y}/{x}",
                8,
            ),
            KnownTileSource::EsriWorldShadedRelief => KnownSourceParams::esri(
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Shaded_Relief/MapServer/tile/{z}/{y}/{x}",
                13,
            ),
            KnownTileSource::EsriWorldReferenceOverlay => KnownSourceParams::esri(
                "https://server.arcgisonline.com/ArcGIS/rest/services/Reference/World_Reference_Overlay/MapServer/tile/{z}/{y}/{x}",
                13,
            ),
            KnownTileSource::EsriWorldTransportation => KnownSourceParams::esri(
                "https://server.arcgisonline.com/ArcGIS/rest/services/Reference/World_Transportation/MapServer/tile/{z}/{y}/{x}",
                19,
            ),
            KnownTileSource::EsriWorldBoundariesAndPlaces => KnownSourceParams::esri(
                "https://server.arcgisonline.com/ArcGIS/rest/services/Reference/World_Boundaries_and_Places/MapServer/tile/{z}/{y}/{x}",
                19,
            ),
            KnownTileSource::EsriWorldDarkGrayBase => KnownSourceParams::esri(
                "https://server.arcgisonline.com/arcgis/rest/services/Canvas/World_Dark_Gray_Base/MapServer/tile/{z}/{y}/{x}",
                16,
            ),
            KnownTileSource::BkgTopPlusColor => KnownSourceParams::bkg(
                "https://sg.geodatenzentrum.de/wmts_topplus_open/tile/1.0.0/web_scale/default/WEBMERCATOR/{z}/{y}/{x}.png",
            ),
            KnownTileSource::BkgTopPlusGrey => KnownSourceParams::bkg(
                "https://sg.geodatenzentrum.de/wmts_topplus_open/tile/1.0.0/web_scale_grau/default/WEBMERCATOR/{z}/{y}/{x}.png",
            ),
        }
    }
}

impl fmt::Display for KnownTileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KnownTileSource {
    type Err = TileError;

    /// Parses a source name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        KnownTileSource::ALL
            .into_iter()
            .find(|source| source.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TileError::config(format!("unknown tile source '{}'", wanted)))
    }
}

/// Caller choices applied on top of a known source's parameters.
#[derive(Clone)]
pub struct KnownSourceOptions {
    pub api_key: Option<String>,
    pub cache: Arc<dyn PersistentCache>,
    /// Replaces the network transport when set.
    pub fetch_fn: Option<FetchFn>,
    pub user_agent: Option<String>,
    pub timeout: Duration,
    /// Lowest level wanted; raised to the source's minimum if lower.
    pub min_zoom: u8,
    /// Highest level wanted; lowered to the source's maximum if higher.
    pub max_zoom: u8,
}

impl Default for KnownSourceOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            cache: Arc::new(NullCache),
            fetch_fn: None,
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
            min_zoom: 0,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl KnownSourceOptions {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn PersistentCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_fetch_fn(mut self, fetch_fn: FetchFn) -> Self {
        self.fetch_fn = Some(fetch_fn);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }
}

/// Builds a caching source for a well-known service.
///
/// The caller's zoom range is clamped to what the service offers.
///
/// # Errors
///
/// `SchemaConfiguration` if the clamped range is empty, the service needs an
/// API key and none was given, or the HTTP client cannot be built.
///
/// # Example
///
/// ```no_run
/// use tilecache::catalog::{create_known_source, KnownSourceOptions, KnownTileSource};
///
/// let options = KnownSourceOptions::default().with_user_agent("my-map/1.0");
/// let source = create_known_source(KnownTileSource::OpenStreetMap, options)?;
/// # Ok::<(), tilecache::TileError>(())
/// ```
pub fn create_known_source(
    source: KnownTileSource,
    options: KnownSourceOptions,
) -> Result<RemoteTileSource, TileError> {
    let params = source.params();
    let min_zoom = options.min_zoom.max(params.min_zoom);
    let max_zoom = options.max_zoom.min(params.max_zoom);

    let mut schema = TileSchema::global_spherical_mercator(min_zoom, max_zoom)?
        .with_name(source.name())
        .with_format(params.format);
    if let Some(extent) = params.extent {
        schema = schema.with_extent(extent)?;
    }

    let subdomains = params.subdomains.iter().map(|s| s.to_string()).collect();
    let template = UrlTemplate::new(params.url_template, subdomains, options.api_key)?;

    let mut http = HttpConfig::default().with_timeout(options.timeout);
    if let Some(agent) = options.user_agent {
        http = http.with_user_agent(agent);
    }
    let transport = HttpTransport::select(options.fetch_fn, &http)?;

    info!(
        source = %source,
        min_zoom,
        max_zoom,
        override_fetch = transport.is_override(),
        "Created known tile source"
    );

    Ok(
        CachingTileSource::new(schema, HttpTileFetcher::with_client(template, transport))
            .with_cache(options.cache)
            .with_attribution(params.attribution()),
    )
}

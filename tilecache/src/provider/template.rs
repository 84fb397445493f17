//! Addressing templates.
//!
//! A template is a URL-like pattern with substitution tokens:
//!
//! | Token                | Replaced by                                   |
//! |----------------------|-----------------------------------------------|
//! | `{z}` / `{zoom}`     | level                                         |
//! | `{x}`                | column                                        |
//! | `{y}`                | row                                           |
//! | `{-y}`               | row in the opposite y-axis convention         |
//! | `{s}`                | next sub-domain, round-robin                  |
//! | `{k}`                | API key                                       |
//! | `{quadkey}`          | quadkey of the index                          |
//!
//! Token names are case-insensitive. Substitution is purely textual; nothing
//! is escaped. The template is parsed once at construction so malformed
//! patterns fail early rather than per request.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use regex::Regex;

use crate::coord::{quadkey, TileIndex};
use crate::error::TileError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Zoom,
    Col,
    Row,
    FlippedRow,
    Subdomain,
    ApiKey,
    Quadkey,
}

/// Parsed addressing template with its sub-domain rotation and key.
///
/// # Example
///
/// ```
/// use tilecache::coord::TileIndex;
/// use tilecache::provider::UrlTemplate;
///
/// let template = UrlTemplate::simple("https://tile.openstreetmap.org/{z}/{x}/{y}.png").unwrap();
/// assert_eq!(
///     template.resolve(&TileIndex::new(3, 4, 2)),
///     "https://tile.openstreetmap.org/3/4/2.png"
/// );
/// ```
#[derive(Debug)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
    subdomains: Vec<String>,
    api_key: Option<String>,
    next_subdomain: AtomicUsize,
}

impl UrlTemplate {
    /// Parses a template.
    ///
    /// # Errors
    ///
    /// `SchemaConfiguration` for unknown tokens, unbalanced braces, a `{s}`
    /// token without sub-domains, or a `{k}` token without an API key.
    pub fn new(
        template: &str,
        subdomains: Vec<String>,
        api_key: Option<String>,
    ) -> Result<Self, TileError> {
        let token_re = Regex::new(r"\{([^{}]*)\}")
            .map_err(|e| TileError::config(format!("token pattern: {}", e)))?;

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in token_re.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut segments, &template[last..whole.start()], template)?;
            segments.push(parse_token(name.as_str(), template)?);
            last = whole.end();
        }
        push_literal(&mut segments, &template[last..], template)?;

        let api_key = api_key.filter(|k| !k.is_empty());
        if segments.contains(&Segment::Subdomain) && subdomains.is_empty() {
            return Err(TileError::config(format!(
                "template '{}' uses {{s}} but no sub-domains were given",
                template
            )));
        }
        if segments.contains(&Segment::ApiKey) && api_key.is_none() {
            return Err(TileError::config(format!(
                "template '{}' uses {{k}} but no API key was given",
                template
            )));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
            subdomains,
            api_key,
            next_subdomain: AtomicUsize::new(0),
        })
    }

    /// Parses a template that uses neither sub-domains nor a key.
    pub fn simple(template: &str) -> Result<Self, TileError> {
        Self::new(template, Vec::new(), None)
    }

    /// The template as given.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn subdomains(&self) -> &[String] {
        &self.subdomains
    }

    /// Produces the request address for `index`.
    ///
    /// Each call that needs a sub-domain advances the rotation once.
    pub fn resolve(&self, index: &TileIndex) -> String {
        let mut url = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Zoom => url.push_str(&index.zoom.to_string()),
                Segment::Col => url.push_str(&index.col.to_string()),
                Segment::Row => url.push_str(&index.row.to_string()),
                Segment::FlippedRow => url.push_str(&index.flipped_row().to_string()),
                Segment::Subdomain => url.push_str(self.next_subdomain()),
                Segment::ApiKey => url.push_str(self.api_key.as_deref().unwrap_or_default()),
                Segment::Quadkey => url.push_str(&quadkey(index)),
            }
        }
        url
    }

    fn next_subdomain(&self) -> &str {
        if self.subdomains.is_empty() {
            return "";
        }
        let slot = self.next_subdomain.fetch_add(1, Ordering::Relaxed) % self.subdomains.len();
        &self.subdomains[slot]
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str, template: &str) -> Result<(), TileError> {
    if text.contains(['{', '}']) {
        return Err(TileError::config(format!(
            "unbalanced braces in template '{}'",
            template
        )));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

fn parse_token(name: &str, template: &str) -> Result<Segment, TileError> {
    match name.to_ascii_lowercase().as_str() {
        "z" | "zoom" => Ok(Segment::Zoom),
        "x" => Ok(Segment::Col),
        "y" => Ok(Segment::Row),
        "-y" => Ok(Segment::FlippedRow),
        "s" => Ok(Segment::Subdomain),
        "k" => Ok(Segment::ApiKey),
        "quadkey" => Ok(Segment::Quadkey),
        _ => Err(TileError::config(format!(
            "unknown token {{{}}} in template '{}'",
            name, template
        ))),
    }
}

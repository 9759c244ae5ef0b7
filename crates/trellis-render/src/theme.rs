//! Theme asset resolution.
//!
//! Assets load in layer order so later layers override earlier ones:
//! framework, theme core, responsive overrides, the template bundle, then
//! custom overrides last. Entries within a layer keep manifest order.

use serde::Serialize;
use trellis_store::{AssetEntry, AssetLayer, Template, Theme};

use crate::html::is_absolute_url;

/// Ordered asset URLs of a theme, optionally merged with a template bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedAssets {
    /// Theme slug.
    pub theme: String,
    /// URL prefix of the theme asset directory.
    pub base_path: String,
    /// Cache-busting version appended to asset URLs.
    pub version: String,
    /// Stylesheet URLs in load order.
    pub css: Vec<String>,
    /// Script URLs in load order.
    pub js: Vec<String>,
}

/// URL of an asset of `theme`.
///
/// Relative paths are joined to the base path and tagged with `?v={version}`.
/// Absolute URLs pass through unchanged.
#[must_use]
pub fn asset_url(theme: &Theme, path: &str) -> String {
    if is_absolute_url(path) {
        return path.to_owned();
    }
    let base = theme.base_path.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if theme.version.is_empty() {
        format!("{base}/{path}")
    } else {
        format!("{base}/{path}?v={}", theme.version)
    }
}

fn ordered(theme: &Theme, entries: &[AssetEntry], bundle: &[String]) -> Vec<String> {
    let mut sorted: Vec<_> = entries.iter().collect();
    // Stable: manifest order survives within a layer
    sorted.sort_by_key(|entry| entry.layer);

    let split = sorted.partition_point(|entry| entry.layer < AssetLayer::Custom);
    let (before, custom) = sorted.split_at(split);

    before
        .iter()
        .map(|entry| asset_url(theme, &entry.path))
        .chain(bundle.iter().map(|path| asset_url(theme, path)))
        .chain(custom.iter().map(|entry| asset_url(theme, &entry.path)))
        .collect()
}

/// Resolve the asset lists of `theme`, inserting the template bundle
/// between responsive overrides and custom overrides.
#[must_use]
pub fn resolve_assets(theme: &Theme, template: Option<&Template>) -> ResolvedAssets {
    let (css_bundle, js_bundle) = template.map_or((&[][..], &[][..]), |t| {
        (t.css.as_slice(), t.js.as_slice())
    });
    ResolvedAssets {
        theme: theme.slug.clone(),
        base_path: theme.base_path.clone(),
        version: theme.version.clone(),
        css: ordered(theme, &theme.css, css_bundle),
        js: ordered(theme, &theme.js, js_bundle),
    }
}

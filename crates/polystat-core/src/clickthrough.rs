//! Click-through URL resolution.
//!
//! A template is resolved in three passes:
//!
//! 1. single-metric tokens, against the tile being resolved:
//!    `${__cell_name}`, `${__cell}` (formatted value), `${__cell_raw}`
//! 2. nth-metric tokens, against any tile by position:
//!    `${__cell_name_N}`, `${__cell_N}`, `${__cell_raw_N}`
//! 3. host template variables (`${var}` / `$var`)
//!
//! Tokens that do not resolve are left in place.

use std::collections::HashMap;

use url::Url;

use crate::config::PanelConfig;
use crate::model::TileModel;

/// Host template-variable substitution.
pub trait TemplateVariables: Send + Sync {
    /// Replaces every known variable reference in `template`.
    fn replace(&self, template: &str) -> String;
}

/// URL sanitizer applied to default click-throughs.
pub trait UrlSanitizer: Send + Sync {
    fn sanitize(&self, url: &str) -> String;
}

/// Fixed set of template variables.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    vars: HashMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a variable.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl TemplateVariables for TemplateVars {
    fn replace(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
                match braced.find('}') {
                    Some(end) => (&braced[..end], end + 2),
                    None => ("", 0),
                }
            } else {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            };

            match self.vars.get(name) {
                Some(value) if consumed > 0 => out.push_str(value),
                _ => out.push_str(&rest[pos..=pos + consumed]),
            }
            rest = &after[consumed..];
        }
        out.push_str(rest);
        out
    }
}

/// Rejects URLs with a scheme outside a small allow-list by prefixing
/// `unsafe:`; relative URLs pass through.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemeAllowList;

impl SchemeAllowList {
    const ALLOWED: &'static [&'static str] = &["http", "https", "ftp", "mailto", "tel", "file"];
}

impl UrlSanitizer for SchemeAllowList {
    fn sanitize(&self, url: &str) -> String {
        let trimmed: String = url.trim().chars().filter(|c| !c.is_control()).collect();
        match Url::parse(&trimmed) {
            Ok(parsed) if Self::ALLOWED.contains(&parsed.scheme()) => trimmed,
            Ok(parsed) => {
                tracing::debug!(scheme = parsed.scheme(), "Rejected click-through scheme");
                format!("unsafe:{trimmed}")
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => trimmed,
            Err(e) => {
                tracing::debug!(error = %e, "Click-through does not parse as a URL");
                format!("unsafe:{trimmed}")
            }
        }
    }
}

/// Resolves the panel's default click-through template.
pub struct ClickThroughResolver<'a> {
    vars: &'a dyn TemplateVariables,
}

impl<'a> ClickThroughResolver<'a> {
    pub fn new(vars: &'a dyn TemplateVariables) -> Self {
        Self { vars }
    }

    /// Resolves `template` for the tile at `index`.
    ///
    /// `None` resolves the panel-level default, where single-metric tokens
    /// have no tile to refer to.
    pub fn resolve_default(&self, index: Option<usize>, template: &str, tiles: &[TileModel]) -> String {
        let url = transform_single_metric(index, template, tiles);
        let url = transform_nth_metric(&url, tiles);
        self.vars.replace(&url)
    }

    /// Fills in every tile whose click-through is still unresolved.
    ///
    /// Only those tiles get the new-tab and sanitize flags and a
    /// sanitized URL. Tiles that already carry a click-through are left
    /// alone.
    pub fn apply_defaults(
        &self,
        mut tiles: Vec<TileModel>,
        config: &PanelConfig,
        sanitizer: &dyn UrlSanitizer,
    ) -> Vec<TileModel> {
        let opts = &config.polystat;
        let resolved: Vec<Option<String>> = tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| {
                tile.click_through
                    .is_empty()
                    .then(|| self.resolve_default(Some(i), &opts.default_click_through, &tiles))
            })
            .collect();

        for (tile, url) in tiles.iter_mut().zip(resolved) {
            if let Some(url) = url {
                tile.sanitized_url = sanitizer.sanitize(&url);
                tile.click_through = url;
                tile.new_tab_enabled = opts.default_click_through_new_tab;
                tile.sanitize_url_enabled = opts.default_click_through_sanitize;
            }
        }
        tiles
    }
}

fn raw_value(tile: &TileModel) -> String {
    if tile.value.is_nan() {
        String::new()
    } else {
        tile.value.to_string()
    }
}

fn transform_single_metric(index: Option<usize>, template: &str, tiles: &[TileModel]) -> String {
    let Some(tile) = index.and_then(|i| tiles.get(i)) else {
        return template.to_string();
    };
    template
        .replace("${__cell_name}", &tile.name)
        .replace("${__cell_raw}", &raw_value(tile))
        .replace("${__cell}", tile.value_formatted.as_deref().unwrap_or_default())
}

fn transform_nth_metric(template: &str, tiles: &[TileModel]) -> String {
    const OPEN: &str = "${__cell";

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(OPEN) {
        out.push_str(&rest[..pos]);
        let token = &rest[pos..];
        let Some(end) = token.find('}') else {
            out.push_str(token);
            rest = "";
            break;
        };
        let body = &token[2..end];
        match nth_token_value(body, tiles) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&token[..=end]),
        }
        rest = &token[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Value for `__cell_name_N`, `__cell_raw_N` or `__cell_N`.
fn nth_token_value(body: &str, tiles: &[TileModel]) -> Option<String> {
    let parse = |suffix: &str| suffix.parse::<usize>().ok().and_then(|n| tiles.get(n));

    if let Some(tile) = body.strip_prefix("__cell_name_").and_then(parse) {
        return Some(tile.name.clone());
    }
    if let Some(tile) = body.strip_prefix("__cell_raw_").and_then(parse) {
        return Some(raw_value(tile));
    }
    body.strip_prefix("__cell_")
        .and_then(parse)
        .map(|tile| tile.value_formatted.clone().unwrap_or_default())
}

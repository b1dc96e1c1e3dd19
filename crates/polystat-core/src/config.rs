//! Panel configuration.
//!
//! The panel record is user-edited JSON. Every field has a default so a
//! partially populated record is filled in before it reaches the pipeline,
//! and [`PanelConfig::validate`] clamps out-of-range values instead of
//! rejecting them.

use serde::{Deserialize, Deserializer, Serialize};

use crate::composites::CompositeRule;
use crate::mapping::{MappingType, RangeMap, ValueMap};
use crate::overrides::OverrideRule;
use crate::sort::{SortDirection, SortField};
use crate::units::MAX_DECIMALS;

/// Minimum animation speed in milliseconds.
pub const MIN_ANIMATION_SPEED_MS: i64 = 500;
/// Animation speed used when the configured value is unusable.
pub const FALLBACK_ANIMATION_SPEED_MS: i64 = 5000;
/// Display limit used when the configured value is unusable.
pub const FALLBACK_DISPLAY_LIMIT: i64 = 100;
/// Radius used when auto-sizing is off and the configured value is unusable.
pub const FALLBACK_RADIUS: i64 = 25;
/// Border size used when the configured value is unusable.
pub const FALLBACK_BORDER_SIZE: i64 = 2;

/// Which tiles a panel (or its tooltips) shows.
///
/// Any stored value other than `all` selects the triggered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Show every tile.
    #[default]
    All,
    /// Show only tiles with a threshold level of at least 1.
    Triggered,
}

impl Keyword for DisplayMode {
    const FIELD: &'static str = "displayMode";

    fn keyword(self) -> &'static str {
        match self {
            DisplayMode::All => "all",
            DisplayMode::Triggered => "triggered",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        Some(if keyword == "all" { DisplayMode::All } else { DisplayMode::Triggered })
    }
}

/// How null samples are treated when series are ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPointMode {
    /// Drop null samples; neighbours connect across the gap.
    #[default]
    Connected,
    /// Drop null samples.
    Null,
    /// Replace null samples with zero.
    NullAsZero,
}

impl Keyword for NullPointMode {
    const FIELD: &'static str = "nullPointMode";

    fn keyword(self) -> &'static str {
        match self {
            NullPointMode::Connected => "connected",
            NullPointMode::Null => "null",
            NullPointMode::NullAsZero => "null as zero",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "connected" => Some(NullPointMode::Connected),
            "null" => Some(NullPointMode::Null),
            "null as zero" => Some(NullPointMode::NullAsZero),
            _ => None,
        }
    }
}

/// Polygon shape used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    /// Hexagon with a pointed top.
    #[default]
    HexagonPointedTop,
    /// Circle.
    Circle,
    /// Square.
    Square,
}

impl Keyword for Shape {
    const FIELD: &'static str = "shape";

    fn keyword(self) -> &'static str {
        match self {
            Shape::HexagonPointedTop => "hexagon_pointed_top",
            Shape::Circle => "circle",
            Shape::Square => "square",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "hexagon_pointed_top" => Some(Shape::HexagonPointedTop),
            "circle" => Some(Shape::Circle),
            "square" => Some(Shape::Square),
            _ => None,
        }
    }
}

/// An option stored in the panel record as a keyword string.
///
/// Unknown keywords, non-string values and `null` deserialize to the
/// default instead of rejecting the record.
pub(crate) trait Keyword: Copy + Default {
    /// Record field name, for log output.
    const FIELD: &'static str;

    fn keyword(self) -> &'static str;

    fn from_keyword(keyword: &str) -> Option<Self>;
}

macro_rules! keyword_serde {
    ($($ty:ty),+ $(,)?) => {$(
        impl ::serde::Serialize for $ty {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str($crate::config::Keyword::keyword(*self))
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $ty {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                $crate::config::deserialize_keyword(deserializer)
            }
        }
    )+};
}

pub(crate) use keyword_serde;

keyword_serde!(DisplayMode, NullPointMode, Shape);

pub(crate) fn deserialize_keyword<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Keyword,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = match &value {
        None | Some(serde_json::Value::Null) => return Ok(T::default()),
        Some(serde_json::Value::String(s)) => T::from_keyword(s),
        Some(_) => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        let fallback = T::default();
        tracing::debug!(
            field = T::FIELD,
            value = ?value,
            fallback = fallback.keyword(),
            "Unknown panel option value"
        );
        fallback
    }))
}

/// The complete panel record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelConfig {
    /// Threshold palette: ok, warning, critical, unknown.
    pub colors: Vec<String>,
    /// Legacy value-to-text mappings.
    pub value_maps: Vec<ValueMap>,
    /// Legacy range-to-text mappings.
    pub range_maps: Vec<RangeMap>,
    /// Which of the two mapping lists is active.
    pub mapping_type: MappingType,
    /// Null sample handling during ingestion.
    pub null_point_mode: NullPointMode,
    /// Per-series override rules.
    pub saved_overrides: Vec<OverrideRule>,
    /// Composite grouping rules.
    pub saved_composites: Vec<CompositeRule>,
    /// Panel options.
    pub polystat: PolystatOptions,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            colors: vec![
                "#299c46".to_string(),
                "#ED8128".to_string(),
                "#d44a3a".to_string(),
                "#4040a0".to_string(),
            ],
            value_maps: vec![ValueMap::new("null", "N/A")],
            range_maps: vec![RangeMap::new("null", "null", "N/A")],
            mapping_type: MappingType::ValueToText,
            null_point_mode: NullPointMode::Connected,
            saved_overrides: Vec::new(),
            saved_composites: Vec::new(),
            polystat: PolystatOptions::default(),
        }
    }
}

impl PanelConfig {
    /// Parses a panel record, fills missing fields with defaults and clamps
    /// invalid values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    /// Corrects every user-editable value to the nearest valid one.
    ///
    /// Never fails. Running it twice is the same as running it once.
    pub fn validate(&mut self) {
        self.polystat.validate();
    }

    /// Palette color for a threshold level, clamped to the last entry.
    pub fn threshold_color(&self, level: u32) -> Option<&str> {
        let idx = (level as usize).min(self.colors.len().saturating_sub(1));
        self.colors.get(idx).map(String::as_str)
    }
}

/// The `polystat` block of the panel record.
#[allow(clippy::struct_excessive_bools)] // Mirrors the panel's option toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolystatOptions {
    #[serde(deserialize_with = "lenient_int")]
    pub animation_speed: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub columns: Option<i64>,
    pub column_auto_size: bool,
    /// Maximum number of tiles rendered; `None` is unlimited.
    #[serde(deserialize_with = "lenient_int")]
    pub display_limit: Option<i64>,
    pub default_click_through: String,
    pub default_click_through_new_tab: bool,
    pub default_click_through_sanitize: bool,
    pub font_auto_scale: bool,
    pub font_size: u32,
    pub font_type: String,
    pub font_auto_color: bool,
    pub font_color: String,
    pub global_unit_format: String,
    /// Configured decimals; `None` lets the formatter pick.
    #[serde(deserialize_with = "lenient_int")]
    pub global_decimals: Option<i64>,
    pub global_display_mode: DisplayMode,
    pub global_operator_name: String,
    pub global_display_text_triggered_empty: String,
    pub gradient_enabled: bool,
    pub hexagon_sort_by_direction: SortDirection,
    pub hexagon_sort_by_field: SortField,
    pub max_metrics: u32,
    #[serde(deserialize_with = "lenient_int")]
    pub polygon_border_size: Option<i64>,
    pub polygon_border_color: String,
    pub polygon_global_fill_color: String,
    #[serde(deserialize_with = "lenient_int")]
    pub radius: Option<i64>,
    pub radius_auto_size: bool,
    #[serde(deserialize_with = "lenient_int")]
    pub rows: Option<i64>,
    pub row_auto_size: bool,
    pub shape: Shape,
    pub tooltip_display_mode: DisplayMode,
    pub tooltip_display_text_triggered_empty: String,
    pub tooltip_font_size: u32,
    pub tooltip_font_type: String,
    pub tooltip_primary_sort_direction: SortDirection,
    pub tooltip_primary_sort_field: SortField,
    pub tooltip_secondary_sort_direction: SortDirection,
    pub tooltip_secondary_sort_field: SortField,
    pub tooltip_timestamp_enabled: bool,
    pub tooltip_enabled: bool,
    pub value_enabled: bool,
}

impl Default for PolystatOptions {
    fn default() -> Self {
        Self {
            animation_speed: Some(2500),
            columns: None,
            column_auto_size: true,
            display_limit: Some(100),
            default_click_through: String::new(),
            default_click_through_new_tab: false,
            default_click_through_sanitize: false,
            font_auto_scale: true,
            font_size: 12,
            font_type: "Roboto".to_string(),
            font_auto_color: true,
            font_color: String::new(),
            global_unit_format: "short".to_string(),
            global_decimals: Some(2),
            global_display_mode: DisplayMode::All,
            global_operator_name: "avg".to_string(),
            global_display_text_triggered_empty: "OK".to_string(),
            gradient_enabled: true,
            hexagon_sort_by_direction: SortDirection::Ascending,
            hexagon_sort_by_field: SortField::Name,
            max_metrics: 0,
            polygon_border_size: Some(2),
            polygon_border_color: "black".to_string(),
            polygon_global_fill_color: "#0a50a1".to_string(),
            radius: None,
            radius_auto_size: true,
            rows: None,
            row_auto_size: true,
            shape: Shape::HexagonPointedTop,
            tooltip_display_mode: DisplayMode::All,
            tooltip_display_text_triggered_empty: "OK".to_string(),
            tooltip_font_size: 12,
            tooltip_font_type: "Roboto".to_string(),
            tooltip_primary_sort_direction: SortDirection::Descending,
            tooltip_primary_sort_field: SortField::ThresholdLevel,
            tooltip_secondary_sort_direction: SortDirection::Descending,
            tooltip_secondary_sort_field: SortField::Value,
            tooltip_timestamp_enabled: true,
            tooltip_enabled: true,
            value_enabled: true,
        }
    }
}

impl PolystatOptions {
    /// Clamp-and-continue validation of every interactively edited value.
    pub fn validate(&mut self) {
        let speed = match self.animation_speed {
            None | Some(0) => FALLBACK_ANIMATION_SPEED_MS,
            Some(s) if s >= MIN_ANIMATION_SPEED_MS => s,
            Some(_) => MIN_ANIMATION_SPEED_MS,
        };
        note_correction("animationSpeed", self.animation_speed, Some(speed));
        self.animation_speed = Some(speed);

        // 0 means unlimited
        let limit = match self.display_limit {
            None | Some(0) => None,
            Some(l) if l > 0 => Some(l),
            Some(_) => Some(FALLBACK_DISPLAY_LIMIT),
        };
        note_correction("displayLimit", self.display_limit, limit);
        self.display_limit = limit;

        let columns = auto_or_min(self.column_auto_size, self.columns, 1);
        note_correction("columns", self.columns, columns);
        self.columns = columns;

        let rows = auto_or_min(self.row_auto_size, self.rows, 1);
        note_correction("rows", self.rows, rows);
        self.rows = rows;

        let radius = auto_or_min(self.radius_auto_size, self.radius, FALLBACK_RADIUS);
        note_correction("radius", self.radius, radius);
        self.radius = radius;

        let decimals = self.global_decimals.map(|d| d.min(i64::from(MAX_DECIMALS)));
        note_correction("globalDecimals", self.global_decimals, decimals);
        self.global_decimals = decimals;

        let border = match self.polygon_border_size {
            Some(b) if b >= 0 => b,
            _ => FALLBACK_BORDER_SIZE,
        };
        note_correction("polygonBorderSize", self.polygon_border_size, Some(border));
        self.polygon_border_size = Some(border);

        if self.font_auto_color {
            self.font_color.clear();
        } else if self.font_color.is_empty() {
            self.font_color = "black".to_string();
        }

        self.polygon_border_color = rgb_to_hex(&self.polygon_border_color);
        self.polygon_global_fill_color = rgb_to_hex(&self.polygon_global_fill_color);
    }

    /// Configured decimals as an unsigned count, if any.
    pub fn decimals(&self) -> Option<u32> {
        self.global_decimals
            .and_then(|d| u32::try_from(d).ok())
            .map(|d| d.min(MAX_DECIMALS))
    }
}

/// Auto-sized values are cleared; manual values below 1 fall back.
fn auto_or_min(auto: bool, value: Option<i64>, fallback: i64) -> Option<i64> {
    if auto {
        return None;
    }
    match value {
        Some(v) if v > 0 => Some(v),
        _ => Some(fallback),
    }
}

fn note_correction(field: &str, before: Option<i64>, after: Option<i64>) {
    if before != after {
        tracing::debug!(field, ?before, ?after, "Corrected panel option");
    }
}

/// Converts `rgb(r, g, b)` / `rgba(r, g, b, a)` to `#rrggbb`.
///
/// Anything else (hex strings, named colors) is returned unchanged.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to 0..=255
pub fn rgb_to_hex(text: &str) -> String {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("rgba(")
        .or_else(|| trimmed.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));
    let Some(inner) = inner else {
        return text.to_string();
    };

    let channels: Vec<u8> = inner
        .split(',')
        .take(3)
        .filter_map(|c| c.trim().parse::<f64>().ok())
        .map(|c| c.round().clamp(0.0, 255.0) as u8)
        .collect();

    match channels.as_slice() {
        [r, g, b] => format!("#{r:02x}{g:02x}{b:02x}"),
        _ => text.to_string(),
    }
}

/// Accepts numbers, numeric strings (leading-integer semantics), `""` and
/// `null`. Anything unparsable becomes `None`.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_leading_int))
}

#[allow(clippy::cast_possible_truncation)] // Truncation toward zero is the point
pub(crate) fn parse_leading_int(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.as_bytes().first() {
                Some(b'-') => (-1, &s[1..]),
                Some(b'+') => (1, &s[1..]),
                _ => (1, s),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

//! Unit formatting.
//!
//! Formatters are looked up by key at runtime (the key comes from the panel
//! record) but each key maps to a plain function chosen at compile time.
//! An unknown key yields `None`, which the formatter treats as "leave the
//! value unformatted".

// Decimal counts are tiny; the i32/u32/f64 conversions here cannot overflow.
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

/// Largest decimal count ever printed.
pub const MAX_DECIMALS: u32 = 20;

/// Decimal counts resolved for one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalInfo {
    /// Decimals used when the value is printed unscaled.
    pub decimals: u32,
    /// Decimals used once a scaled unit (K, Mil, ...) kicks in; `None`
    /// keeps `decimals`.
    pub scaled_decimals: Option<i32>,
}

/// Unit-format lookup service.
pub trait UnitFormats: Send + Sync {
    /// Formats `value` with the formatter registered under `key`.
    ///
    /// Returns `None` if no such formatter exists.
    fn format(&self, key: &str, value: f64, info: DecimalInfo) -> Option<String>;
}

type FormatFn = fn(f64, DecimalInfo) -> String;

/// The built-in formatter table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinUnits;

impl BuiltinUnits {
    /// Keys this table knows about.
    pub const KEYS: &'static [&'static str] = &[
        "none",
        "short",
        "percent",
        "percentunit",
        "bytes",
        "decbytes",
        "bits",
        "hertz",
        "ms",
        "s",
        "celsius",
    ];

    fn lookup(key: &str) -> Option<FormatFn> {
        let f: FormatFn = match key {
            "none" => |v, i| to_fixed(v, Some(i.decimals as i32)),
            "short" => |v, i| {
                scaled_units(
                    v,
                    i,
                    1000.0,
                    &["", " K", " Mil", " Bil", " Tri", " Quadr", " Quint", " Sext", " Sept"],
                )
            },
            "percent" => |v, i| format!("{}%", to_fixed(v, Some(i.decimals as i32))),
            "percentunit" => |v, i| format!("{}%", to_fixed(v * 100.0, Some(i.decimals as i32))),
            "bytes" => |v, i| {
                scaled_units(
                    v,
                    i,
                    1024.0,
                    &[" B", " KiB", " MiB", " GiB", " TiB", " PiB", " EiB", " ZiB", " YiB"],
                )
            },
            "decbytes" => |v, i| {
                scaled_units(
                    v,
                    i,
                    1000.0,
                    &[" B", " kB", " MB", " GB", " TB", " PB", " EB", " ZB", " YB"],
                )
            },
            "bits" => |v, i| {
                scaled_units(
                    v,
                    i,
                    1024.0,
                    &[" b", " Kib", " Mib", " Gib", " Tib", " Pib", " Eib", " Zib", " Yib"],
                )
            },
            "hertz" => |v, i| {
                scaled_units(v, i, 1000.0, &[" Hz", " kHz", " MHz", " GHz", " THz", " PHz"])
            },
            "ms" => to_milliseconds,
            "s" => to_seconds,
            "celsius" => |v, i| format!("{}°C", to_fixed(v, Some(i.decimals as i32))),
            _ => return None,
        };
        Some(f)
    }
}

impl UnitFormats for BuiltinUnits {
    fn format(&self, key: &str, value: f64, info: DecimalInfo) -> Option<String> {
        Self::lookup(key).map(|f| f(value, info))
    }
}

/// Resolves the decimal count for `value`.
///
/// With no configured count the count is derived from the value's
/// magnitude. A configured count is honoured unless it would round a
/// non-zero value to zero, in which case the derived count is used.
pub fn decimals_for_value(value: f64, configured: Option<u32>) -> DecimalInfo {
    let (auto_decimals, auto_scaled) = auto_decimals(value);
    match configured.map(|d| d.min(MAX_DECIMALS)) {
        None => DecimalInfo {
            decimals: auto_decimals,
            scaled_decimals: auto_scaled,
        },
        Some(d) => {
            let vanishes =
                value.is_finite() && value != 0.0 && js_round(value.abs() * 10f64.powi(d as i32)) == 0.0;
            DecimalInfo {
                decimals: if vanishes { d.max(auto_decimals) } else { d },
                scaled_decimals: None,
            }
        }
    }
}

fn auto_decimals(value: f64) -> (u32, Option<i32>) {
    if !value.is_finite() || value == 0.0 {
        return (0, None);
    }
    let delta = value.abs() / 2.0;
    let mut dec = -(delta.log10().floor()) as i32;
    let magn = 10f64.powi(-dec);
    let norm = delta / magn;

    let mut size = if norm < 1.5 {
        1.0
    } else if norm < 3.0 {
        if norm > 2.25 {
            dec += 1;
            2.5
        } else {
            2.0
        }
    } else if norm < 7.5 {
        5.0
    } else {
        10.0
    };
    size *= magn;

    if value.fract() == 0.0 {
        dec = 0;
    }
    let decimals = dec.clamp(0, MAX_DECIMALS as i32);
    let scaled = decimals - size.log10().floor() as i32 + 2;
    (decimals as u32, Some(scaled))
}

/// Rounds `value` to `decimals` places the way the panel displays it.
pub fn round_value(value: f64, decimals: u32) -> f64 {
    let n = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    js_round(value * n) / n
}

/// Half-up rounding (toward positive infinity on ties).
fn js_round(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Prints `value` with exactly `decimals` places (none when `None`),
/// capped at [`MAX_DECIMALS`].
pub fn to_fixed(value: f64, decimals: Option<i32>) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    let decimals = decimals.map(|d| d.min(MAX_DECIMALS as i32));
    let places = decimals.unwrap_or(0).max(0);
    let factor = 10f64.powi(places);
    let mut rounded = js_round(value * factor) / factor;
    if !rounded.is_finite() {
        rounded = value;
    }
    if rounded == 0.0 {
        // Avoid "-0"
        rounded = 0.0;
    }
    if value == 0.0 {
        return "0".to_string();
    }
    match decimals {
        Some(d) if d > 0 => format!("{rounded:.prec$}", prec = d as usize),
        Some(_) => format!("{rounded:.0}"),
        None => format!("{rounded}"),
    }
}

fn to_fixed_scaled(value: f64, info: DecimalInfo, additional: i32, ext: &str) -> String {
    let decimals = match info.scaled_decimals {
        Some(scaled) => scaled + additional,
        None => info.decimals as i32,
    };
    format!("{}{}", to_fixed(value, Some(decimals)), ext)
}

fn scaled_units(value: f64, info: DecimalInfo, factor: f64, ext: &[&str]) -> String {
    if !value.is_finite() {
        return to_fixed(value, None);
    }
    let mut size = value;
    let mut steps = 0usize;
    while size.abs() >= factor {
        steps += 1;
        size /= factor;
        if steps >= ext.len() {
            return "NA".to_string();
        }
    }
    let decimals = match info.scaled_decimals {
        Some(scaled) if steps > 0 => scaled + 3 * steps as i32,
        _ => info.decimals as i32,
    };
    format!("{}{}", to_fixed(size, Some(decimals)), ext[steps])
}

fn to_milliseconds(size: f64, info: DecimalInfo) -> String {
    let abs = size.abs();
    if abs < 1000.0 {
        format!("{} ms", to_fixed(size, Some(info.decimals as i32)))
    } else if abs < 60_000.0 {
        to_fixed_scaled(size / 1000.0, info, 3, " s")
    } else if abs < 3_600_000.0 {
        to_fixed_scaled(size / 60_000.0, info, 5, " min")
    } else if abs < 86_400_000.0 {
        to_fixed_scaled(size / 3_600_000.0, info, 7, " hour")
    } else if abs < 31_536_000_000.0 {
        to_fixed_scaled(size / 86_400_000.0, info, 8, " day")
    } else {
        to_fixed_scaled(size / 31_536_000_000.0, info, 10, " year")
    }
}

fn to_seconds(size: f64, info: DecimalInfo) -> String {
    let abs = size.abs();
    if abs < 1.0 && abs > 0.0 {
        to_milliseconds(size * 1000.0, info)
    } else if abs < 60.0 {
        format!("{} s", to_fixed(size, Some(info.decimals as i32)))
    } else if abs < 3600.0 {
        to_fixed_scaled(size / 60.0, info, 1, " min")
    } else if abs < 86_400.0 {
        to_fixed_scaled(size / 3600.0, info, 4, " hour")
    } else if abs < 604_800.0 {
        to_fixed_scaled(size / 86_400.0, info, 5, " day")
    } else if abs < 31_536_000.0 {
        to_fixed_scaled(size / 604_800.0, info, 6, " week")
    } else {
        to_fixed_scaled(size / 3.15569e7, info, 7, " year")
    }
}

//! Tile ordering.
//!
//! Every sort here is stable: tiles that compare equal keep their input
//! order. Names compare numerically when both parse as numbers, so a panel
//! of series named `1`, `2`, `10` sorts as numbers rather than as text.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{Keyword, keyword_serde};
use crate::model::TileModel;

/// Field a tile list can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Name,
    ThresholdLevel,
    Value,
}

impl Keyword for SortField {
    const FIELD: &'static str = "sortByField";

    fn keyword(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::ThresholdLevel => "thresholdLevel",
            SortField::Value => "value",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "name" => Some(SortField::Name),
            "thresholdLevel" => Some(SortField::ThresholdLevel),
            "value" => Some(SortField::Value),
            _ => None,
        }
    }
}

keyword_serde!(SortField);

impl SortField {
    /// Ascending comparator for this field.
    pub fn comparator(self) -> fn(&TileModel, &TileModel) -> Ordering {
        match self {
            SortField::Name => compare_name,
            SortField::ThresholdLevel => compare_threshold,
            SortField::Value => compare_value,
        }
    }
}

/// Sort direction.
///
/// Older panels store the direction as `"asc"`/`"desc"`; newer ones use the
/// numeric sort-option codes, where odd codes ascend and even codes descend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }

    fn from_code(code: i64) -> Self {
        if code > 0 && code % 2 == 0 {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }
}

impl Serialize for SortDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        })
    }
}

impl<'de> Deserialize<'de> for SortDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("asc") => Ok(SortDirection::Ascending),
            serde_json::Value::String(s) if s.eq_ignore_ascii_case("desc") => Ok(SortDirection::Descending),
            other => Ok(crate::config::parse_leading_int(other).map_or_else(
                || {
                    tracing::debug!(value = %other, "Unknown sort direction, ascending");
                    SortDirection::Ascending
                },
                SortDirection::from_code,
            )),
        }
    }
}

/// Returns `tiles` ordered by `field` in `direction`.
pub fn sort_by(mut tiles: Vec<TileModel>, field: SortField, direction: SortDirection) -> Vec<TileModel> {
    let compare = field.comparator();
    tiles.sort_by(|a, b| {
        // NaN values always trail, whatever the direction
        if field == SortField::Value {
            match (a.value.is_nan(), b.value.is_nan()) {
                (true, false) => return Ordering::Greater,
                (false, true) => return Ordering::Less,
                _ => {}
            }
        }
        direction.apply(compare(a, b))
    });
    tiles
}

/// The name-normalizing pass run after filtering.
pub fn sort_by_name(tiles: Vec<TileModel>, direction: SortDirection) -> Vec<TileModel> {
    sort_by(tiles, SortField::Name, direction)
}

#[derive(Debug)]
enum NameKey<'a> {
    Number(f64),
    Text(&'a str),
}

fn name_key(name: &str) -> NameKey<'_> {
    match name.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && !name.trim().is_empty() => NameKey::Number(n),
        _ => NameKey::Text(name),
    }
}

/// Numbers before text; numbers numerically, text by code point.
pub fn compare_name(a: &TileModel, b: &TileModel) -> Ordering {
    match (name_key(&a.name), name_key(&b.name)) {
        (NameKey::Number(x), NameKey::Number(y)) => x.total_cmp(&y),
        (NameKey::Number(_), NameKey::Text(_)) => Ordering::Less,
        (NameKey::Text(_), NameKey::Number(_)) => Ordering::Greater,
        (NameKey::Text(x), NameKey::Text(y)) => x.cmp(y),
    }
}

pub fn compare_threshold(a: &TileModel, b: &TileModel) -> Ordering {
    a.threshold_level.cmp(&b.threshold_level)
}

pub fn compare_value(a: &TileModel, b: &TileModel) -> Ordering {
    a.value.total_cmp(&b.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(tiles: &[TileModel]) -> Vec<&str> {
        tiles.iter().map(|t| t.name.as_str()).collect()
    }

    fn named(list: &[&str]) -> Vec<TileModel> {
        list.iter().map(|n| TileModel::new(*n, 0.0)).collect()
    }

    #[test]
    fn test_numeric_names_sort_as_numbers() {
        let sorted = sort_by_name(named(&["10", "2", "1"]), SortDirection::Ascending);
        assert_eq!(names(&sorted), ["1", "2", "10"]);
    }

    #[test]
    fn test_text_names_sort_lexically() {
        let sorted = sort_by_name(named(&["svc-b", "svc-a", "10", "svc-10"]), SortDirection::Ascending);
        assert_eq!(names(&sorted), ["10", "svc-10", "svc-a", "svc-b"]);
    }

    #[test]
    fn test_descending_name() {
        let sorted = sort_by_name(named(&["a", "c", "b"]), SortDirection::Descending);
        assert_eq!(names(&sorted), ["c", "b", "a"]);
    }

    #[test]
    fn test_value_sort_puts_nan_last() {
        let tiles = vec![
            TileModel::new("nan", f64::NAN),
            TileModel::new("three", 3.0),
            TileModel::new("one", 1.0),
        ];
        let asc = sort_by(tiles.clone(), SortField::Value, SortDirection::Ascending);
        assert_eq!(names(&asc), ["one", "three", "nan"]);
        let desc = sort_by(tiles, SortField::Value, SortDirection::Descending);
        assert_eq!(names(&desc), ["three", "one", "nan"]);
    }

    #[test]
    fn test_threshold_ties_keep_input_order() {
        let mut tiles = named(&["x", "y", "z", "w"]);
        tiles[0].threshold_level = 1;
        tiles[1].threshold_level = 0;
        tiles[2].threshold_level = 1;
        tiles[3].threshold_level = 0;
        let sorted = sort_by(tiles, SortField::ThresholdLevel, SortDirection::Descending);
        assert_eq!(names(&sorted), ["x", "z", "y", "w"]);
    }

    #[test]
    fn test_direction_parsing() {
        let parse = |json: &str| serde_json::from_str::<SortDirection>(json).unwrap();
        assert_eq!(parse(r#""asc""#), SortDirection::Ascending);
        assert_eq!(parse(r#""desc""#), SortDirection::Descending);
        assert_eq!(parse("1"), SortDirection::Ascending);
        assert_eq!(parse("2"), SortDirection::Descending);
        assert_eq!(parse("4"), SortDirection::Descending);
        assert_eq!(parse(r#""sideways""#), SortDirection::Ascending);
        assert_eq!(parse("null"), SortDirection::Ascending);
    }

    #[test]
    fn test_field_parsing() {
        let parse = |json: &str| serde_json::from_str::<SortField>(json).unwrap();
        assert_eq!(parse(r#""thresholdLevel""#), SortField::ThresholdLevel);
        assert_eq!(parse(r#""value""#), SortField::Value);
        assert_eq!(parse(r#""colour""#), SortField::Name);
        assert_eq!(parse("3"), SortField::Name);
        assert_eq!(serde_json::to_string(&SortField::ThresholdLevel).unwrap(), r#""thresholdLevel""#);
    }
}

/// Property-based tests using proptest.
#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    fn tile_strategy() -> impl Strategy<Value = TileModel> {
        (
            prop_oneof!["[a-c]{1,2}", (0u32..20).prop_map(|n| n.to_string())],
            prop_oneof![Just(f64::NAN), -50.0f64..50.0, (0i32..5).prop_map(f64::from)],
            0u32..3,
        )
            .prop_map(|(name, value, level)| {
                let mut tile = TileModel::new(name, value);
                tile.threshold_level = level;
                tile
            })
    }

    fn field_strategy() -> impl Strategy<Value = SortField> {
        prop_oneof![Just(SortField::Name), Just(SortField::ThresholdLevel), Just(SortField::Value)]
    }

    fn direction_strategy() -> impl Strategy<Value = SortDirection> {
        prop_oneof![Just(SortDirection::Ascending), Just(SortDirection::Descending)]
    }

    proptest! {
        /// Adjacent tiles respect the direction, and equal keys keep their
        /// original relative order.
        #[test]
        fn sort_is_ordered_and_stable(
            tiles in prop::collection::vec(tile_strategy(), 0..30),
            field in field_strategy(),
            direction in direction_strategy(),
        ) {
            let tagged: Vec<TileModel> = tiles
                .into_iter()
                .enumerate()
                .map(|(i, mut t)| { t.operator = i.to_string(); t })
                .collect();
            let sorted = sort_by(tagged, field, direction);
            let compare = field.comparator();

            for pair in sorted.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let a_nan = field == SortField::Value && a.value.is_nan();
                let b_nan = field == SortField::Value && b.value.is_nan();
                prop_assert!(!(a_nan && !b_nan), "NaN must trail");
                if a_nan || b_nan {
                    continue;
                }
                let ord = direction.apply(compare(a, b));
                prop_assert_ne!(ord, Ordering::Greater);
                if ord == Ordering::Equal {
                    let ia: usize = a.operator.parse().unwrap();
                    let ib: usize = b.operator.parse().unwrap();
                    prop_assert!(ia < ib, "ties must keep input order");
                }
            }
        }

        /// Sorting a sorted list changes nothing.
        #[test]
        fn sort_is_idempotent(
            tiles in prop::collection::vec(tile_strategy(), 0..30),
            field in field_strategy(),
            direction in direction_strategy(),
        ) {
            let once = sort_by(tiles, field, direction);
            let twice = sort_by(once.clone(), field, direction);
            prop_assert_eq!(format!("{once:?}"), format!("{twice:?}"));
        }
    }
}

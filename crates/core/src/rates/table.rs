use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::catalog::FurnitureKind;
use crate::domain::request::{VolumeClass, WaitBand};
use crate::errors::DomainError;

pub const DEFAULT_VALUE_PERCENT: u32 = 7;
pub const DEFAULT_PARTNER_DISCOUNT_PERCENT: u32 = 30;

/// Nested price document keyed by group name. Missing keys read as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateTable {
    root: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiftingRate {
    pub price_per_place: Decimal,
    pub places_count: u32,
    pub hint: Option<String>,
}

impl RateTable {
    pub fn from_value(value: Value) -> Result<Self, DomainError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(DomainError::InvalidRequest(format!(
                "rate table must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn parse_json(text: &str) -> Result<Self, DomainError> {
        let value = serde_json::from_str::<Value>(text)
            .map_err(|error| DomainError::InvalidRequest(format!("rate table is not JSON: {error}")))?;
        Self::from_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Walks a dotted path such as `delivery.1_to_5m3`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Numeric value at `path`, or `None` when absent or not a number.
    pub fn number_opt(&self, path: &str) -> Option<Decimal> {
        self.lookup(path).and_then(numeric)
    }

    pub fn number(&self, path: &str) -> Decimal {
        self.number_opt(path).unwrap_or(Decimal::ZERO)
    }

    /// Whole currency units, truncated toward zero.
    pub fn amount(&self, path: &str) -> i64 {
        truncate(self.number(path))
    }

    /// Per-km price beyond the boundary, also used for far route mileage.
    pub fn boundary_km_rate(&self) -> Decimal {
        self.number("boundary_km")
    }

    pub fn carry_fee(&self) -> Decimal {
        self.number("carry_from_parking")
    }

    pub fn delivery_base(&self, class: VolumeClass) -> Decimal {
        self.number(&format!("delivery.{}", class.rate_key()))
    }

    pub fn additional_address(&self, class: VolumeClass) -> Decimal {
        self.number(&format!("additional_address.{}", class.additional_address_key()))
    }

    /// Lifting entry for a kind; `None` when the table does not price that kind.
    pub fn lifting(&self, kind: FurnitureKind) -> Option<LiftingRate> {
        let entry = self.root.get("lifting")?.as_object()?.get(kind.key())?.as_object()?;
        let price_per_place = entry.get("price_per_place").and_then(numeric).unwrap_or(Decimal::ZERO);
        let places_count = entry
            .get("places_count")
            .and_then(numeric)
            .and_then(|value| value.trunc().to_u32())
            .filter(|count| *count > 0)
            .unwrap_or(1);
        let hint = entry
            .get("hint")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
            .map(str::to_owned);
        Some(LiftingRate { price_per_place, places_count, hint })
    }

    /// Flat assembly price for a category; `None` when the category key is absent.
    pub fn assembly_flat(&self, category: &str) -> Option<i64> {
        let path = format!("assembly.{category}");
        self.lookup(&path).map(|value| numeric(value).map(truncate).unwrap_or(0))
    }

    pub fn assembly_value_percent(&self) -> Decimal {
        self.number_opt("assembly.value_percent").unwrap_or(Decimal::from(DEFAULT_VALUE_PERCENT))
    }

    pub fn storage_rate(&self) -> Decimal {
        self.number("storage.per_day_per_m3")
    }

    pub fn packaging_rate(&self) -> Decimal {
        self.number("packaging.per_meter")
    }

    pub fn waiting_rate(&self, band: WaitBand) -> Decimal {
        self.number(&format!("waiting_time.{}", band.rate_key()))
    }

    pub fn departure_base(&self) -> Decimal {
        self.number("assembly_departure.base")
    }

    pub fn departure_km_rate(&self) -> Decimal {
        self.number("assembly_departure.per_km")
    }

    pub fn partner_discount_percent(&self) -> Decimal {
        self.number_opt("partner_discount").unwrap_or(Decimal::from(DEFAULT_PARTNER_DISCOUNT_PERCENT))
    }
}

impl FromStr for RateTable {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse_json(value)
    }
}

/// Reads integers, floats and numeric strings (`"1 500"`, `"2,5"`).
pub fn numeric(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Some(Decimal::from(int))
            } else if let Some(uint) = number.as_u64() {
                Some(Decimal::from(uint))
            } else {
                number.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(text) => {
            let cleaned: String = text
                .chars()
                .filter(|ch| !ch.is_whitespace())
                .map(|ch| if ch == ',' { '.' } else { ch })
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}

pub fn truncate(value: Decimal) -> i64 {
    value.trunc().to_i64().unwrap_or(0)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::RateTable;
    use crate::domain::catalog::FurnitureKind;
    use crate::domain::request::{VolumeClass, WaitBand};

    fn table() -> RateTable {
        RateTable::from_value(json!({
            "boundary_km": 60,
            "carry_from_parking": "1 500",
            "delivery": {"up_to_1m3": 3000, "1_to_5m3": 5000.0},
            "additional_address": {"up_to_1m3": 1000, "1_to_5m3": 2000},
            "lifting": {
                "sofa_corner": {"price_per_place": 900, "places_count": 3, "hint": " back and two sides "},
                "armchair": {"price_per_place": "450"}
            },
            "assembly": {"sofa_corner": 4000, "value_percent": "8,5"},
            "storage": {"per_day_per_m3": 12.5}
        }))
        .expect("object should parse")
    }

    #[test]
    fn numeric_leaves_accept_strings_and_floats() {
        let rates = table();
        assert_eq!(rates.carry_fee(), Decimal::from(1500));
        assert_eq!(rates.delivery_base(VolumeClass::From1To5), Decimal::from(5000));
        assert_eq!(rates.storage_rate(), Decimal::new(125, 1));
        assert_eq!(rates.assembly_value_percent(), Decimal::new(85, 1));
    }

    #[test]
    fn missing_keys_default_to_zero_or_documented_defaults() {
        let rates = RateTable::default();
        assert_eq!(rates.boundary_km_rate(), Decimal::ZERO);
        assert_eq!(rates.delivery_base(VolumeClass::From10To18), Decimal::ZERO);
        assert_eq!(rates.waiting_rate(WaitBand::UpTo1Hour), Decimal::ZERO);
        assert_eq!(rates.assembly_value_percent(), Decimal::from(7));
        assert_eq!(rates.partner_discount_percent(), Decimal::from(30));
        assert_eq!(rates.assembly_flat("bed"), None);
        assert!(rates.lifting(FurnitureKind::Armchair).is_none());
    }

    #[test]
    fn additional_address_uses_coarse_buckets() {
        let rates = table();
        assert_eq!(rates.additional_address(VolumeClass::UpTo1), Decimal::from(1000));
        assert_eq!(rates.additional_address(VolumeClass::From5To10), Decimal::from(2000));
    }

    #[test]
    fn lifting_entry_defaults_places_and_trims_hint() {
        let rates = table();
        let corner = rates.lifting(FurnitureKind::SofaCorner).expect("corner sofa priced");
        assert_eq!(corner.places_count, 3);
        assert_eq!(corner.hint.as_deref(), Some("back and two sides"));

        let armchair = rates.lifting(FurnitureKind::Armchair).expect("armchair priced");
        assert_eq!(armchair.price_per_place, Decimal::from(450));
        assert_eq!(armchair.places_count, 1);
        assert_eq!(armchair.hint, None);
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(RateTable::parse_json("[1, 2]").is_err());
        assert!(RateTable::parse_json("not json").is_err());
        assert!("{\"boundary_km\": 1}".parse::<RateTable>().is_ok());
    }
}

use std::ops::RangeInclusive;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::FurnitureKind;
use crate::errors::DomainError;

/// Accepted ranges for collected values.
pub mod bounds {
    use std::ops::RangeInclusive;

    pub const BOUNDARY_DISTANCE_KM: RangeInclusive<u32> = 0..=500;
    pub const ROUTE_DISTANCE_KM: RangeInclusive<u32> = 0..=1000;
    pub const DOOR_DISTANCE_M: RangeInclusive<u32> = 0..=500;
    pub const CARRY_COUNT: RangeInclusive<u32> = 0..=10;
    pub const FLOOR: RangeInclusive<i32> = -5..=200;
    pub const PLACES: RangeInclusive<u32> = 1..=100;
    pub const DECLARED_VALUE: RangeInclusive<u64> = 1..=100_000_000;
    pub const STORAGE_DAYS: RangeInclusive<u32> = 1..=3650;
    /// Exclusive lower bound; the upper bound is inclusive.
    pub const STORAGE_VOLUME_M3_MAX: u32 = 100;
    /// Door distance above which carries from the parking spot are asked for.
    pub const DOOR_DISTANCE_CARRY_THRESHOLD_M: u32 = 15;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Near,
    Far,
}

impl Zone {
    pub fn label(self) -> &'static str {
        match self {
            Self::Near => "inside the boundary",
            Self::Far => "outside the boundary",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Self::Near => "Near",
            Self::Far => "Far",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VolumeClass {
    #[serde(rename = "up_to_1m3")]
    UpTo1,
    #[serde(rename = "1_to_5m3")]
    From1To5,
    #[serde(rename = "5_to_10m3")]
    From5To10,
    #[serde(rename = "10_to_18m3")]
    From10To18,
}

impl VolumeClass {
    pub const ALL: [VolumeClass; 4] = [Self::UpTo1, Self::From1To5, Self::From5To10, Self::From10To18];

    /// Key under `delivery`.
    pub fn rate_key(self) -> &'static str {
        match self {
            Self::UpTo1 => "up_to_1m3",
            Self::From1To5 => "1_to_5m3",
            Self::From5To10 => "5_to_10m3",
            Self::From10To18 => "10_to_18m3",
        }
    }

    /// Key under `additional_address`; only the smallest band is priced separately.
    pub fn additional_address_key(self) -> &'static str {
        match self {
            Self::UpTo1 => "up_to_1m3",
            Self::From1To5 | Self::From5To10 | Self::From10To18 => "1_to_5m3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UpTo1 => "up to 1 m³",
            Self::From1To5 => "1-5 m³",
            Self::From5To10 => "5-10 m³",
            Self::From10To18 => "10-18 m³",
        }
    }

    pub fn from_rate_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.rate_key() == key)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaitBand {
    #[serde(rename = "15_to_30_min")]
    UpTo30Min,
    #[serde(rename = "30_min_to_1_hour")]
    UpTo1Hour,
}

impl WaitBand {
    pub fn rate_key(self) -> &'static str {
        match self {
            Self::UpTo30Min => "15_to_30_min",
            Self::UpTo1Hour => "30_min_to_1_hour",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::UpTo30Min => "15-30 min",
            Self::UpTo1Hour => "30 min - 1 hour",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraRoute {
    pub from: Zone,
    pub to: Zone,
    #[serde(default)]
    pub distance_km: u32,
}

impl ExtraRoute {
    pub fn touches_far(&self) -> bool {
        self.from == Zone::Far || self.to == Zone::Far
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiftMethod {
    Elevator,
    Stairs,
    Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifting {
    pub floor: i32,
    #[serde(default)]
    pub elevator: bool,
    #[serde(default)]
    pub elevator_places: u32,
    #[serde(default)]
    pub stairs_places: u32,
}

impl Lifting {
    pub fn by_stairs(floor: i32, places: u32) -> Self {
        Self { floor, elevator: false, elevator_places: 0, stairs_places: places }
    }

    pub fn by_elevator(floor: i32, places: u32) -> Self {
        Self { floor, elevator: true, elevator_places: places, stairs_places: 0 }
    }

    pub fn mixed(floor: i32, elevator_places: u32, stairs_places: u32) -> Self {
        Self { floor, elevator: false, elevator_places, stairs_places }
    }

    /// Floor used as the stairs multiplier and whether the basement tariff applied.
    pub fn effective_floor(&self) -> (i32, bool) {
        if self.floor <= 0 {
            (2, true)
        } else {
            (self.floor, false)
        }
    }

    pub fn method(&self, places_count: u32) -> LiftMethod {
        if self.elevator_places > 0 && self.stairs_places > 0 {
            LiftMethod::Mixed
        } else if self.elevator || (places_count > 0 && self.elevator_places == places_count) {
            LiftMethod::Elevator
        } else {
            LiftMethod::Stairs
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnitureItem {
    pub kind: FurnitureKind,
    #[serde(default = "default_places")]
    pub places_count: u32,
    #[serde(default)]
    pub lifting: Option<Lifting>,
    #[serde(default)]
    pub assembly_needed: bool,
    /// Declared value driving percent-priced assembly.
    #[serde(default)]
    pub declared_value: Option<u64>,
}

fn default_places() -> u32 {
    1
}

impl FurnitureItem {
    pub fn new(kind: FurnitureKind, places_count: u32) -> Self {
        Self { kind, places_count, lifting: None, assembly_needed: false, declared_value: None }
    }

    pub fn with_lifting(mut self, lifting: Lifting) -> Self {
        self.lifting = Some(lifting);
        self
    }

    pub fn with_assembly(mut self) -> Self {
        self.assembly_needed = true;
        self
    }

    pub fn with_declared_value(mut self, value: u64) -> Self {
        self.declared_value = Some(value);
        self
    }

    fn validate(&self, index: usize) -> Result<(), DomainError> {
        check_range(&format!("furniture_items[{index}].places_count"), self.places_count, &bounds::PLACES)?;

        if let Some(lifting) = &self.lifting {
            let split = lifting.elevator_places + lifting.stairs_places;
            // a bare elevator flag without counts means everything goes by lift
            let implicit = lifting.elevator && split == 0;
            if !implicit && split != self.places_count {
                return Err(DomainError::InvariantViolation(format!(
                    "furniture_items[{index}]: elevator_places + stairs_places = {split}, expected {}",
                    self.places_count
                )));
            }
            check_range(&format!("furniture_items[{index}].lifting.floor"), lifting.floor, &bounds::FLOOR)?;
        }

        if let Some(value) = self.declared_value {
            check_range(&format!("furniture_items[{index}].declared_value"), value, &bounds::DECLARED_VALUE)?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRequest {
    pub days: u32,
    pub volume_m3: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteRequest {
    pub zone: Option<Zone>,
    pub boundary_distance_km: u32,
    pub extra_routes: Vec<ExtraRoute>,
    pub volume_class: Option<VolumeClass>,
    pub delivery_only: bool,
    pub carry_count: u32,
    pub door_distance_m: Option<Decimal>,
    pub furniture_items: Vec<FurnitureItem>,
    pub storage: Option<StorageRequest>,
    pub storage_requested: bool,
    pub packaging_meters: Decimal,
    pub partner_discount: bool,
    pub storage_only: bool,
    pub wait_band: Option<WaitBand>,
    pub assembly_departure: bool,
}

impl QuoteRequest {
    pub fn storage_only(days: u32, volume_m3: Decimal) -> Self {
        Self {
            storage: Some(StorageRequest { days, volume_m3 }),
            storage_only: true,
            ..Self::default()
        }
    }

    /// Checks invariants for requests that did not come through the dialog.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.storage_only {
            if self.storage.is_none() {
                return Err(DomainError::InvalidRequest(
                    "storage_only requests need storage days and volume".to_owned(),
                ));
            }
        } else {
            if self.zone.is_none() {
                return Err(DomainError::InvalidRequest("zone is required for delivery quotes".to_owned()));
            }
            if self.volume_class.is_none() {
                return Err(DomainError::InvalidRequest(
                    "volume_class is required for delivery quotes".to_owned(),
                ));
            }
        }

        check_range("boundary_distance_km", self.boundary_distance_km, &bounds::BOUNDARY_DISTANCE_KM)?;
        check_range("carry_count", self.carry_count, &bounds::CARRY_COUNT)?;
        for (index, route) in self.extra_routes.iter().enumerate() {
            check_range(
                &format!("extra_routes[{index}].distance_km"),
                route.distance_km,
                &bounds::ROUTE_DISTANCE_KM,
            )?;
        }
        for (index, item) in self.furniture_items.iter().enumerate() {
            item.validate(index)?;
        }

        if let Some(storage) = &self.storage {
            check_range("storage.days", storage.days, &bounds::STORAGE_DAYS)?;
            if storage.volume_m3 <= Decimal::ZERO
                || storage.volume_m3 > Decimal::from(bounds::STORAGE_VOLUME_M3_MAX)
            {
                return Err(DomainError::InvalidRequest(format!(
                    "storage.volume_m3 must be greater than 0 and at most {}",
                    bounds::STORAGE_VOLUME_M3_MAX
                )));
            }
        }

        if self.packaging_meters < Decimal::ZERO {
            return Err(DomainError::InvalidRequest("packaging_meters must not be negative".to_owned()));
        }

        Ok(())
    }

    pub fn is_far(&self) -> bool {
        self.zone == Some(Zone::Far)
    }
}

fn check_range<T>(field: &str, value: T, range: &RangeInclusive<T>) -> Result<(), DomainError>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(DomainError::InvalidRequest(format!(
            "{field} = {value} is outside {}..={}",
            range.start(),
            range.end()
        )))
    }
}

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::FurnitureKind;
use crate::domain::request::{FurnitureItem, Lifting, QuoteRequest};
use crate::flows::states::DialogState;

pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30 * 60;

/// The furniture item currently being described.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FurnitureDraft {
    pub kind: FurnitureKind,
    pub places_count: u32,
    pub floor: Option<i32>,
    pub elevator_places: u32,
    pub lifting: Option<Lifting>,
    pub assembly_needed: bool,
    pub declared_value: Option<u64>,
}

impl FurnitureDraft {
    pub fn new(kind: FurnitureKind, places_count: u32) -> Self {
        Self {
            kind,
            places_count,
            floor: None,
            elevator_places: 0,
            lifting: None,
            assembly_needed: false,
            declared_value: None,
        }
    }

    pub fn into_item(self) -> FurnitureItem {
        FurnitureItem {
            kind: self.kind,
            places_count: self.places_count,
            lifting: self.lifting,
            assembly_needed: self.assembly_needed,
            declared_value: self.declared_value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub state: DialogState,
    pub request: QuoteRequest,
    pub draft: Option<FurnitureDraft>,
    /// Near-zone floor asked once and shared by every item.
    pub shared_floor: Option<i32>,
    pub shared_elevator: Option<bool>,
    pub is_admin: bool,
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    pub fn new(is_admin: bool, now: DateTime<Utc>) -> Self {
        Self {
            state: DialogState::MainMenu,
            request: QuoteRequest::default(),
            draft: None,
            shared_floor: None,
            shared_elevator: None,
            is_admin,
            last_activity: now,
        }
    }

    /// Clears everything collected, keeping identity-derived flags.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = Self::new(self.is_admin, now);
    }

    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now.signed_duration_since(self.last_activity) >= timeout
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}

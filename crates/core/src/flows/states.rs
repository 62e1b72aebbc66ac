use serde::{Deserialize, Serialize};

use crate::domain::catalog::{FurnitureCategory, FurnitureKind};
use crate::domain::request::{VolumeClass, Zone};

/// Dialogue position. Each state names the fact still being collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogState {
    MainMenu,
    AddressZone,
    BoundaryDistance,
    AddStop,
    RouteFrom,
    RouteTo { from: Zone },
    RouteDistance { from: Zone, to: Zone },
    CarryQuestion,
    DoorDistance,
    CarryCount,
    Volume,
    DeliveryOnly,
    SharedFloor,
    SharedElevator,
    FurnitureCategory,
    FurnitureKind { category: FurnitureCategory },
    PlacesConfirm,
    PlacesInput,
    LiftingNeeded,
    ItemFloor,
    ItemElevator,
    SplitMethod,
    ElevatorPlaces,
    StairsPlaces,
    Assembly,
    DeclaredValue,
    AddAnotherItem,
    StorageQuestion,
    StorageDays,
    StorageVolume { days: u32 },
    Quoted,
    ViewPrices,
    Ended,
}

impl DialogState {
    /// States answered by typing rather than pressing a button.
    pub fn expects_text(self) -> bool {
        matches!(
            self,
            Self::BoundaryDistance
                | Self::RouteDistance { .. }
                | Self::DoorDistance
                | Self::CarryCount
                | Self::SharedFloor
                | Self::PlacesInput
                | Self::ItemFloor
                | Self::ElevatorPlaces
                | Self::StairsPlaces
                | Self::DeclaredValue
                | Self::StorageDays
                | Self::StorageVolume { .. }
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MainMenu => "main_menu",
            Self::AddressZone => "address_zone",
            Self::BoundaryDistance => "boundary_distance",
            Self::AddStop => "add_stop",
            Self::RouteFrom => "route_from",
            Self::RouteTo { .. } => "route_to",
            Self::RouteDistance { .. } => "route_distance",
            Self::CarryQuestion => "carry_question",
            Self::DoorDistance => "door_distance",
            Self::CarryCount => "carry_count",
            Self::Volume => "volume",
            Self::DeliveryOnly => "delivery_only",
            Self::SharedFloor => "shared_floor",
            Self::SharedElevator => "shared_elevator",
            Self::FurnitureCategory => "furniture_category",
            Self::FurnitureKind { .. } => "furniture_kind",
            Self::PlacesConfirm => "places_confirm",
            Self::PlacesInput => "places_input",
            Self::LiftingNeeded => "lifting_needed",
            Self::ItemFloor => "item_floor",
            Self::ItemElevator => "item_elevator",
            Self::SplitMethod => "split_method",
            Self::ElevatorPlaces => "elevator_places",
            Self::StairsPlaces => "stairs_places",
            Self::Assembly => "assembly",
            Self::DeclaredValue => "declared_value",
            Self::AddAnotherItem => "add_another_item",
            Self::StorageQuestion => "storage_question",
            Self::StorageDays => "storage_days",
            Self::StorageVolume { .. } => "storage_volume",
            Self::Quoted => "quoted",
            Self::ViewPrices => "view_prices",
            Self::Ended => "ended",
        }
    }
}

/// A button the user can press. Each choice has a stable action id for transports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    StartDelivery,
    StartStorage,
    ViewPrices,
    RefreshPrices,
    Zone(Zone),
    Yes,
    No,
    AddStop,
    FinishStops,
    Volume(VolumeClass),
    Category(FurnitureCategory),
    Kind(FurnitureKind),
    KeepPlaces,
    ChangePlaces,
    AllByElevator,
    MixedLift,
    NewQuote,
    Back,
}

impl Choice {
    pub fn action_id(self) -> String {
        match self {
            Self::StartDelivery => "menu:delivery".to_owned(),
            Self::StartStorage => "menu:storage".to_owned(),
            Self::ViewPrices => "menu:prices".to_owned(),
            Self::RefreshPrices => "menu:refresh".to_owned(),
            Self::Zone(Zone::Near) => "zone:near".to_owned(),
            Self::Zone(Zone::Far) => "zone:far".to_owned(),
            Self::Yes => "yes".to_owned(),
            Self::No => "no".to_owned(),
            Self::AddStop => "stops:add".to_owned(),
            Self::FinishStops => "stops:finish".to_owned(),
            Self::Volume(class) => format!("volume:{}", class.rate_key()),
            Self::Category(category) => format!("category:{}", category.key()),
            Self::Kind(kind) => format!("kind:{}", kind.key()),
            Self::KeepPlaces => "places:keep".to_owned(),
            Self::ChangePlaces => "places:change".to_owned(),
            Self::AllByElevator => "lift:all_elevator".to_owned(),
            Self::MixedLift => "lift:mixed".to_owned(),
            Self::NewQuote => "quote:new".to_owned(),
            Self::Back => "back".to_owned(),
        }
    }

    pub fn from_action_id(action_id: &str) -> Option<Self> {
        let choice = match action_id {
            "menu:delivery" => Self::StartDelivery,
            "menu:storage" => Self::StartStorage,
            "menu:prices" => Self::ViewPrices,
            "menu:refresh" => Self::RefreshPrices,
            "zone:near" => Self::Zone(Zone::Near),
            "zone:far" => Self::Zone(Zone::Far),
            "yes" => Self::Yes,
            "no" => Self::No,
            "stops:add" => Self::AddStop,
            "stops:finish" => Self::FinishStops,
            "places:keep" => Self::KeepPlaces,
            "places:change" => Self::ChangePlaces,
            "lift:all_elevator" => Self::AllByElevator,
            "lift:mixed" => Self::MixedLift,
            "quote:new" => Self::NewQuote,
            "back" => Self::Back,
            other => {
                let (prefix, value) = other.split_once(':')?;
                return match prefix {
                    "volume" => VolumeClass::from_rate_key(value).map(Self::Volume),
                    "category" => FurnitureCategory::from_key(value).map(Self::Category),
                    "kind" => value.parse::<FurnitureKind>().ok().map(Self::Kind),
                    _ => None,
                };
            }
        };
        Some(choice)
    }
}

/// Input delivered to the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    /// `/start` or `/restart`.
    Start,
    /// `/cancel`.
    Cancel,
    Choose(Choice),
    Text(String),
}

impl UserAction {
    pub fn describe(&self) -> String {
        match self {
            Self::Start => "start".to_owned(),
            Self::Cancel => "cancel".to_owned(),
            Self::Choose(choice) => choice.action_id(),
            Self::Text(_) => "text".to_owned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub choice: Choice,
    pub label: String,
}

impl Button {
    pub fn new(choice: Choice, label: impl Into<String>) -> Self {
        Self { choice, label: label.into() }
    }
}

/// What the user sees next: text plus button rows, or a free-text question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub text: String,
    pub rows: Vec<Vec<Button>>,
    pub expects_text: bool,
}

impl Prompt {
    pub fn question(text: impl Into<String>) -> Self {
        Self { text: text.into(), rows: Vec::new(), expects_text: true }
    }

    pub fn choices(text: impl Into<String>) -> Self {
        Self { text: text.into(), rows: Vec::new(), expects_text: false }
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    pub fn button(self, choice: Choice, label: impl Into<String>) -> Self {
        self.row(vec![Button::new(choice, label)])
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    pub fn offers(&self, choice: Choice) -> bool {
        self.buttons().any(|button| button.choice == choice)
    }
}

/// Side effects the chat layer performs after a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum DialogEffect {
    ShowPriceList,
    RefreshRates,
    EndSession,
}

#[cfg(test)]
mod tests {
    use super::{Choice, DialogState};
    use crate::domain::catalog::{FurnitureCategory, FurnitureKind};
    use crate::domain::request::{VolumeClass, Zone};

    #[test]
    fn action_ids_parse_back_to_the_same_choice() {
        let choices = [
            Choice::StartDelivery,
            Choice::RefreshPrices,
            Choice::Zone(Zone::Far),
            Choice::Volume(VolumeClass::From10To18),
            Choice::Category(FurnitureCategory::Mirror),
            Choice::Kind(FurnitureKind::MarbleTableUpTo150kg),
            Choice::MixedLift,
            Choice::Back,
        ];
        for choice in choices {
            assert_eq!(Choice::from_action_id(&choice.action_id()), Some(choice));
        }
    }

    #[test]
    fn unknown_action_ids_are_rejected() {
        assert_eq!(Choice::from_action_id("kind:piano"), None);
        assert_eq!(Choice::from_action_id("volume:huge"), None);
        assert_eq!(Choice::from_action_id("launch"), None);
    }

    #[test]
    fn numeric_states_expect_text() {
        assert!(DialogState::BoundaryDistance.expects_text());
        assert!(DialogState::StorageVolume { days: 3 }.expects_text());
        assert!(!DialogState::Volume.expects_text());
        assert!(!DialogState::FurnitureKind { category: FurnitureCategory::Sofa }.expects_text());
    }
}

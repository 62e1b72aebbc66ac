use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

use self::AssemblyPricing::{Flat, ValueBased};
use self::FurnitureCategory as C;
use self::FurnitureKind as K;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FurnitureCategory {
    Sofa,
    Bed,
    Table,
    Shelf,
    Chest,
    Chair,
    Mirror,
    Cabinet,
    Other,
}

impl FurnitureCategory {
    pub const ALL: [FurnitureCategory; 9] = [
        Self::Sofa,
        Self::Bed,
        Self::Table,
        Self::Shelf,
        Self::Chest,
        Self::Chair,
        Self::Mirror,
        Self::Cabinet,
        Self::Other,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Sofa => "sofa",
            Self::Bed => "bed",
            Self::Table => "table",
            Self::Shelf => "shelf",
            Self::Chest => "chest",
            Self::Chair => "chair",
            Self::Mirror => "mirror",
            Self::Cabinet => "cabinet",
            Self::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sofa => "Sofas",
            Self::Bed => "Beds",
            Self::Table => "Tables",
            Self::Shelf => "Shelving",
            Self::Chest => "Chests / TV stands",
            Self::Chair => "Armchairs / chairs",
            Self::Mirror => "Mirrors / pictures",
            Self::Cabinet => "Cabinets",
            Self::Other => "Other",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.key() == key)
    }

    /// Kinds offered in this category, in picker order.
    pub fn kinds(self) -> impl Iterator<Item = FurnitureKind> {
        CATALOG.iter().filter(move |entry| entry.category == self).map(|entry| entry.kind)
    }
}

/// How a kind's assembly is priced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblyPricing {
    /// Flat fee stored under `assembly.<category>`.
    Flat(&'static str),
    /// Percent of the declared furniture value.
    ValueBased,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FurnitureKind {
    SofaUpTo2m,
    SofaUpTo3m,
    SofaCorner,
    SofaDisassembled,
    BedDisassembled,
    DiningTable,
    DeskConsole,
    MarbleTableUpTo60kg,
    MarbleTableUpTo90kg,
    MarbleTableUpTo120kg,
    MarbleTableUpTo150kg,
    MarbleTableUpTo200kg,
    ShelfUpTo1m,
    ShelfUpTo2m,
    ChestUpTo60kg,
    ChestUpTo90kg,
    ChestUpTo120kg,
    ChestUpTo150kg,
    Armchair,
    ChairPoufCoffeeTable,
    OttomanBench,
    MirrorUpTo1m,
    MirrorOver1m,
    CabinetSideboard,
    CabinetFurniture,
    DecorLight,
}

struct KindEntry {
    kind: FurnitureKind,
    key: &'static str,
    name: &'static str,
    category: FurnitureCategory,
    assembly: AssemblyPricing,
}

const fn entry(
    kind: FurnitureKind,
    key: &'static str,
    name: &'static str,
    category: FurnitureCategory,
    assembly: AssemblyPricing,
) -> KindEntry {
    KindEntry { kind, key, name, category, assembly }
}

// Rows follow the declaration order of `FurnitureKind`.
const CATALOG: &[KindEntry] = &[
    entry(
        K::SofaUpTo2m,
        "sofa_non_disassembled_up_to_2m",
        "Sofa up to 2 m (non-disassembled)",
        C::Sofa,
        Flat("sofa_straight"),
    ),
    entry(
        K::SofaUpTo3m,
        "sofa_non_disassembled_up_to_3m",
        "Sofa up to 3 m (non-disassembled)",
        C::Sofa,
        Flat("sofa_straight"),
    ),
    entry(K::SofaCorner, "sofa_corner", "Corner sofa", C::Sofa, Flat("sofa_corner")),
    entry(
        K::SofaDisassembled,
        "sofa_disassembled_1_seat",
        "Sofa (disassembled)",
        C::Sofa,
        Flat("sofa_straight"),
    ),
    entry(K::BedDisassembled, "bed_disassembled_1_seat", "Bed (disassembled)", C::Bed, Flat("bed")),
    entry(K::DiningTable, "dining_table", "Dining table", C::Table, Flat("dining_table")),
    entry(
        K::DeskConsole,
        "desk_console",
        "Desk / console",
        C::Table,
        Flat("table_console_desk_floor_lamp"),
    ),
    entry(
        K::MarbleTableUpTo60kg,
        "dining_table_marble_up_to_60kg",
        "Marble dining table up to 60 kg",
        C::Table,
        Flat("dining_table_marble"),
    ),
    entry(
        K::MarbleTableUpTo90kg,
        "dining_table_marble_up_to_90kg",
        "Marble dining table up to 90 kg",
        C::Table,
        Flat("dining_table_marble"),
    ),
    entry(
        K::MarbleTableUpTo120kg,
        "dining_table_marble_up_to_120kg",
        "Marble dining table up to 120 kg",
        C::Table,
        Flat("dining_table_marble"),
    ),
    entry(
        K::MarbleTableUpTo150kg,
        "dining_table_marble_up_to_150kg",
        "Marble dining table up to 150 kg",
        C::Table,
        Flat("dining_table_marble"),
    ),
    entry(
        K::MarbleTableUpTo200kg,
        "dining_table_marble_up_to_200kg",
        "Marble dining table up to 200 kg",
        C::Table,
        Flat("dining_table_marble"),
    ),
    entry(K::ShelfUpTo1m, "shelf_up_to_1m", "Shelving up to 1 m", C::Shelf, Flat("shelf_up_to_1m")),
    entry(K::ShelfUpTo2m, "shelf_up_to_2m", "Shelving up to 2 m", C::Shelf, Flat("shelf_up_to_2m")),
    entry(
        K::ChestUpTo60kg,
        "chest_tv_stand_up_to_60kg",
        "Chest / TV stand up to 60 kg",
        C::Chest,
        Flat("tv_stand_chest"),
    ),
    entry(
        K::ChestUpTo90kg,
        "chest_tv_stand_up_to_90kg",
        "Chest / TV stand up to 90 kg",
        C::Chest,
        Flat("tv_stand_chest"),
    ),
    entry(
        K::ChestUpTo120kg,
        "chest_tv_stand_up_to_120kg",
        "Chest / TV stand up to 120 kg",
        C::Chest,
        Flat("tv_stand_chest"),
    ),
    entry(
        K::ChestUpTo150kg,
        "chest_tv_stand_up_to_150kg",
        "Chest / TV stand up to 150 kg",
        C::Chest,
        Flat("tv_stand_chest"),
    ),
    entry(K::Armchair, "armchair", "Armchair", C::Chair, Flat("bench_armchair_chair")),
    entry(
        K::ChairPoufCoffeeTable,
        "chair_semi_armchair_pouf_coffee_table",
        "Chair / pouf / coffee table",
        C::Chair,
        Flat("bench_armchair_chair"),
    ),
    entry(
        K::OttomanBench,
        "ottoman_bedside_table_bench",
        "Ottoman / bedside table / bench",
        C::Chair,
        Flat("bench_armchair_chair"),
    ),
    entry(
        K::MirrorUpTo1m,
        "mirror_picture_up_to_1m",
        "Mirror / picture up to 1 m",
        C::Mirror,
        Flat("mirror_picture_up_to_1m"),
    ),
    entry(
        K::MirrorOver1m,
        "mirror_picture_over_1m",
        "Mirror / picture over 1 m",
        C::Mirror,
        Flat("mirror_picture_over_1m"),
    ),
    entry(K::CabinetSideboard, "cabinet_sideboard", "Cabinet / sideboard", C::Cabinet, ValueBased),
    entry(K::CabinetFurniture, "cabinet_furniture", "Case furniture", C::Cabinet, ValueBased),
    entry(K::DecorLight, "decor_light", "Decor / lighting", C::Other, AssemblyPricing::None),
];

impl FurnitureKind {
    fn entry(self) -> &'static KindEntry {
        &CATALOG[self as usize]
    }

    /// Rate-table key under `lifting`, also used as the stable identifier.
    pub fn key(self) -> &'static str {
        self.entry().key
    }

    pub fn display_name(self) -> &'static str {
        self.entry().name
    }

    pub fn category(self) -> FurnitureCategory {
        self.entry().category
    }

    pub fn assembly(self) -> AssemblyPricing {
        self.entry().assembly
    }

    pub fn is_value_based(self) -> bool {
        self.assembly() == AssemblyPricing::ValueBased
    }

    pub fn all() -> impl Iterator<Item = FurnitureKind> {
        CATALOG.iter().map(|entry| entry.kind)
    }
}

impl FromStr for FurnitureKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim();
        CATALOG
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.kind)
            .ok_or_else(|| DomainError::InvalidRequest(format!("unknown furniture kind `{key}`")))
    }
}

impl TryFrom<String> for FurnitureKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FurnitureKind> for String {
    fn from(kind: FurnitureKind) -> Self {
        kind.key().to_owned()
    }
}

impl fmt::Display for FurnitureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Human name for an `assembly.<category>` key, used in quote labels.
pub fn assembly_category_name(category: &str) -> &'static str {
    match category {
        "sofa_straight" => "straight sofa",
        "sofa_corner" => "corner sofa",
        "bed" => "bed",
        "shelf_up_to_1m" => "shelving up to 1 m",
        "shelf_up_to_2m" => "shelving up to 2 m",
        "tv_stand_chest" => "chest / TV stand",
        "table_console_desk_floor_lamp" => "desk / console",
        "dining_table" => "dining table",
        "dining_table_marble" => "marble dining table",
        "bench_armchair_chair" => "armchair / chair / bench",
        "mirror_picture_up_to_1m" => "mirror / picture up to 1 m",
        "mirror_picture_over_1m" => "mirror / picture over 1 m",
        _ => "furniture",
    }
}

#[cfg(test)]
mod tests {
    use super::{AssemblyPricing, FurnitureCategory, FurnitureKind};

    #[test]
    fn catalog_rows_follow_variant_order() {
        for (index, row) in super::CATALOG.iter().enumerate() {
            assert_eq!(row.kind as usize, index, "{} is out of order", row.key);
        }
    }

    #[test]
    fn every_kind_has_a_unique_key_and_round_trips() {
        let mut keys = std::collections::HashSet::new();
        for kind in FurnitureKind::all() {
            assert!(keys.insert(kind.key()), "duplicate key {}", kind.key());
            assert_eq!(kind.key().parse::<FurnitureKind>().expect("known key"), kind);
        }
        assert_eq!(keys.len(), 26);
    }

    #[test]
    fn every_category_offers_at_least_one_kind() {
        for category in FurnitureCategory::ALL {
            assert!(category.kinds().next().is_some(), "{category:?} is empty");
            assert_eq!(FurnitureCategory::from_key(category.key()), Some(category));
        }
    }

    #[test]
    fn sofas_share_the_straight_assembly_category() {
        assert_eq!(FurnitureKind::SofaUpTo3m.assembly(), AssemblyPricing::Flat("sofa_straight"));
        assert_eq!(FurnitureKind::SofaDisassembled.assembly(), AssemblyPricing::Flat("sofa_straight"));
        assert_eq!(FurnitureKind::SofaCorner.assembly(), AssemblyPricing::Flat("sofa_corner"));
    }

    #[test]
    fn cabinets_are_value_based_and_decor_has_no_assembly() {
        assert!(FurnitureKind::CabinetSideboard.is_value_based());
        assert!(FurnitureKind::CabinetFurniture.is_value_based());
        assert_eq!(FurnitureKind::DecorLight.assembly(), AssemblyPricing::None);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!("piano".parse::<FurnitureKind>().is_err());
    }

    #[test]
    fn kind_serializes_as_its_rate_key() {
        let json = serde_json::to_string(&FurnitureKind::ChestUpTo90kg).expect("serialize");
        assert_eq!(json, "\"chest_tv_stand_up_to_90kg\"");
        let parsed: FurnitureKind = serde_json::from_str("\"armchair\"").expect("deserialize");
        assert_eq!(parsed, FurnitureKind::Armchair);
    }
}

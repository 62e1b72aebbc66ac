use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::quote::format_amount;
use crate::rates::table::{truncate, RateTable};

/// Prices compared on refresh and shown in the admin price list.
pub const HEADLINE: &[(&str, &str)] = &[
    ("boundary_km", "Boundary, per km"),
    ("carry_from_parking", "Carry from parking"),
    ("delivery.up_to_1m3", "Delivery up to 1 m³"),
    ("delivery.1_to_5m3", "Delivery 1-5 m³"),
    ("delivery.5_to_10m3", "Delivery 5-10 m³"),
    ("delivery.10_to_18m3", "Delivery 10-18 m³"),
    ("lifting.sofa_non_disassembled_up_to_2m.price_per_place", "Lifting sofa up to 2 m"),
    ("lifting.sofa_non_disassembled_up_to_3m.price_per_place", "Lifting sofa up to 3 m"),
    ("lifting.sofa_corner.price_per_place", "Lifting corner sofa"),
    ("lifting.armchair.price_per_place", "Lifting armchair"),
    ("lifting.chair_semi_armchair_pouf_coffee_table.price_per_place", "Lifting chair/pouf"),
    ("lifting.bed_disassembled_1_seat.price_per_place", "Lifting bed"),
    ("assembly.bed", "Assembly bed"),
    ("assembly.sofa_straight", "Assembly straight sofa"),
    ("assembly.sofa_corner", "Assembly corner sofa"),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PriceChange {
    pub key: &'static str,
    pub name: &'static str,
    pub old: Decimal,
    pub new: Decimal,
}

pub fn headline_prices(table: &RateTable) -> Vec<(&'static str, &'static str, Option<Decimal>)> {
    HEADLINE.iter().map(|&(key, name)| (key, name, table.number_opt(key))).collect()
}

/// Headline prices present in both tables whose values differ.
pub fn compare(old: &RateTable, new: &RateTable) -> Vec<PriceChange> {
    HEADLINE
        .iter()
        .filter_map(|&(key, name)| match (old.number_opt(key), new.number_opt(key)) {
            (Some(before), Some(after)) if before != after => {
                Some(PriceChange { key, name, old: before, new: after })
            }
            _ => None,
        })
        .collect()
}

pub fn format_changes(changes: &[PriceChange], currency: &str) -> String {
    if changes.is_empty() {
        return "No changes detected".to_owned();
    }
    changes
        .iter()
        .map(|change| {
            format!(
                "• {}: {} → {} {currency}",
                change.name,
                format_amount(truncate(change.old)),
                format_amount(truncate(change.new))
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_price_list(table: Option<&RateTable>, currency: &str) -> String {
    let Some(table) = table.filter(|table| !table.is_empty()) else {
        return "Rates are not loaded".to_owned();
    };

    let mut lines = headline_prices(table)
        .into_iter()
        .filter_map(|(_, name, value)| value.map(|value| (name, value)))
        .map(|(name, value)| format!("• {name}: {} {currency}", format_amount(truncate(value))))
        .collect::<Vec<_>>();

    if let Some(storage) = table.number_opt("storage.per_day_per_m3") {
        lines.push(format!("• Storage: {storage} {currency} per day per m³"));
    }
    lines.join("\n")
}

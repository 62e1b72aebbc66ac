use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{assembly_category_name, AssemblyPricing};
use crate::domain::quote::{format_amount, with_currency, LineKind, Quote, QuoteLine};
use crate::domain::request::{FurnitureItem, LiftMethod, QuoteRequest, Zone};
use crate::rates::table::{truncate, RateTable};

pub const DEFAULT_CURRENCY: &str = "RUB";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub currency: String,
    pub steps: Vec<PricingTraceStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub quote: Quote,
    pub trace: PricingTrace,
}

/// Turns a finished request into an itemized quote. Implementations must not do I/O.
pub trait QuoteEngine: Send + Sync {
    fn price(&self, request: &QuoteRequest, rates: &RateTable) -> PricingResult;
}

#[derive(Clone, Debug)]
pub struct DeterministicQuoteEngine {
    currency: String,
}

impl DeterministicQuoteEngine {
    pub fn new(currency: impl Into<String>) -> Self {
        Self { currency: currency.into() }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl Default for DeterministicQuoteEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY)
    }
}

impl QuoteEngine for DeterministicQuoteEngine {
    fn price(&self, request: &QuoteRequest, rates: &RateTable) -> PricingResult {
        price_request(request, rates, &self.currency)
    }
}

struct LineBuilder<'a> {
    currency: &'a str,
    lines: Vec<QuoteLine>,
    running_total: i64,
}

impl<'a> LineBuilder<'a> {
    fn money(&self, amount: i64) -> String {
        with_currency(amount, self.currency)
    }

    fn push(&mut self, kind: LineKind, label: String, amount: i64) {
        self.running_total += amount;
        self.lines.push(QuoteLine { kind, label, amount });
    }
}

pub fn price_request(request: &QuoteRequest, rates: &RateTable, currency: &str) -> PricingResult {
    let mut builder = LineBuilder { currency, lines: Vec::new(), running_total: 0 };

    if !request.storage_only {
        delivery(&mut builder, request, rates);
        boundary_surcharge(&mut builder, request, rates);
        if !request.delivery_only {
            for item in &request.furniture_items {
                lifting(&mut builder, item, rates);
            }
            for item in &request.furniture_items {
                assembly(&mut builder, item, rates);
            }
        }
        carry(&mut builder, request, rates);
        route_mileage(&mut builder, request, rates);
        waiting(&mut builder, request, rates);
        assembly_departure(&mut builder, request, rates);
    }

    storage(&mut builder, request, rates);

    if !request.storage_only {
        packaging(&mut builder, request, rates);
    }

    if request.partner_discount {
        partner_discount(&mut builder, rates);
    }

    let total = builder.running_total;
    let mut steps = builder
        .lines
        .iter()
        .map(|line| PricingTraceStep {
            stage: line.kind.stage().to_owned(),
            detail: line.label.clone(),
            amount: Decimal::from(line.amount),
        })
        .collect::<Vec<_>>();
    steps.push(PricingTraceStep {
        stage: "total".to_owned(),
        detail: "sum(line amounts)".to_owned(),
        amount: Decimal::from(total),
    });

    PricingResult {
        quote: Quote { lines: builder.lines, total, currency: currency.to_owned() },
        trace: PricingTrace { currency: currency.to_owned(), steps },
    }
}

/// Rate with grouped thousands, keeping any fractional part (`1 500.5`).
fn format_rate(rate: Decimal) -> String {
    let whole = format_amount(truncate(rate));
    let fraction = rate.fract().abs().normalize();
    if fraction.is_zero() {
        whole
    } else {
        format!("{whole}{}", fraction.to_string().trim_start_matches('0'))
    }
}

fn delivery(builder: &mut LineBuilder<'_>, request: &QuoteRequest, rates: &RateTable) {
    let Some(class) = request.volume_class else {
        return;
    };
    let destination = match request.zone {
        Some(Zone::Far) => "Delivery to house door",
        _ => "Delivery to entrance",
    };
    let base = rates.delivery_base(class);
    let extra = request.extra_routes.len();

    if extra > 0 {
        let rate = rates.additional_address(class);
        let total = truncate(base + rate * Decimal::from(extra));
        let label = format!(
            "{destination} ({} addresses): {} + {extra} × {} = {}",
            extra + 1,
            format_rate(base),
            format_rate(rate),
            builder.money(total)
        );
        builder.push(LineKind::Delivery, label, total);
    } else {
        let base = truncate(base);
        let label = format!("{destination}: {}", builder.money(base));
        builder.push(LineKind::Delivery, label, base);
    }
}

fn boundary_surcharge(builder: &mut LineBuilder<'_>, request: &QuoteRequest, rates: &RateTable) {
    if !request.is_far() || request.boundary_distance_km == 0 {
        return;
    }
    let cost = truncate(Decimal::from(request.boundary_distance_km) * rates.boundary_km_rate());
    let label = format!(
        "Boundary surcharge ({} km): {}",
        request.boundary_distance_km,
        builder.money(cost)
    );
    builder.push(LineKind::BoundarySurcharge, label, cost);
}

fn lifting(builder: &mut LineBuilder<'_>, item: &FurnitureItem, rates: &RateTable) {
    let Some(lift) = item.lifting else {
        return;
    };
    let Some(rate) = rates.lifting(item.kind) else {
        return;
    };

    let (floor, basement) = lift.effective_floor();
    let floor_text = if basement {
        "basement (2nd floor tariff)".to_owned()
    } else {
        format!("floor {floor}")
    };
    let name = item.kind.display_name().to_lowercase();
    let price = rate.price_per_place;
    let shown_price = format_rate(price);
    let floor_factor = Decimal::from(floor);
    let places = item.places_count;

    let (cost, label) = match lift.method(places) {
        LiftMethod::Mixed => {
            let cost = truncate(
                price * Decimal::from(lift.elevator_places)
                    + price * floor_factor * Decimal::from(lift.stairs_places),
            );
            let label = format!(
                "Lifting {name} to {floor_text}: {} by elevator × {shown_price} + {} by stairs × {shown_price} × {floor} = {}",
                lift.elevator_places,
                lift.stairs_places,
                builder.money(cost)
            );
            (cost, label)
        }
        LiftMethod::Elevator => {
            let cost = truncate(price * Decimal::from(places));
            let label = if places > 1 {
                format!(
                    "Lifting {name} to {floor_text} (elevator): {places} places × {shown_price} = {}",
                    builder.money(cost)
                )
            } else {
                format!("Lifting {name} to {floor_text} (elevator): {}", builder.money(cost))
            };
            (cost, label)
        }
        LiftMethod::Stairs => {
            let cost = truncate(price * floor_factor * Decimal::from(places));
            let label = if places > 1 {
                format!(
                    "Lifting {name} to {floor_text} (no elevator): {places} places × {shown_price} × {floor} = {}",
                    builder.money(cost)
                )
            } else {
                format!(
                    "Lifting {name} to {floor_text} (no elevator): {shown_price} × {floor} = {}",
                    builder.money(cost)
                )
            };
            (cost, label)
        }
    };

    builder.push(LineKind::Lifting, label, cost);
}

fn assembly(builder: &mut LineBuilder<'_>, item: &FurnitureItem, rates: &RateTable) {
    if !item.assembly_needed {
        return;
    }

    if let AssemblyPricing::Flat(category) = item.kind.assembly() {
        if let Some(cost) = rates.assembly_flat(category) {
            let label = format!("Assembly {}: {}", assembly_category_name(category), builder.money(cost));
            builder.push(LineKind::Assembly, label, cost);
        }
    }

    if item.kind.is_value_based() {
        if let Some(value) = item.declared_value.filter(|value| *value > 0) {
            let percent = rates.assembly_value_percent();
            let cost = truncate(
                (Decimal::from(value) * percent / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
            );
            let label = format!(
                "Assembly {} ({}% of value): {}",
                item.kind.display_name().to_lowercase(),
                percent.normalize(),
                builder.money(cost)
            );
            builder.push(LineKind::Assembly, label, cost);
        }
    }
}

fn carry(builder: &mut LineBuilder<'_>, request: &QuoteRequest, rates: &RateTable) {
    if request.carry_count == 0 {
        return;
    }
    let cost = truncate(Decimal::from(request.carry_count) * rates.carry_fee());
    let times = if request.carry_count == 1 { "time" } else { "times" };
    let label =
        format!("Carry from parking: {} {times} ({})", request.carry_count, builder.money(cost));
    builder.push(LineKind::Carry, label, cost);
}

fn route_mileage(builder: &mut LineBuilder<'_>, request: &QuoteRequest, rates: &RateTable) {
    let per_km = rates.boundary_km_rate();
    for route in request.extra_routes.iter().filter(|route| route.touches_far()) {
        let cost = truncate(Decimal::from(route.distance_km) * per_km);
        let label = format!(
            "Extra route {} → {} ({} km): {} ({}/km)",
            route.from.short_label(),
            route.to.short_label(),
            route.distance_km,
            builder.money(cost),
            format_rate(per_km)
        );
        builder.push(LineKind::RouteMileage, label, cost);
    }
}

fn waiting(builder: &mut LineBuilder<'_>, request: &QuoteRequest, rates: &RateTable) {
    let Some(band) = request.wait_band else {
        return;
    };
    let cost = truncate(rates.waiting_rate(band));
    if cost > 0 {
        let label = format!("Waiting time ({}): {}", band.label(), builder.money(cost));
        builder.push(LineKind::Waiting, label, cost);
    }
}

fn assembly_departure(builder: &mut LineBuilder<'_>, request: &QuoteRequest, rates: &RateTable) {
    if !request.assembly_departure {
        return;
    }
    let mut cost = rates.departure_base();
    if request.is_far() {
        cost += Decimal::from(request.boundary_distance_km) * rates.departure_km_rate();
    }
    let cost = truncate(cost);
    let label = format!("Assembly departure: {}", builder.money(cost));
    builder.push(LineKind::AssemblyDeparture, label, cost);
}

fn storage(builder: &mut LineBuilder<'_>, request: &QuoteRequest, rates: &RateTable) {
    if !(request.storage_only || request.storage_requested) {
        return;
    }
    let Some(storage) = request.storage.as_ref() else {
        return;
    };
    if storage.days == 0 || storage.volume_m3 <= Decimal::ZERO {
        return;
    }

    let rate = rates.storage_rate();
    let cost = truncate(Decimal::from(storage.days) * storage.volume_m3 * rate);
    let label = format!(
        "Storage ({} days, {} m³): {} ({} per day per m³)",
        storage.days,
        storage.volume_m3.normalize(),
        builder.money(cost),
        rate.normalize()
    );
    builder.push(LineKind::Storage, label, cost);
}

fn packaging(builder: &mut LineBuilder<'_>, request: &QuoteRequest, rates: &RateTable) {
    if request.packaging_meters <= Decimal::ZERO {
        return;
    }
    let cost = truncate(request.packaging_meters * rates.packaging_rate());
    let label = format!(
        "Packaging ({} m): {}",
        request.packaging_meters.normalize(),
        builder.money(cost)
    );
    builder.push(LineKind::Packaging, label, cost);
}

fn partner_discount(builder: &mut LineBuilder<'_>, rates: &RateTable) {
    let percent = rates.partner_discount_percent();
    let discount =
        truncate((Decimal::from(builder.running_total) * percent / Decimal::ONE_HUNDRED).floor());
    let label = format!(
        "Partner discount ({}%): -{}",
        percent.normalize(),
        builder.money(discount)
    );
    builder.push(LineKind::PartnerDiscount, label, -discount);
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{DeterministicQuoteEngine, QuoteEngine};
    use crate::domain::catalog::FurnitureKind;
    use crate::domain::quote::LineKind;
    use crate::domain::request::{
        ExtraRoute, FurnitureItem, Lifting, QuoteRequest, StorageRequest, VolumeClass, WaitBand,
        Zone,
    };
    use crate::rates::table::RateTable;

    fn rates() -> RateTable {
        RateTable::from_value(json!({
            "boundary_km": 60,
            "carry_from_parking": 1000,
            "delivery": {"up_to_1m3": 3000, "1_to_5m3": 5000, "5_to_10m3": 8000, "10_to_18m3": 12000},
            "additional_address": {"up_to_1m3": 1000, "1_to_5m3": 2000},
            "lifting": {
                "sofa_non_disassembled_up_to_2m": {"price_per_place": 700, "places_count": 1},
                "sofa_corner": {"price_per_place": 900, "places_count": 3}
            },
            "assembly": {"sofa_straight": 2500, "sofa_corner": 4000},
            "storage": {"per_day_per_m3": 12.5},
            "packaging": {"per_meter": 45},
            "waiting_time": {"15_to_30_min": 500, "30_min_to_1_hour": 1000},
            "assembly_departure": {"base": 1500, "per_km": 40}
        }))
        .expect("rates fixture")
    }

    fn near(class: VolumeClass) -> QuoteRequest {
        QuoteRequest { zone: Some(Zone::Near), volume_class: Some(class), ..QuoteRequest::default() }
    }

    fn engine() -> DeterministicQuoteEngine {
        DeterministicQuoteEngine::new("RUB")
    }

    fn lifting_total(request: &QuoteRequest) -> i64 {
        engine().price(request, &rates()).quote.lines_of(LineKind::Lifting).map(|line| line.amount).sum()
    }

    #[test]
    fn near_sofa_by_stairs_with_assembly() {
        let mut request = near(VolumeClass::From1To5);
        request.furniture_items.push(
            FurnitureItem::new(FurnitureKind::SofaUpTo2m, 1)
                .with_lifting(Lifting::by_stairs(3, 1))
                .with_assembly(),
        );

        let quote = engine().price(&request, &rates()).quote;

        assert_eq!(quote.total, 5000 + 700 * 3 + 2500);
        assert!(!quote.has_line(LineKind::Carry));
        assert_eq!(quote.lines[0].label, "Delivery to entrance: 5 000 RUB");
        assert_eq!(
            quote.lines[1].label,
            "Lifting sofa up to 2 m (non-disassembled) to floor 3 (no elevator): 700 × 3 = 2 100 RUB"
        );
    }

    #[test]
    fn far_delivery_only_adds_boundary_surcharge() {
        let mut request = QuoteRequest {
            zone: Some(Zone::Far),
            boundary_distance_km: 20,
            volume_class: Some(VolumeClass::From5To10),
            delivery_only: true,
            ..QuoteRequest::default()
        };
        request.furniture_items.push(
            FurnitureItem::new(FurnitureKind::SofaCorner, 3)
                .with_lifting(Lifting::by_stairs(5, 3))
                .with_assembly(),
        );

        let quote = engine().price(&request, &rates()).quote;

        assert_eq!(quote.total, 8000 + 20 * 60);
        assert!(!quote.has_line(LineKind::Lifting));
        assert!(!quote.has_line(LineKind::Assembly));
        assert!(quote.lines[0].label.starts_with("Delivery to house door"));
    }

    #[test]
    fn basement_floors_use_second_floor_tariff() {
        for floor in [-5, -1, 0] {
            let mut request = near(VolumeClass::UpTo1);
            request.furniture_items.push(
                FurnitureItem::new(FurnitureKind::SofaUpTo2m, 1).with_lifting(Lifting::by_stairs(floor, 1)),
            );
            let quote = engine().price(&request, &rates()).quote;
            let line = quote.lines_of(LineKind::Lifting).next().expect("lifting line");
            assert_eq!(line.amount, 700 * 2);
            assert!(line.label.contains("basement (2nd floor tariff)"));
        }
    }

    #[test]
    fn elevator_cost_ignores_floor() {
        for floor in [1, 9, 150] {
            let mut request = near(VolumeClass::UpTo1);
            request.furniture_items.push(
                FurnitureItem::new(FurnitureKind::SofaCorner, 3).with_lifting(Lifting::by_elevator(floor, 3)),
            );
            assert_eq!(lifting_total(&request), 900 * 3);
        }
    }

    #[test]
    fn mixed_lift_prices_each_part() {
        let mut request = near(VolumeClass::UpTo1);
        request.furniture_items.push(
            FurnitureItem::new(FurnitureKind::SofaCorner, 3).with_lifting(Lifting::mixed(4, 1, 2)),
        );
        assert_eq!(lifting_total(&request), 900 + 900 * 4 * 2);
    }

    #[test]
    fn kinds_missing_from_table_get_no_lifting_line() {
        let mut request = near(VolumeClass::UpTo1);
        request
            .furniture_items
            .push(FurnitureItem::new(FurnitureKind::Armchair, 1).with_lifting(Lifting::by_stairs(3, 1)));
        assert_eq!(lifting_total(&request), 0);
    }

    #[test]
    fn extra_routes_add_addresses_and_far_mileage() {
        let mut request = near(VolumeClass::From1To5);
        request.extra_routes = vec![
            ExtraRoute { from: Zone::Near, to: Zone::Near, distance_km: 0 },
            ExtraRoute { from: Zone::Near, to: Zone::Far, distance_km: 15 },
        ];

        let quote = engine().price(&request, &rates()).quote;

        assert_eq!(quote.lines[0].amount, 5000 + 2 * 2000);
        assert_eq!(
            quote.lines[0].label,
            "Delivery to entrance (3 addresses): 5 000 + 2 × 2 000 = 9 000 RUB"
        );
        let mileage = quote.lines_of(LineKind::RouteMileage).collect::<Vec<_>>();
        assert_eq!(mileage.len(), 1);
        assert_eq!(mileage[0].amount, 15 * 60);
        assert_eq!(mileage[0].label, "Extra route Near → Far (15 km): 900 RUB (60/km)");
    }

    #[test]
    fn value_based_assembly_rounds_half_away_from_zero() {
        let mut request = near(VolumeClass::UpTo1);
        request.furniture_items.push(
            FurnitureItem::new(FurnitureKind::CabinetFurniture, 1)
                .with_assembly()
                .with_declared_value(50),
        );

        let quote = engine().price(&request, &rates()).quote;
        let line = quote.lines_of(LineKind::Assembly).next().expect("assembly line");

        // 50 × 7% = 3.5
        assert_eq!(line.amount, 4);
        assert!(line.label.contains("(7% of value)"));
    }

    #[test]
    fn missing_assembly_group_omits_assembly_lines() {
        let mut bare = rates().as_value();
        bare.as_object_mut().expect("object").remove("assembly");
        let table = RateTable::from_value(bare).expect("object");

        let mut request = near(VolumeClass::UpTo1);
        request
            .furniture_items
            .push(FurnitureItem::new(FurnitureKind::SofaCorner, 3).with_assembly());
        request.furniture_items.push(
            FurnitureItem::new(FurnitureKind::CabinetSideboard, 1)
                .with_assembly()
                .with_declared_value(100_000),
        );

        let quote = engine().price(&request, &table).quote;
        let assembly = quote.lines_of(LineKind::Assembly).collect::<Vec<_>>();

        // only the value-based line survives, with the 7% default
        assert_eq!(assembly.len(), 1);
        assert_eq!(assembly[0].amount, 7000);
    }

    #[test]
    fn storage_line_requires_flag_and_positive_inputs() {
        let storage = StorageRequest { days: 10, volume_m3: Decimal::new(25, 1) };

        let mut delivery = near(VolumeClass::UpTo1);
        delivery.storage = Some(storage.clone());
        assert!(!engine().price(&delivery, &rates()).quote.has_line(LineKind::Storage));

        delivery.storage_requested = true;
        let quote = engine().price(&delivery, &rates()).quote;
        let line = quote.lines_of(LineKind::Storage).next().expect("storage line");
        // 10 × 2.5 × 12.5 = 312.5
        assert_eq!(line.amount, 312);
        assert_eq!(line.label, "Storage (10 days, 2.5 m³): 312 RUB (12.5 per day per m³)");
    }

    #[test]
    fn storage_only_skips_delivery_steps() {
        let mut request = QuoteRequest::storage_only(30, Decimal::from(4));
        request.packaging_meters = Decimal::from(10);
        request.wait_band = Some(WaitBand::UpTo30Min);

        let quote = engine().price(&request, &rates()).quote;

        assert_eq!(quote.lines.len(), 1);
        assert_eq!(quote.total, 30 * 4 * 12 + 30 * 4 / 2);
    }

    #[test]
    fn partner_discount_applies_once_on_running_total() {
        let mut request = near(VolumeClass::From1To5);
        request.carry_count = 1;
        request.partner_discount = true;

        let result = engine().price(&request, &rates());
        let quote = result.quote;
        let last = quote.lines.last().expect("discount line");

        assert_eq!(last.kind, LineKind::PartnerDiscount);
        assert_eq!(last.amount, -1800);
        assert_eq!(last.label, "Partner discount (30%): -1 800 RUB");
        assert_eq!(quote.total, 6000 - 1800);
        assert_eq!(quote.lines_of(LineKind::PartnerDiscount).count(), 1);
        assert_eq!(result.trace.steps.last().map(|step| step.stage.as_str()), Some("total"));
    }

    #[test]
    fn partner_discount_floors_fractional_amounts() {
        let table = RateTable::from_value(json!({
            "delivery": {"up_to_1m3": 1001},
            "partner_discount": 15
        }))
        .expect("object");
        let mut request = near(VolumeClass::UpTo1);
        request.partner_discount = true;

        let quote = engine().price(&request, &table).quote;
        // 1001 × 15% = 150.15
        assert_eq!(quote.total, 1001 - 150);
    }

    #[test]
    fn optional_surcharges_follow_request_flags() {
        let mut request = QuoteRequest {
            zone: Some(Zone::Far),
            boundary_distance_km: 10,
            volume_class: Some(VolumeClass::UpTo1),
            wait_band: Some(WaitBand::UpTo1Hour),
            assembly_departure: true,
            carry_count: 2,
            ..QuoteRequest::default()
        };
        request.packaging_meters = Decimal::new(35, 1);

        let quote = engine().price(&request, &rates()).quote;
        let kinds = quote.lines.iter().map(|line| line.kind).collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec![
                LineKind::Delivery,
                LineKind::BoundarySurcharge,
                LineKind::Carry,
                LineKind::Waiting,
                LineKind::AssemblyDeparture,
                LineKind::Packaging,
            ]
        );
        assert_eq!(quote.total, 3000 + 600 + 2000 + 1000 + (1500 + 10 * 40) + 157);
    }

    #[test]
    fn empty_table_prices_to_zero_without_failing() {
        let mut request = near(VolumeClass::From10To18);
        request.furniture_items.push(
            FurnitureItem::new(FurnitureKind::SofaCorner, 3)
                .with_lifting(Lifting::by_stairs(3, 3))
                .with_assembly(),
        );
        let quote = engine().price(&request, &RateTable::default()).quote;
        assert_eq!(quote.total, 0);
        assert_eq!(quote.lines.len(), 1);
    }

    #[test]
    fn fractional_rates_are_truncated_once_per_line() {
        let rates = RateTable::from_value(json!({
            "boundary_km": 60.5,
            "carry_from_parking": "1500.5",
            "assembly_departure": {"base": 1500, "per_km": 40.25}
        }))
        .expect("fractional rates");
        let request = QuoteRequest {
            zone: Some(Zone::Far),
            boundary_distance_km: 20,
            volume_class: Some(VolumeClass::UpTo1),
            delivery_only: true,
            carry_count: 3,
            ..QuoteRequest::default()
        };

        let quote = engine().price(&request, &rates).quote;

        let boundary = quote.lines_of(LineKind::BoundarySurcharge).next().expect("boundary line");
        assert_eq!(boundary.amount, 1210);
        let carry = quote.lines_of(LineKind::Carry).next().expect("carry line");
        assert_eq!(carry.amount, 4501);
        assert_eq!(quote.total, 5711);

        let with_departure = QuoteRequest { assembly_departure: true, ..request };
        let quote = engine().price(&with_departure, &rates).quote;
        let departure = quote.lines_of(LineKind::AssemblyDeparture).next().expect("departure line");
        assert_eq!(departure.amount, 1500 + 805);
    }
}

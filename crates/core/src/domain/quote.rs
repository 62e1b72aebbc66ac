use serde::{Deserialize, Serialize};

/// Width of the separator printed above the total line.
pub const SEPARATOR_WIDTH: usize = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Delivery,
    BoundarySurcharge,
    Lifting,
    Assembly,
    Carry,
    RouteMileage,
    Waiting,
    AssemblyDeparture,
    Storage,
    Packaging,
    PartnerDiscount,
}

impl LineKind {
    pub fn stage(self) -> &'static str {
        match self {
            Self::Delivery => "delivery",
            Self::BoundarySurcharge => "boundary_surcharge",
            Self::Lifting => "lifting",
            Self::Assembly => "assembly",
            Self::Carry => "carry",
            Self::RouteMileage => "route_mileage",
            Self::Waiting => "waiting",
            Self::AssemblyDeparture => "assembly_departure",
            Self::Storage => "storage",
            Self::Packaging => "packaging",
            Self::PartnerDiscount => "partner_discount",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub kind: LineKind,
    pub label: String,
    /// Signed so the discount line can carry a negative amount.
    pub amount: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub lines: Vec<QuoteLine>,
    pub total: i64,
    /// Label appended to amounts, e.g. `RUB`. Empty renders bare numbers.
    #[serde(default)]
    pub currency: String,
}

impl Quote {
    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &QuoteLine> {
        self.lines.iter().filter(move |line| line.kind == kind)
    }

    pub fn has_line(&self, kind: LineKind) -> bool {
        self.lines_of(kind).next().is_some()
    }

    /// Itemized lines followed by a separator and the total.
    pub fn render(&self) -> String {
        let mut out = self.lines.iter().map(|line| line.label.as_str()).collect::<Vec<_>>().join("\n");
        out.push_str("\n\n");
        out.push_str(&"=".repeat(SEPARATOR_WIDTH));
        out.push('\n');
        out.push_str(&format!("TOTAL: {}", with_currency(self.total, &self.currency)));
        out
    }
}

pub fn with_currency(amount: i64, currency: &str) -> String {
    if currency.is_empty() {
        format_amount(amount)
    } else {
        format!("{} {currency}", format_amount(amount))
    }
}

/// Groups digits in threes with a space, e.g. `1 250 000`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

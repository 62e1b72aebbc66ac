pub mod diff;
pub mod table;

pub use diff::{compare, format_changes, format_price_list, headline_prices, PriceChange, HEADLINE};
pub use table::{LiftingRate, RateTable};

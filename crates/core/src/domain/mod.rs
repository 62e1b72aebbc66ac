pub mod catalog;
pub mod quote;
pub mod request;

pub use catalog::{AssemblyPricing, FurnitureCategory, FurnitureKind};
pub use quote::{format_amount, with_currency, LineKind, Quote, QuoteLine};
pub use request::{
    ExtraRoute, FurnitureItem, LiftMethod, Lifting, QuoteRequest, StorageRequest, VolumeClass,
    WaitBand, Zone,
};

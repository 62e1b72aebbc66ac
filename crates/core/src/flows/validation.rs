use std::ops::RangeInclusive;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

/// Recoverable input problems. The message is shown to the user and the same question is asked again.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter a whole number for {field} ({range}).")]
    NotAnInteger { field: &'static str, range: String },
    #[error("Please enter a number for {field} ({range}).")]
    NotANumber { field: &'static str, range: String },
    #[error("The {field} must be {range}.")]
    OutOfRange { field: &'static str, range: String },
    #[error("The number of places by stairs must be exactly {expected}.")]
    SplitMismatch { expected: u32 },
    #[error("Please choose one of the buttons below.")]
    ButtonExpected,
    #[error("Please type your answer.")]
    TextExpected,
    #[error("That option is not available at this step.")]
    UnexpectedChoice,
    #[error("Only the administrator can do that.")]
    AdminOnly,
}

fn describe_range<T: std::fmt::Display>(range: &RangeInclusive<T>) -> String {
    format!("from {} to {}", range.start(), range.end())
}

/// Parses a whole number inside `range`.
pub fn parse_int<T>(text: &str, field: &'static str, range: RangeInclusive<T>) -> Result<T, InputError>
where
    T: FromStr + PartialOrd + std::fmt::Display,
{
    let value = text.trim().parse::<T>().map_err(|_| InputError::NotAnInteger {
        field,
        range: describe_range(&range),
    })?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(InputError::OutOfRange { field, range: describe_range(&range) })
    }
}

/// Parses a decimal, accepting a comma as the separator.
pub fn parse_decimal(text: &str, field: &'static str, range: RangeInclusive<Decimal>) -> Result<Decimal, InputError> {
    let cleaned = text.trim().replace(',', ".");
    let value = Decimal::from_str(&cleaned).map_err(|_| InputError::NotANumber {
        field,
        range: describe_range(&range),
    })?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(InputError::OutOfRange { field, range: describe_range(&range) })
    }
}

/// Parses a decimal in `(0, max]`.
pub fn parse_positive_decimal(text: &str, field: &'static str, max: Decimal) -> Result<Decimal, InputError> {
    let range = || format!("greater than 0 and at most {max}");
    let cleaned = text.trim().replace(',', ".");
    let value = Decimal::from_str(&cleaned)
        .map_err(|_| InputError::NotANumber { field, range: range() })?;
    if value > Decimal::ZERO && value <= max {
        Ok(value)
    } else {
        Err(InputError::OutOfRange { field, range: range() })
    }
}

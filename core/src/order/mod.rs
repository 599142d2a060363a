//! Schema of a pizza order as extracted from free text.

use std::fmt;

use chrono::{NaiveDateTime, NaiveTime};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::validation::{child, Validate, Violations};

mod calendar;
mod location;

pub(crate) use calendar::parse_time;

pub use location::{Component, Locator, Location, MISSING_LOCATOR, NOT_PROVIDED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    Medium,
    Large,
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        })
    }
}

/// One pizza entry of the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LineItem {
    /// Pizza name, first letter capitalized and the rest lowercase, e.g. "Hawaiian"
    pub name: String,
    pub size: Size,
    /// How many pizzas of this kind and size
    pub quantity: u32,
}

impl Validate for LineItem {
    fn validate(&mut self, path: &str, violations: &mut Violations) {
        violations.require_text(child(path, "name"), &self.name);
    }
}

/// How the delivery date and time are represented.
pub trait Schedule:
    JsonSchema + Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync
{
    /// Short label used in reports
    const PROFILE: &'static str;
}

/// Date and time kept as written in the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TextSchedule {
    /// Delivery date exactly as the text writes it, e.g. "July 4th, 2024"
    pub delivery_date: String,
    /// Delivery time exactly as the text writes it, e.g. "4:00 PM"
    pub delivery_time: String,
}

impl Schedule for TextSchedule {
    const PROFILE: &'static str = "text";
}

/// Date and time converted to calendar values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredSchedule {
    /// Delivery date as an ISO 8601 date-time at midnight, e.g. "2024-07-04T00:00:00"
    #[serde(deserialize_with = "calendar::deserialize_date_time")]
    pub delivery_date: NaiveDateTime,
    /// Delivery time in 24-hour form, e.g. "16:00:00"
    #[serde(deserialize_with = "calendar::deserialize_time")]
    pub delivery_time: NaiveTime,
}

impl Schedule for StructuredSchedule {
    const PROFILE: &'static str = "structured";
}

/// What was ordered and when it should arrive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Order<S> {
    #[serde(flatten)]
    pub schedule: S,
    /// Every pizza ordered, in the order the text mentions them. Empty when nothing was ordered.
    pub order_list: Vec<LineItem>,
}

impl<S> Order<S> {
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.order_list.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

impl<S> Validate for Order<S> {
    fn validate(&mut self, path: &str, violations: &mut Violations) {
        self.order_list
            .validate(&child(path, "order_list"), violations);
    }
}

/// Record a pizza delivery order described in free text.
///
/// Fill in `chain_of_thought` first: reason step by step about who is ordering,
/// whether it is a repeat order, every pizza with its size and quantity, the
/// delivery date and time, and each address component. Only then fill in the
/// remaining fields from that reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, orderly_macros::Extractor)]
#[extractor(name = "record_order", validate)]
pub struct ExtractionResult<S> {
    /// Written reasoning that precedes every other field
    pub chain_of_thought: String,
    /// Name of the person placing the order
    pub name: String,
    /// Whether the text says this is a repeat order, false when it does not say
    pub is_repeat_order: bool,
    pub order: Order<S>,
    pub address: Location,
}

impl<S> Validate for ExtractionResult<S> {
    fn validate(&mut self, path: &str, violations: &mut Violations) {
        violations.require_text(child(path, "chain_of_thought"), &self.chain_of_thought);
        violations.require_text(child(path, "name"), &self.name);
        self.order.validate(&child(path, "order"), violations);
    }
}

pub type TextExtraction = ExtractionResult<TextSchedule>;
pub type StructuredExtraction = ExtractionResult<StructuredSchedule>;

pub use orderly_macros::{client, Extractor};

pub use crate::assertions::{ExecutionStrategy, Expectations, ValidationReport, ValueKind};
pub use crate::completion::{Client, CompletionModel, Extractor};
pub use crate::error::Error;
pub use crate::order::{
    Component, ExtractionResult, LineItem, Location, Locator, Order, Schedule, Size,
    StructuredExtraction, StructuredSchedule, TextExtraction, TextSchedule,
};
pub use crate::validation::{Validate, Violations};
pub use crate::workflow::{ExtractionWorkflow, EXTRACTION_PREAMBLE};

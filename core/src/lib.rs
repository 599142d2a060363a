//! # orderly - Core API Documentation
//!
//! orderly turns free-text pizza orders into typed records with a hosted LLM and
//! checks the result field by field.
//!
//! ## Features
//!
//! - **Schema-constrained extraction**: any `JsonSchema + Deserialize` type deriving
//!   [`Extractor`](completion::Extractor) is sent to the model as a forced tool call
//! - **Post-decode validation** with [`Validate`](validation::Validate) rules and
//!   automatic repair re-asks when an answer is rejected
//! - **Transient retries** with exponential backoff
//! - **Assertions** over field paths, reported all at once or fail-early
//! - **Order schema** with explicit sentinels for missing address data
//!
//! ## Example
//!
//! ```rust,ignore
//! use orderly::prelude::*;
//! use orderly_anthropic::AnthropicCompletionModel;
//!
//! #[client(provider = "AnthropicCompletionModel")]
//! struct OrderClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), orderly::error::Error> {
//!     let mut workflow = ExtractionWorkflow::new(OrderClient::build(EXTRACTION_PREAMBLE)?);
//!     let expectations = Expectations::new()
//!         .equals("name", "Jason")
//!         .sum("order.order_list[*].quantity", 5);
//!     let (_order, report) = workflow
//!         .run::<TextExtraction>("Jason has ordered 5 pizzas ...", &expectations)
//!         .await?;
//!     println!("{report}");
//!     report.into_result()?;
//!     Ok(())
//! }
//! ```

extern crate self as orderly;

pub use schemars;
pub use serde;

/// Field-level expectations and the reports they produce
pub mod assertions;

/// Language model completion and schema-constrained extraction
///
/// Contains:
/// - Client for managing LLM interactions
/// - Message history tracking
/// - Response extraction with repair and retries
pub mod completion;

/// Credentials and retry settings
pub mod config;

/// Error types for all library operations
pub mod error;

/// Pizza order schema
pub mod order;

/// Convenience prelude exports
pub mod prelude;

/// Rules checked on freshly decoded values
pub mod validation;

/// Extract-then-check workflow
pub mod workflow;

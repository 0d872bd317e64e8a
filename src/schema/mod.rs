//! Output contract validation.
//!
//! Task definitions declare their expected result as a JSON-Schema-like
//! literal. This module compiles such literals into a closed [`Schema`] tree
//! and validates values against it, reporting each [`Violation`] with the
//! path of the failing field. One generic validator serves every contract.
//!
//! Supported keywords: `type` (`object`, `array`, `string`, `number`,
//! `integer`, `boolean`), `properties`, `required`, `items`, `enum`,
//! `minimum`, `maximum`, `minItems`, `maxItems`, `additionalProperties`.

/// Minimal conforming instance generation
pub mod sample;
mod types;
mod validator;

pub use sample::minimal_instance;
pub use types::{format_violations, Schema, SchemaError, SchemaType, Violation, ViolationKind};
pub use validator::validate;

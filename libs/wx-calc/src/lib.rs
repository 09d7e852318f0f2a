//! wx-calc - conversion formulas for weather telemetry
//!
//! Field definitions describe unit conversions as short formulas over a single
//! variable `x` (`x / 10`, `roundTo((x - 32) * 5 / 9, 1)`). This crate compiles
//! such a formula once and evaluates it many times.
//!
//! # Functions
//!
//! | Function | Signature | Description |
//! |----------|-----------|-------------|
//! | `roundTo` | `roundTo(value, decimals)` | Round to decimals |
//! | `round` | `round(value, decimals)` | Same as `roundTo` |
//! | `clamp` | `clamp(value, min, max)` | Limit to range |
//! | `abs` | `abs(value)` | Absolute value |
//! | `min` | `min(a, b)` | Minimum of two |
//! | `max` | `max(a, b)` | Maximum of two |

pub mod builtin_functions;
pub mod error;
pub mod expression;

pub use error::{CalcError, Result};
pub use expression::{ConversionExpr, INPUT_VARIABLE};

// Validation model: the validator capability, its results, tier/report
// aggregates and the built-in validators.

pub mod command;
pub mod fused;
pub mod registry;
pub mod tier;
pub mod traits;

pub use command::{CommandConfig, CommandValidator};
pub use fused::FusedValidator;
pub use registry::{DimensionKind, RegisteredValidator};
pub use tier::{FileValidationResult, ReportView, TierResult, ValidationReport};
pub use traits::{Tier, ValidationContext, ValidationResult, Validator};

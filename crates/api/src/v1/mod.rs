//! API v1: request DTOs, validation, envelope mapping, list formatting.

pub mod format;
pub mod mappers;
pub mod types;
pub mod validation;

pub use format::*;
pub use mappers::*;
pub use types::*;
pub use validation::*;

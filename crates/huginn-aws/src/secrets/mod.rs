//! AWS Secrets Manager source

mod provider;
mod rotation;

pub use provider::SecretsProvider;
pub use rotation::{excess_entries, RotationReport, StageMove, StageRotator, LIST_PAGE_SIZE};

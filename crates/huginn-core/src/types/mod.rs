//! Type definitions for remote snapshots and change sets

mod changes;
mod parameter;
mod secret;

pub use changes::ChangeSet;
pub use parameter::{relative_key, Parameter, ParameterSet};
pub use secret::{
    is_live_stage, stamp_label, SecretSnapshot, SecretVersionEntry, STAGE_CURRENT,
    STAGE_PREVIOUS,
};

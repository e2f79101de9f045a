//! Configuration loading and provider settings

mod loader;
mod settings;

pub use loader::{HuginnConfig, HuginnConfigFile};
pub use settings::{
    normalize_base_path, AwsSettings, LocalFileSettings, ParameterStoreSettings, SecretsSettings,
    StaticCredentials, DEFAULT_DEBOUNCE_MS, DEFAULT_KEEP_STAGES, DEFAULT_LOCAL_FILE,
    DEFAULT_REGION, DEFAULT_WATCH_INTERVAL_SECS, REGION_ENV,
};

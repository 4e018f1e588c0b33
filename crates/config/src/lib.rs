//! Configuration discovery and schema.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        clear_config_dir, config_dir, data_dir, discover_and_load, load_config, session_path,
        set_config_dir,
    },
    schema::{BackendConfig, MeridianConfig, ProviderConfig, ResolverConfig, StorageConfig},
};

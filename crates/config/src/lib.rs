//! Directory resolution and settings loading.
//!
//! State lives under the data directory (`~/.skills-manager` unless
//! overridden): the registry document `config.json` and the `skills/` tree
//! of acquired sources.
//!
//! Optional settings file: `skm.toml`, `skm.yaml` or `skm.json`, searched in
//! `./` then the user config dir. `${ENV_VAR}` placeholders are substituted
//! in string values.

pub mod dirs;
pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    dirs::{config_dir, data_dir, home_dir, set_config_dir, set_data_dir},
    loader::{discover_and_load, find_or_default_config_path, load_config},
    schema::{CustomTarget, DeployConfig, SkmConfig},
};

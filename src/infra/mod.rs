mod cli;
mod config;
mod file_storage;
mod memory;
mod postgres;

pub use cli::{CartCommand, Cli};
pub use config::{
    ApplicationSettings, CartConfig, DatabaseSettings, Settings, get_config_settings,
};
pub use file_storage::FileLocalStorage;
pub use memory::{InMemoryCatalog, InMemoryLocalStorage, InMemoryRemoteCartStore};
pub use postgres::{PgCatalog, PgRemoteCartStore};

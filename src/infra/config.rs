use std::time::Duration;

use anyhow::Context;
use camino::Utf8PathBuf;
use config::Config;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::domain::cart::{CartSettings, PricingPolicy};

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
    pub environment: String,
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub cart: CartConfig,
}

#[derive(Clone, Deserialize, Debug)]
pub struct ApplicationSettings {
    pub logs_directory: String,
    /// Directory backing the guest cart local storage.
    pub local_storage_directory: Utf8PathBuf,
}

#[derive(Clone, Deserialize, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn without_db_name(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(&self.password)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn with_db_name(&self) -> PgConnectOptions {
        self.without_db_name().database(&self.database_name)
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct CartConfig {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub debounce_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_quantity_per_item: u32,
    pub tax_rate: Decimal,
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    pub guest_cart_key: String,
}

impl From<&CartConfig> for CartSettings {
    fn from(config: &CartConfig) -> Self {
        CartSettings {
            debounce: Duration::from_millis(config.debounce_ms),
            max_quantity_per_item: config.max_quantity_per_item,
            pricing: PricingPolicy {
                tax_rate: config.tax_rate,
                free_shipping_threshold: config.free_shipping_threshold,
                flat_shipping_fee: config.flat_shipping_fee,
            },
            guest_cart_key: config.guest_cart_key.clone(),
        }
    }
}

fn find_config_dir() -> anyhow::Result<Utf8PathBuf> {
    let current_dir =
        std::env::current_dir().context("Failed to determine the current directory.")?;
    let current_dir =
        Utf8PathBuf::try_from(current_dir).context("Could not convert PathBuf to Utf8PathBuf")?;

    let config_dir = current_dir
        .ancestors()
        .map(|p| p.join("config"))
        .find(|p| {
            let base_path = p.join("base.yaml");
            p.is_dir() && base_path.is_file()
        })
        .ok_or_else(|| anyhow::anyhow!("Cannot find config directory!"))?;

    config_dir
        .canonicalize_utf8()
        .with_context(|| format!("Could not canonicalize config directory {config_dir}."))
}

pub fn get_config_settings() -> anyhow::Result<Settings> {
    let config_directory = find_config_dir()?;

    // Detect the running environment - default to `development` if unspecified.
    let environment: String =
        std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".to_owned());

    // Read the base configuration file called "base".
    let base_source =
        config::File::with_name(config_directory.join("base").as_str()).required(true);

    // Read another file for environment-specific values.
    let env_source = config::File::with_name(config_directory.join(environment.as_str()).as_str())
        .required(true);

    // Finally grab any override settings from environment variables
    // (with a prefix of APP and '__' as separator).
    // e.g. `APP_CART__DEBOUNCE_MS=250 would set `Settings.cart.debounce_ms`
    let overrides_source = config::Environment::with_prefix("app").separator("__");

    let config = Config::builder()
        .add_source(base_source)
        .add_source(env_source)
        .add_source(overrides_source)
        .build()?;

    // Try converting the configuration values into our Settings type.
    config
        .try_deserialize()
        .context("Could not deserialise config settings.")
}

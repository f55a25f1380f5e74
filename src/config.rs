use clap::Parser;
use config::{Config, ConfigError};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    ConnectOptions,
};
use std::collections::HashMap;
use std::time::Duration;

pub const DB_PATH_VAR: &str = "MAILING_LIST_DB";
pub const BIND_JSON_VAR: &str = "MAILINGLIST_BIND_JSON";
pub const BIND_GRPC_VAR: &str = "MAILINGLIST_BIND_GRPC";

const DEFAULT_DB_PATH: &str = "list.db";
const DEFAULT_BIND_JSON: &str = "0.0.0.0:8080";
const DEFAULT_BIND_GRPC: &str = "0.0.0.0:8081";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub json_address: String,
    pub grpc_address: String,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub path: String,
}

impl Settings {
    pub fn get_json_address(&self) -> String {
        self.application.get_json_address()
    }

    pub fn get_grpc_address(&self) -> String {
        self.application.get_grpc_address()
    }

    pub fn set_json_address(&mut self, address: String) {
        self.application.json_address = address;
    }

    pub fn set_grpc_address(&mut self, address: String) {
        self.application.grpc_address = address;
    }

    pub fn set_db_path(&mut self, path: String) {
        self.database.path = path;
    }
}

impl ApplicationSettings {
    pub fn get_json_address(&self) -> String {
        listen_address(&self.json_address)
    }

    pub fn get_grpc_address(&self) -> String {
        listen_address(&self.grpc_address)
    }
}

impl DatabaseSettings {
    pub fn get_db_options(&self) -> SqliteConnectOptions {
        let mut db_options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        db_options.log_statements(tracing::log::LevelFilter::Trace);

        db_options
    }

    pub fn get_path(&self) -> String {
        self.path.clone()
    }
}

/// `:8080` style addresses (host omitted) listen on every interface.
fn listen_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    }
}

/// Command-line flags. Each one falls back to its environment variable, then to
/// the built-in default.
#[derive(Parser, Debug)]
#[command(name = "mailing_list")]
#[command(about = "Mailing list subscriber registry over gRPC and JSON", long_about = None)]
#[command(version)]
pub struct CliArgs {
    /// Path of the SQLite database file
    #[arg(long = "dbpath", env = "MAILING_LIST_DB")]
    pub db_path: Option<String>,

    /// Address of the JSON API listener, e.g. 127.0.0.1:8080 or :8080
    #[arg(long = "bindjson", env = "MAILINGLIST_BIND_JSON")]
    pub bind_json: Option<String>,

    /// Address of the gRPC API listener
    #[arg(long = "bindgrpc", env = "MAILINGLIST_BIND_GRPC")]
    pub bind_grpc: Option<String>,
}

/// Parses the process arguments. `--help` and malformed flags exit the process.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    configuration_from_args(CliArgs::parse())
}

pub fn configuration_from_args(args: CliArgs) -> Result<Settings, ConfigError> {
    // clap has already applied the environment fallback, so the parsed values are
    // fed through the same path as plain variables.
    let vars = [
        (DB_PATH_VAR, args.db_path),
        (BIND_JSON_VAR, args.bind_json),
        (BIND_GRPC_VAR, args.bind_grpc),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|value| (key.to_string(), value)));

    configuration_from_vars(vars)
}

/// Builds the settings from a set of environment variables. Variables that are
/// unset or empty fall back to the built-in defaults.
pub fn configuration_from_vars<I>(vars: I) -> Result<Settings, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let vars: HashMap<String, String> = vars
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect();

    let settings = Config::builder()
        .set_default("database.path", DEFAULT_DB_PATH)?
        .set_default("application.json_address", DEFAULT_BIND_JSON)?
        .set_default("application.grpc_address", DEFAULT_BIND_GRPC)?
        .set_override_option("database.path", vars.get(DB_PATH_VAR).cloned())?
        .set_override_option("application.json_address", vars.get(BIND_JSON_VAR).cloned())?
        .set_override_option("application.grpc_address", vars.get(BIND_GRPC_VAR).cloned())?
        .build()?;

    settings.try_deserialize()
}

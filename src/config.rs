use serde::Deserialize;
use std::path::PathBuf;

const ENV_PREFIX: &str = "MOVIEWEB_";

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_templates")]
    pub templates: String,
    #[serde(default = "default_omdb_url")]
    pub omdb_url: String,
    #[serde(default)]
    pub omdb_api_key: String,
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_owned()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/movieweb.db")
}

fn default_templates() -> String {
    "templates/**/*".to_owned()
}

fn default_omdb_url() -> String {
    "https://www.omdbapi.com/".to_owned()
}

impl Config {
    /// Reads `MOVIEWEB_*` variables, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env()
    }
}

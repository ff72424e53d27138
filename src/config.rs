//! Configuration management
//!
//! Values are layered: built-in defaults, then `~/.flight-agent/config.json`
//! (if present), then `.env` and the process environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::providers::{google_flights, sky_scrapper};
use crate::search::{normalize_currency, ProviderId};
use crate::Result;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// LLM backend ("vertex" for Vertex AI, "gemini" for API key)
    #[serde(default = "default_llm_provider")]
    pub llm_provider: String,

    /// Model to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Google Cloud project (Vertex AI)
    #[serde(default)]
    pub google_cloud_project: String,

    /// Google Cloud region (Vertex AI)
    #[serde(default = "default_location")]
    pub google_cloud_location: String,

    /// OAuth access token for Vertex AI, e.g. from `gcloud auth print-access-token`
    #[serde(default)]
    pub vertex_access_token: String,

    /// Gemini API key (used when llm_provider is "gemini")
    #[serde(default)]
    pub gemini_api_key: String,

    /// Maximum tool iterations per user turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// RapidAPI key for Sky Scrapper
    #[serde(default)]
    pub sky_scrapper_api_key: String,

    /// SerpApi key for Google Flights
    #[serde(default)]
    pub serpapi_api_key: String,

    /// Per-provider wait bound, in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    #[serde(default = "default_sky_scrapper_base_url")]
    pub sky_scrapper_base_url: String,

    #[serde(default = "default_serpapi_base_url")]
    pub serpapi_base_url: String,

    /// Currency requested when the user names none
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_llm_provider() -> String {
    "vertex".to_string()
}

fn default_model() -> String {
    "gemini-1.5-pro-latest".to_string()
}

fn default_location() -> String {
    "us-central1".to_string()
}

fn default_max_iterations() -> usize {
    10
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_sky_scrapper_base_url() -> String {
    sky_scrapper::DEFAULT_BASE_URL.to_string()
}

fn default_serpapi_base_url() -> String {
    google_flights::DEFAULT_BASE_URL.to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_provider: default_llm_provider(),
            model: default_model(),
            google_cloud_project: String::new(),
            google_cloud_location: default_location(),
            vertex_access_token: String::new(),
            gemini_api_key: String::new(),
            max_iterations: default_max_iterations(),
            sky_scrapper_api_key: String::new(),
            serpapi_api_key: String::new(),
            provider_timeout_secs: default_provider_timeout_secs(),
            sky_scrapper_base_url: default_sky_scrapper_base_url(),
            serpapi_base_url: default_serpapi_base_url(),
            default_currency: default_currency(),
        }
    }
}

impl Config {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Override fields from environment variables.
    ///
    /// `lookup` returns the value of a variable, if set. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let strings: [(&str, &mut String); 11] = [
            ("FLIGHT_AGENT_LLM_PROVIDER", &mut self.llm_provider),
            ("GEMINI_MODEL_NAME", &mut self.model),
            ("GOOGLE_CLOUD_PROJECT", &mut self.google_cloud_project),
            ("GOOGLE_CLOUD_LOCATION", &mut self.google_cloud_location),
            ("GOOGLE_CLOUD_ACCESS_TOKEN", &mut self.vertex_access_token),
            ("GEMINI_API_KEY", &mut self.gemini_api_key),
            ("FLIGHTS_SCRAPER_SKY_API_KEY", &mut self.sky_scrapper_api_key),
            ("SERPAPI_KEY", &mut self.serpapi_api_key),
            ("SKY_SCRAPPER_BASE_URL", &mut self.sky_scrapper_base_url),
            ("SERPAPI_BASE_URL", &mut self.serpapi_base_url),
            ("FLIGHT_AGENT_CURRENCY", &mut self.default_currency),
        ];
        for (key, field) in strings {
            if let Some(value) = get(key) {
                *field = value;
            }
        }

        if let Some(value) = get("FLIGHT_PROVIDER_TIMEOUT_SECS") {
            self.provider_timeout_secs = value.parse().map_err(|_| {
                Error::Config(format!("FLIGHT_PROVIDER_TIMEOUT_SECS must be a number, got '{}'", value))
            })?;
        }
        if let Some(value) = get("FLIGHT_AGENT_MAX_ITERATIONS") {
            self.max_iterations = value.parse().map_err(|_| {
                Error::Config(format!("FLIGHT_AGENT_MAX_ITERATIONS must be a number, got '{}'", value))
            })?;
        }

        Ok(())
    }

    /// Check everything the flight providers need.
    pub fn validate_providers(&self) -> Result<()> {
        self.validate_sources(&ProviderId::ALL)
    }

    /// Check what searching `sources` needs: their keys and base URLs, the
    /// provider timeout and the default currency.
    pub fn validate_sources(&self, sources: &[ProviderId]) -> Result<()> {
        let mut missing = Vec::new();
        let mut urls = Vec::new();
        for source in sources {
            match source {
                ProviderId::SkyScrapper => {
                    if self.sky_scrapper_api_key.is_empty() {
                        missing.push("FLIGHTS_SCRAPER_SKY_API_KEY");
                    }
                    urls.push(("sky_scrapper_base_url", &self.sky_scrapper_base_url));
                }
                ProviderId::GoogleFlights => {
                    if self.serpapi_api_key.is_empty() {
                        missing.push("SERPAPI_KEY");
                    }
                    urls.push(("serpapi_base_url", &self.serpapi_base_url));
                }
            }
        }
        if !missing.is_empty() {
            return Err(missing_error(&missing));
        }

        for (name, value) in urls {
            url::Url::parse(value)
                .map_err(|e| Error::Config(format!("{} '{}' is not a valid URL: {}", name, value, e)))?;
        }

        if self.provider_timeout_secs == 0 {
            return Err(Error::Config("provider_timeout_secs must be greater than zero".to_string()));
        }

        normalize_currency(&self.default_currency).map_err(|_| {
            Error::Config(format!(
                "FLIGHT_AGENT_CURRENCY must be a 3-letter ISO code such as USD, got '{}'",
                self.default_currency
            ))
        })?;

        Ok(())
    }

    /// Check everything the selected LLM backend needs.
    pub fn validate_llm(&self) -> Result<()> {
        let mut missing = Vec::new();
        match self.llm_provider.as_str() {
            "vertex" => {
                if self.google_cloud_project.is_empty() {
                    missing.push("GOOGLE_CLOUD_PROJECT");
                }
                if self.google_cloud_location.is_empty() {
                    missing.push("GOOGLE_CLOUD_LOCATION");
                }
                if self.vertex_access_token.is_empty() {
                    missing.push("GOOGLE_CLOUD_ACCESS_TOKEN");
                }
            }
            "gemini" => {
                if self.gemini_api_key.is_empty() {
                    missing.push("GEMINI_API_KEY");
                }
            }
            other => {
                return Err(Error::Config(format!(
                    "Unknown LLM provider '{}' (expected 'vertex' or 'gemini')",
                    other
                )))
            }
        }
        if self.model.is_empty() {
            missing.push("GEMINI_MODEL_NAME");
        }
        if self.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be greater than zero".to_string()));
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing_error(&missing))
        }
    }

    /// Full startup validation for the conversational agent.
    pub fn validate(&self) -> Result<()> {
        self.validate_providers()?;
        self.validate_llm()
    }

    /// Fully populated configuration for tests.
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            gemini_api_key: "test-gemini".to_string(),
            llm_provider: "gemini".to_string(),
            sky_scrapper_api_key: "test-sky".to_string(),
            serpapi_api_key: "test-serp".to_string(),
            ..Self::default()
        }
    }
}

fn missing_error(missing: &[&str]) -> Error {
    Error::Config(format!(
        "Missing required configuration: {}. Set them in the environment, a .env file, or run 'flight-agent onboard'.",
        missing.join(", ")
    ))
}

/// Get the config directory path
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".flight-agent")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load configuration: defaults, config file, `.env`, then environment.
///
/// Does not validate; callers pick the check matching what they run.
pub fn load() -> Result<Config> {
    dotenvy::dotenv().ok();
    let mut config = load_file(&config_path())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

/// Read a config file, falling back to defaults when it does not exist.
pub fn load_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {:?}: {}", path, e)))
}

/// Save configuration to file
pub fn save(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Interactively collect credentials and write the config file
pub fn onboard() -> Result<()> {
    use crate::ui;
    use inquire::{Password, Select, Text};

    ui::print_header("Setup Wizard", "config");
    println!("  I'll collect the keys needed to search and compare flights.\n");

    let path = config_path();
    let mut config = load_file(&path)?;
    let prompt_err = |e: inquire::InquireError| Error::Config(format!("Prompt failed: {}", e));

    // 1. LLM backend
    let backends = vec!["Vertex AI (project + access token)", "Gemini API (API key)"];
    let choice = Select::new("Choose how to reach Gemini:", backends)
        .prompt()
        .map_err(prompt_err)?;

    if choice.starts_with("Vertex") {
        config.llm_provider = "vertex".to_string();
        config.google_cloud_project = Text::new("Google Cloud project id:")
            .with_default(&config.google_cloud_project)
            .prompt()
            .map_err(prompt_err)?;
        config.google_cloud_location = Text::new("Google Cloud region:")
            .with_default(&config.google_cloud_location)
            .prompt()
            .map_err(prompt_err)?;
        ui::print_step("The access token is read from GOOGLE_CLOUD_ACCESS_TOKEN at runtime.");
    } else {
        config.llm_provider = "gemini".to_string();
        config.gemini_api_key = Password::new("Gemini API key:")
            .without_confirmation()
            .prompt()
            .map_err(prompt_err)?;
    }

    config.model = Text::new("Model name:")
        .with_default(&config.model)
        .prompt()
        .map_err(prompt_err)?;

    // 2. Flight providers
    config.sky_scrapper_api_key = Password::new("Sky Scrapper (RapidAPI) key:")
        .without_confirmation()
        .prompt()
        .map_err(prompt_err)?;
    config.serpapi_api_key = Password::new("SerpApi key:")
        .without_confirmation()
        .prompt()
        .map_err(prompt_err)?;

    config.validate_providers()?;

    // 3. Save
    ui::print_thinking("Saving configuration");
    save(&config, &path)?;
    ui::print_success(&format!("Saved to {:?}", path));
    ui::print_step("Try: flight-agent agent -m \"Flights from JFK to LHR on 2025-06-10\"");

    Ok(())
}

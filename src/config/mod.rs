#[cfg(feature = "cli")]
pub mod cli;

use crate::domain::model::{NotificationTarget, PushSubscription};
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::{self, Validate};
use chrono::NaiveTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub oracle: OracleSettings,
    pub image: ImageSettings,
    pub email: EmailSettings,
    pub push: PushSettings,
    pub sweep: SweepSettings,
    pub subscribers: SubscriberSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub database_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: "./expiry.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            max_tokens: 10,
            temperature: 0.5,
            timeout_seconds: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSettings {
    pub enabled: bool,
    pub webdriver_url: String,
    pub search_url: String,
    pub cdn_domain: String,
    pub page_timeout_seconds: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            webdriver_url: "http://localhost:4444".to_string(),
            search_url: "https://www.google.com/search?tbm=isch".to_string(),
            cdn_domain: "encrypted-tbn0.gstatic.com".to_string(),
            page_timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub user: String,
    pub password: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            user: String::new(),
            password: String::new(),
        }
    }
}

impl EmailSettings {
    pub fn is_configured(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSettings {
    pub public_key: String,
    pub private_key: String,
}

impl PushSettings {
    pub fn is_configured(&self) -> bool {
        !self.public_key.is_empty() && !self.private_key.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    pub enabled: bool,
    /// Local time of day, `HH:MM`.
    pub time: String,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            time: "08:00".to_string(),
        }
    }
}

impl SweepSettings {
    pub fn time_of_day(&self) -> Result<NaiveTime> {
        validation::parse_time_of_day("sweep.time", &self.time)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberSettings {
    pub emails: Vec<String>,
    pub push: Vec<PushSubscription>,
}

impl SubscriberSettings {
    /// Emails first, then push subscriptions, each in configured order.
    pub fn targets(&self) -> Vec<NotificationTarget> {
        self.emails
            .iter()
            .cloned()
            .map(NotificationTarget::Email)
            .chain(self.push.iter().cloned().map(NotificationTarget::Push))
            .collect()
    }
}

impl AppConfig {
    /// Loads the optional TOML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TrackerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;

        toml::from_str(&processed).map_err(|e| TrackerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unknown variables stay as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TrackerError::InternalError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Applies the enumerated environment keys. `lookup` is injectable so
    /// tests do not have to mutate the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ORACLE_API_KEY") {
            self.oracle.api_key = key;
        }
        if let Some(user) = lookup("EMAIL_USER") {
            self.email.user = user;
        }
        if let Some(pass) = lookup("EMAIL_PASS") {
            self.email.password = pass;
        }
        if let Some(key) = lookup("PUSH_PUBLIC_KEY") {
            self.push.public_key = key;
        }
        if let Some(key) = lookup("PUSH_PRIVATE_KEY") {
            self.push.private_key = key;
        }
        if let Some(port) = lookup("LISTEN_PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.storage.database_path = path;
        }
        if let Some(url) = lookup("WEBDRIVER_URL") {
            self.image.webdriver_url = url;
        }
        if let Some(time) = lookup("SWEEP_TIME") {
            self.sweep.time = time;
        }
        if let Some(list) = lookup("SUBSCRIBER_EMAILS") {
            self.subscribers.emails = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_range("server.port", self.server.port, 1, u16::MAX)?;
        validation::validate_path("storage.database_path", &self.storage.database_path)?;

        validation::validate_url("oracle.base_url", &self.oracle.base_url)?;
        validation::validate_non_empty_string("oracle.model", &self.oracle.model)?;
        validation::validate_range("oracle.max_tokens", self.oracle.max_tokens, 1, 256)?;
        if self.oracle.api_key.trim().is_empty() {
            return Err(TrackerError::MissingConfigError {
                field: "ORACLE_API_KEY".to_string(),
            });
        }

        if self.image.enabled {
            validation::validate_url("image.webdriver_url", &self.image.webdriver_url)?;
            validation::validate_url("image.search_url", &self.image.search_url)?;
            validation::validate_non_empty_string("image.cdn_domain", &self.image.cdn_domain)?;
        }

        self.sweep.time_of_day()?;

        for address in &self.subscribers.emails {
            validation::validate_email("subscribers.emails", address)?;
        }
        for sub in &self.subscribers.push {
            validation::validate_url("subscribers.push.endpoint", &sub.endpoint)?;
            validation::validate_non_empty_string("subscribers.push.keys.p256dh", &sub.keys.p256dh)?;
            validation::validate_non_empty_string("subscribers.push.keys.auth", &sub.keys.auth)?;
        }

        if !self.subscribers.emails.is_empty() && !self.email.is_configured() {
            return Err(TrackerError::MissingConfigError {
                field: "EMAIL_USER/EMAIL_PASS".to_string(),
            });
        }
        if !self.subscribers.push.is_empty() && !self.push.is_configured() {
            return Err(TrackerError::MissingConfigError {
                field: "PUSH_PUBLIC_KEY/PUSH_PRIVATE_KEY".to_string(),
            });
        }

        Ok(())
    }
}

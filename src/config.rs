//! Run configuration read once from the environment.
//!
//! A `Config` is built at startup and passed by reference to everything that
//! talks to the base. Which settings are required depends on the subcommand,
//! so the table and webhook identifiers are kept optional here and checked
//! with the `require_*` accessors before the first network call.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 200;

/// Which regional deployment of the open platform to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Feishu,
    Larksuite,
}

impl Domain {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "feishu" => Some(Domain::Feishu),
            "larksuite" | "lark" => Some(Domain::Larksuite),
            _ => None,
        }
    }

    pub fn api_origin(self) -> &'static str {
        match self {
            Domain::Feishu => "https://open.feishu.cn",
            Domain::Larksuite => "https://open.larksuite.com",
        }
    }

    pub fn web_origin(self) -> &'static str {
        match self {
            Domain::Feishu => "https://www.feishu.cn",
            Domain::Larksuite => "https://www.larksuite.com",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
    pub domain: Domain,
    pub api_base: String,
    pub app_token: Option<String>,
    pub task_table: Option<String>,
    pub customer_table: Option<String>,
    pub category_table: Option<String>,
    pub webhook_url: Option<String>,
    pub request_interval: Duration,
}

impl Config {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let domain = match get("LARK_DOMAIN") {
            None => Domain::Feishu,
            Some(raw) => Domain::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                name: "LARK_DOMAIN",
                value: raw.clone(),
                reason: "expected 'feishu' or 'larksuite'".to_string(),
            })?,
        };

        let api_base = get("LARK_API_BASE")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| domain.api_origin().to_string());

        let request_interval = match get("LARK_REQUEST_INTERVAL_MS") {
            None => Duration::from_millis(DEFAULT_REQUEST_INTERVAL_MS),
            Some(raw) => {
                let ms = raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    name: "LARK_REQUEST_INTERVAL_MS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
                Duration::from_millis(ms)
            }
        };

        Ok(Config {
            app_id: get("LARK_APP_ID"),
            app_secret: get("LARK_APP_SECRET"),
            domain,
            api_base,
            app_token: get("LARK_BASE_APP_TOKEN"),
            task_table: get("TASK_TABLE_ID"),
            customer_table: get("CUSTOMER_TABLE_ID"),
            category_table: get("CATEGORY_TABLE_ID"),
            webhook_url: get("LARK_WEBHOOK_URL"),
            request_interval,
        })
    }

    /// Check the settings every remote command needs.
    pub fn require_base(&self) -> Result<(), ConfigError> {
        required(&self.app_id, "LARK_APP_ID")?;
        required(&self.app_secret, "LARK_APP_SECRET")?;
        required(&self.app_token, "LARK_BASE_APP_TOKEN")?;
        Ok(())
    }

    pub fn require_task_table(&self) -> Result<&str, ConfigError> {
        required(&self.task_table, "TASK_TABLE_ID")
    }

    pub fn require_customer_table(&self) -> Result<&str, ConfigError> {
        required(&self.customer_table, "CUSTOMER_TABLE_ID")
    }

    pub fn require_category_table(&self) -> Result<&str, ConfigError> {
        required(&self.category_table, "CATEGORY_TABLE_ID")
    }

    /// Link to the base in the web UI, appended to notification messages.
    pub fn base_url(&self) -> String {
        format!(
            "{}/base/{}",
            self.domain.web_origin(),
            self.app_token.as_deref().unwrap_or_default()
        )
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or(ConfigError::Missing(name))
}

#[cfg(test)]
pub(crate) fn test_config(api_base: &str) -> Config {
    Config {
        app_id: Some("cli_test".to_string()),
        app_secret: Some("secret".to_string()),
        domain: Domain::Feishu,
        api_base: api_base.to_string(),
        app_token: Some("bascnTest".to_string()),
        task_table: Some("tblTasks".to_string()),
        customer_table: Some("tblCustomers".to_string()),
        category_table: Some("tblCategories".to_string()),
        webhook_url: None,
        request_interval: Duration::ZERO,
    }
}

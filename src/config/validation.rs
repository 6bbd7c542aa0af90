use crate::config::types::{
    AccountEntry, Config, CrawlerConfig, JobsConfig, LoginConfig, ServerConfig, StorageConfig,
    ThrottleConfig,
};
use crate::throttle::Route;
use crate::ConfigError;
use argon2::password_hash::PasswordHash;
use std::collections::HashSet;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_server_config(&config.server)?;
    validate_crawler_config(&config.crawler)?;
    validate_throttle_config(&config.throttle)?;
    validate_login_config(&config.login)?;
    validate_jobs_config(&config.jobs)?;
    validate_storage_config(&config.storage)?;
    validate_accounts(&config.accounts)?;
    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind_address.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!(
            "bind_address must be a socket address, got '{}': {}",
            config.bind_address, e
        ))
    })?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 120, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the rate limit table and the optional shared backend
fn validate_throttle_config(config: &ThrottleConfig) -> Result<(), ConfigError> {
    if let Some(redis_url) = &config.redis_url {
        let url = Url::parse(redis_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid redis_url: {}", e)))?;
        if url.scheme() != "redis" && url.scheme() != "rediss" {
            return Err(ConfigError::InvalidUrl(format!(
                "redis_url must use the redis:// or rediss:// scheme, got '{}'",
                url.scheme()
            )));
        }
    }

    if config.redis_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "redis_prefix cannot be empty".to_string(),
        ));
    }

    validate_limit("default", config.default.limit, config.default.window_seconds)?;

    let mut seen = HashSet::new();
    for entry in &config.routes {
        let route = Route::from_config_name(&entry.route)
            .ok_or_else(|| ConfigError::InvalidRoute(entry.route.clone()))?;

        if !seen.insert(route) {
            return Err(ConfigError::Validation(format!(
                "Duplicate rate limit entry for route '{}'",
                entry.route
            )));
        }

        validate_limit(&entry.route, entry.limit, entry.window_seconds)?;
    }

    Ok(())
}

fn validate_limit(name: &str, limit: u32, window_seconds: u64) -> Result<(), ConfigError> {
    if limit < 1 {
        return Err(ConfigError::Validation(format!(
            "Rate limit for '{}' must be >= 1, got {}",
            name, limit
        )));
    }

    if window_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "Rate window for '{}' must be >= 1 second, got {}",
            name, window_seconds
        )));
    }

    Ok(())
}

fn validate_login_config(config: &LoginConfig) -> Result<(), ConfigError> {
    if config.max_failures < 1 {
        return Err(ConfigError::Validation(format!(
            "max_failures must be >= 1, got {}",
            config.max_failures
        )));
    }

    if config.lock_window_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "lock_window_seconds must be >= 1, got {}",
            config.lock_window_seconds
        )));
    }

    Ok(())
}

fn validate_jobs_config(config: &JobsConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 64 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 64, got {}",
            config.max_workers
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue_capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates provisioned accounts
fn validate_accounts(accounts: &[AccountEntry]) -> Result<(), ConfigError> {
    let mut emails = HashSet::new();
    let mut tokens = HashSet::new();

    for account in accounts {
        validate_email(&account.email)?;

        if !emails.insert(account.email.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate account email '{}'",
                account.email
            )));
        }

        if let Err(e) = PasswordHash::new(&account.password_hash) {
            return Err(ConfigError::Validation(format!(
                "password-hash for '{}' is not a PHC string: {}",
                account.email, e
            )));
        }

        if account.token.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "token for '{}' cannot be empty",
                account.email
            )));
        }

        if !tokens.insert(account.token.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Token for '{}' is already assigned to another account",
                account.email
            )));
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "account email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email '{}': must contain '@'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: {}",
            email
        )));
    }

    Ok(())
}

use crate::config::types::{Config, CrawlerConfig, OutputConfig, ScopeConfig, UserAgentConfig};
use crate::url::TrapRules;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_scope_config(&config.scope)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_filter_rules(&config.filter)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.politeness_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "politeness_delay_ms must be >= 100ms, got {}ms",
            config.politeness_delay_ms
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.max_body_bytes == 0 {
        return Err(ConfigError::Validation(
            "max_body_bytes must be greater than zero".to_string(),
        ));
    }

    if let Some(cache_server) = &config.cache_server {
        Url::parse(cache_server)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid cache_server: {}", e)))?;
    }

    Ok(())
}

/// Validates the crawl scope: root domains, institution domain and seeds
fn validate_scope_config(config: &ScopeConfig) -> Result<(), ConfigError> {
    if config.root_domains.is_empty() {
        return Err(ConfigError::Validation(
            "root_domains must list at least one domain".to_string(),
        ));
    }

    for domain in &config.root_domains {
        validate_domain_string(domain)?;
    }

    validate_domain_string(&config.institution_domain)?;

    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "At least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP or HTTPS",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
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

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.reports_dir.is_empty() {
        return Err(ConfigError::Validation(
            "reports_dir cannot be empty".to_string(),
        ));
    }

    if config.flush_every == 0 {
        return Err(ConfigError::Validation(
            "flush_every must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates the trap rule limits
fn validate_filter_rules(rules: &TrapRules) -> Result<(), ConfigError> {
    if rules.max_url_length == 0 || rules.max_query_length == 0 {
        return Err(ConfigError::Validation(
            "max_url_length and max_query_length must be greater than zero".to_string(),
        ));
    }

    if rules.max_segment_repeats == 0 || rules.max_path_segments == 0 {
        return Err(ConfigError::Validation(
            "max_segment_repeats and max_path_segments must be greater than zero".to_string(),
        ));
    }

    if rules.repeated_block_limit < 2 {
        return Err(ConfigError::Validation(format!(
            "repeated_block_limit must be >= 2, got {}",
            rules.repeated_block_limit
        )));
    }

    Ok(())
}

/// Validates a bare domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'uci.edu')",
            domain
        )));
    }

    if domain.chars().any(|c| c.is_uppercase()) {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must be lowercase",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, RenderConfig, RetryConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_render_config(&config.render)?;
    validate_retry_config(&config.retry)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates traversal configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = Url::parse(&config.seed_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", config.seed_url, e))
    })?;

    if seed.scheme() != "http" && seed.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use an HTTP(S) scheme",
            config.seed_url
        )));
    }

    if config.categories.is_empty() {
        return Err(ConfigError::Validation(
            "categories must list at least one category label".to_string(),
        ));
    }

    if config.categories.iter().any(|label| label.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "categories cannot contain blank labels".to_string(),
        ));
    }

    if config.max_concurrent_renders < 1 || config.max_concurrent_renders > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_renders must be between 1 and 64, got {}",
            config.max_concurrent_renders
        )));
    }

    for pattern in &config.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    Ok(())
}

/// Validates renderer timings
fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if config.selector_poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "selector_poll_interval_ms must be > 0".to_string(),
        ));
    }

    if config.selector_wait_timeout_ms < config.selector_poll_interval_ms {
        return Err(ConfigError::Validation(format!(
            "selector_wait_timeout_ms ({}ms) must be >= selector_poll_interval_ms ({}ms)",
            config.selector_wait_timeout_ms, config.selector_poll_interval_ms
        )));
    }

    if config.scroll_convergence_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "scroll_convergence_interval_ms must be > 0".to_string(),
        ));
    }

    if config.scroll_convergence_max_rounds < 1 {
        return Err(ConfigError::Validation(
            "scroll_convergence_max_rounds must be >= 1".to_string(),
        ));
    }

    if config.fetch_timeout_ms < config.selector_wait_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_ms ({}ms) must be >= selector_wait_timeout_ms ({}ms)",
            config.fetch_timeout_ms, config.selector_wait_timeout_ms
        )));
    }

    Ok(())
}

/// Validates retry policy settings
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    for status in &config.retryable_status_codes {
        if !(100..=599).contains(status) {
            return Err(ConfigError::Validation(format!(
                "retryable_status_codes contains invalid HTTP status {}",
                status
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
    if config.records_path.is_empty() {
        return Err(ConfigError::Validation(
            "records_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a host string (without wildcard prefix)
///
/// Single-label hosts such as `localhost` are accepted so local fixtures can be crawled.
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

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

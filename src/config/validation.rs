use crate::auth::LoginMode;
use crate::config::types::{
    Config, CrawlerConfig, LoginConfig, OutputConfig, PlatformConfig, ReplyConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_keywords(&config.keywords)?;
    validate_crawler_config(&config.crawler)?;
    validate_login_config(&config.login, config.redis.is_some())?;
    validate_platform_config(&config.platform)?;
    validate_output_config(&config.output)?;
    if let Some(reply) = &config.reply {
        validate_reply_config(reply)?;
    }
    if let Some(redis) = &config.redis {
        Url::parse(&redis.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid redis url: {}", e)))?;
    }
    Ok(())
}

fn validate_keywords(keywords: &[String]) -> Result<(), ConfigError> {
    if keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "keywords cannot contain empty entries".to_string(),
        ));
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_notes < 1 {
        return Err(ConfigError::Validation(format!(
            "max_notes must be >= 1, got {}",
            config.max_notes
        )));
    }

    if config.page_size < 1 || config.page_size > 50 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 50, got {}",
            config.page_size
        )));
    }

    if config.sub_comment_page_size < 1 || config.sub_comment_page_size > 50 {
        return Err(ConfigError::Validation(format!(
            "sub_comment_page_size must be between 1 and 50, got {}",
            config.sub_comment_page_size
        )));
    }

    if config.max_concurrent_tasks < 1 || config.max_concurrent_tasks > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_tasks must be between 1 and 32, got {}",
            config.max_concurrent_tasks
        )));
    }

    Ok(())
}

/// Validates that the selected login mode has what it needs
fn validate_login_config(config: &LoginConfig, has_redis: bool) -> Result<(), ConfigError> {
    if config.qr_poll_attempts < 1 {
        return Err(ConfigError::Validation(
            "qr_poll_attempts must be >= 1".to_string(),
        ));
    }

    match config.mode {
        LoginMode::QrCode => {}
        LoginMode::Phone => {
            let phone = config.phone.as_deref().unwrap_or("");
            if phone.is_empty() || !phone.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::Validation(format!(
                    "phone login requires a numeric phone number, got '{}'",
                    phone
                )));
            }
            if !has_redis {
                return Err(ConfigError::Validation(
                    "phone login requires a [redis] section for the SMS code channel".to_string(),
                ));
            }
            if config.sms_code_timeout_secs < 1 {
                return Err(ConfigError::Validation(
                    "sms_code_timeout_secs must be >= 1".to_string(),
                ));
            }
        }
        LoginMode::Cookie => {
            if config.web_session.as_deref().unwrap_or("").is_empty() {
                return Err(ConfigError::Validation(
                    "cookie login requires a web_session value".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_platform_config(config: &PlatformConfig) -> Result<(), ConfigError> {
    Url::parse(&config.index_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid index_url: {}", e)))?;
    Url::parse(&config.api_host)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api_host: {}", e)))?;

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.qr_image_path.is_empty() {
        return Err(ConfigError::Validation(
            "qr_image_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_reply_config(config: &ReplyConfig) -> Result<(), ConfigError> {
    if config.content.trim().is_empty() {
        return Err(ConfigError::Validation(
            "reply content cannot be empty".to_string(),
        ));
    }
    Ok(())
}

use url::Url;

use crate::config::CrawlConfig;
use crate::{ConfigError, ConfigResult};

/// Validates a crawl configuration
///
/// Checks, in order:
/// 1. At least one seed is present
/// 2. Every seed parses as an absolute http(s) URL
/// 3. `concurrency` is at least 1
/// 4. `max-content-length` is non-zero
/// 5. `mediatype` looks like a `type/subtype` pair
///
/// # Arguments
///
/// * `config` - The configuration to validate
///
/// # Returns
///
/// * `Ok(())` - Configuration is usable
/// * `Err(ConfigError)` - First problem found
pub fn validate(config: &CrawlConfig) -> ConfigResult<()> {
    if config.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in &config.seeds {
        let url = Url::parse(seed).map_err(|_| ConfigError::InvalidSeed(seed.clone()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidSeed(seed.clone()));
        }
    }

    if config.concurrency == 0 {
        return Err(ConfigError::Validation(
            "concurrency must be at least 1".to_string(),
        ));
    }

    if config.max_content_length == 0 {
        return Err(ConfigError::Validation(
            "max-content-length must be non-zero".to_string(),
        ));
    }

    if !config.mediatype.contains('/') {
        return Err(ConfigError::Validation(format!(
            "mediatype '{}' is not a type/subtype pair",
            config.mediatype
        )));
    }

    Ok(())
}

use std::fs;
use std::path::Path;

use crate::config::CrawlConfig;
use crate::ConfigResult;

/// Loads a crawl configuration from a TOML file
///
/// The file only needs to name the options it changes; everything else
/// keeps its default. The loaded configuration is NOT validated here, since
/// callers typically merge command-line overrides on top first; run
/// [`validate`](crate::config::validate) on the final result.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(CrawlConfig)` - Successfully parsed configuration
/// * `Err(ConfigError)` - File could not be read or parsed
pub fn load_config(path: &Path) -> ConfigResult<CrawlConfig> {
    let raw = fs::read_to_string(path)?;
    let config = toml::from_str(&raw)?;
    Ok(config)
}

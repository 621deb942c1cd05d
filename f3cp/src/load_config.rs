/// `load_config` module: reads the optional YAML settings file for the CLI.
///
/// Every key is optional and an absent file means defaults throughout, so
/// `f3cp` works against a bare store URL with no configuration at all.
///
/// # Accepted schema
///
/// ```yaml
/// prefixes:              # replaces the built-in prefix table
///   - uri: "http://purl.org/dc/terms/"
///     prefix: "dc:"
/// search:
///   page_size: 100       # maxResults per findObjects request
/// http:
///   timeout_secs: 60     # per-request timeout
/// ```
///
/// Credentials are never read from this file. They come from the store URL
/// or from `FEDORA_USER` / `FEDORA_PASSWORD` (a `.env` file is honoured).
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use f3cp_core::prefix::{PrefixEntry, PrefixTable};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

use crate::fedora::ClientOptions;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub prefixes: Option<Vec<PrefixEntry>>,
    pub search: SearchSection,
    pub http: HttpSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub page_size: u32,
}

impl Default for SearchSection {
    fn default() -> Self {
        SearchSection { page_size: 100 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        HttpSection { timeout_secs: 60 }
    }
}

impl CliConfig {
    /// The configured prefix table, or the built-in one.
    pub fn prefix_table(&self) -> PrefixTable {
        match &self.prefixes {
            Some(entries) => PrefixTable::new(entries.iter().cloned()),
            None => PrefixTable::default(),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.http.timeout_secs),
            page_size: self.search.page_size,
        }
    }
}

/// Loads the YAML settings at `path`, or defaults when no path is given.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<CliConfig> {
    let Some(path) = path else {
        info!("No config file given, using defaults");
        return Ok(CliConfig::default());
    };
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if config.search.page_size == 0 {
        return Err(anyhow::anyhow!("search.page_size must be at least 1"));
    }
    if config.http.timeout_secs == 0 {
        return Err(anyhow::anyhow!("http.timeout_secs must be at least 1"));
    }

    info!(
        config_path = ?path_ref,
        custom_prefixes = config.prefixes.is_some(),
        page_size = config.search.page_size,
        "Parsed config YAML successfully"
    );
    Ok(config)
}

use crate::config::types::{
    ChunkingConfig, Config, CrawlerConfig, EmbeddingConfig, EmbeddingProviderKind,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_chunking_config(&config.chunking)?;
    validate_embedding_config(&config.embedding)?;
    validate_paths(config)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_budget < 1 {
        return Err(ConfigError::Validation(
            "page_budget must be >= 1".to_string(),
        ));
    }

    if config.page_concurrency < 1 || config.page_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "page_concurrency must be between 1 and 100, got {}",
            config.page_concurrency
        )));
    }

    if config.site_concurrency < 1 || config.site_concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "site_concurrency must be between 1 and 100, got {}",
            config.site_concurrency
        )));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.fetch_retries > 5 {
        return Err(ConfigError::Validation(format!(
            "fetch_retries must be <= 5, got {}",
            config.fetch_retries
        )));
    }

    if config.discover_depth < 1 || config.discover_depth > 2 {
        return Err(ConfigError::Validation(format!(
            "discover_depth must be 1 or 2, got {}",
            config.discover_depth
        )));
    }

    Ok(())
}

fn validate_chunking_config(config: &ChunkingConfig) -> Result<(), ConfigError> {
    if config.chunk_size < 100 {
        return Err(ConfigError::Validation(format!(
            "chunk_size must be >= 100, got {}",
            config.chunk_size
        )));
    }

    if config.chunk_overlap >= config.chunk_size {
        return Err(ConfigError::Validation(format!(
            "chunk_overlap ({}) must be smaller than chunk_size ({})",
            config.chunk_overlap, config.chunk_size
        )));
    }

    Ok(())
}

fn validate_embedding_config(config: &EmbeddingConfig) -> Result<(), ConfigError> {
    if config.dims < 8 {
        return Err(ConfigError::Validation(format!(
            "embedding dims must be >= 8, got {}",
            config.dims
        )));
    }

    if config.provider == EmbeddingProviderKind::Http {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            ConfigError::Validation(
                "embedding endpoint is required for the http provider".to_string(),
            )
        })?;

        Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid embedding endpoint: {}", e)))?;
    }

    Ok(())
}

fn validate_paths(config: &Config) -> Result<(), ConfigError> {
    if config.input.targets_path.is_empty() {
        return Err(ConfigError::Validation(
            "targets_path cannot be empty".to_string(),
        ));
    }

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if let Some(contact_url) = &config.user_agent.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

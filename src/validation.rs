//! Input validation and sanitization

use std::path::Path;

use crate::error::{Result, SpamError};

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a message before classification.
    ///
    /// Empty or whitespace-only messages are rejected; so are messages
    /// longer than `max_length` characters.
    pub fn validate_message(message: &str, max_length: usize) -> Result<()> {
        if message.trim().is_empty() {
            return Err(SpamError::Validation("Message cannot be empty".to_string()));
        }

        let length = message.chars().count();
        if length > max_length {
            return Err(SpamError::Validation(format!(
                "Message too long: {length} characters (max {max_length})"
            )));
        }

        Ok(())
    }

    /// Validate a page size for history retrieval
    pub fn validate_limit(limit: usize) -> Result<()> {
        if limit == 0 {
            return Err(SpamError::Validation(
                "Limit must be greater than 0".to_string(),
            ));
        }
        if limit > 100_000 {
            return Err(SpamError::Validation(
                "Limit too large (max 100,000)".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate a day-window argument for statistics and trend queries
    pub fn validate_days(days: u32) -> Result<()> {
        if days == 0 {
            return Err(SpamError::Validation(
                "Days must be greater than 0".to_string(),
            ));
        }
        if days > 3650 {
            return Err(SpamError::Validation(
                "Days too large (max 3650)".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate a model version tag
    pub fn validate_model_version(version: &str) -> Result<()> {
        if version.trim().is_empty() {
            return Err(SpamError::Validation(
                "Model version cannot be empty".to_string(),
            ));
        }

        if version.len() > 50 {
            return Err(SpamError::Validation(
                "Model version too long (max 50 characters)".to_string(),
            ));
        }

        // Check for valid characters (alphanumeric, dots, dashes, underscores)
        if !version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        {
            return Err(SpamError::Validation(
                "Model version contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate an export output path
    pub fn validate_output_path(path: &Path) -> Result<()> {
        let path_str = path.to_string_lossy();
        if path_str.is_empty() {
            return Err(SpamError::Validation(
                "Output path cannot be empty".to_string(),
            ));
        }

        // Check for path traversal attempts
        if path_str.contains("..") || path_str.contains('~') {
            return Err(SpamError::Validation(
                "Output path contains potentially dangerous characters".to_string(),
            ));
        }

        if path_str.len() > 4096 {
            return Err(SpamError::Validation(
                "Output path too long (max 4096 characters)".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate database URL
    pub fn validate_database_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(SpamError::Validation(
                "Database URL cannot be empty".to_string(),
            ));
        }

        if !url.starts_with("sqlite:") {
            return Err(SpamError::Validation(
                "Only SQLite databases are supported".to_string(),
            ));
        }

        if url.len() > 1000 {
            return Err(SpamError::Validation("Database URL too long".to_string()));
        }

        Ok(())
    }

    /// Strip control characters that have no business in a stored message
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}

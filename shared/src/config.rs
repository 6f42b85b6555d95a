use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DEFAULT_MAX_STACK_DEPTH, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Items requested per page query.
    pub page_size: u32,
    /// Deepest a tab's navigation history may grow before the oldest frame
    /// is dropped.
    pub max_stack_depth: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("page_size must be between 1 and {max}, got {value}")]
    PageSize { value: u32, max: u32 },
    #[error("max_stack_depth must be > 0")]
    StackDepth,
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::PageSize {
                value: self.page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        if self.max_stack_depth == 0 {
            return Err(ConfigError::StackDepth);
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("way count must be a nonzero power of two, got {0}")]
    BadWayCount(usize),
    #[error("outstanding-request capacity must be nonzero")]
    ZeroCamWays,
    #[error("response buffer depth must be nonzero")]
    ZeroBufferDepth,
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Construction-time parameters; nothing here is runtime-mutable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// cache associativity, power of two
    pub ways: usize,
    /// outstanding-miss capacity
    pub cam_ways: usize,
    /// defaults to `2 * cam_ways`
    #[serde(default)]
    pub response_buffer_depth: Option<usize>,
    /// read ports may carry read-with-invalidate semantics
    #[serde(default)]
    pub read_invalidate: bool,
}

impl CacheConfig {
    pub fn new(ways: usize, cam_ways: usize) -> Result<Self> {
        Self {
            ways,
            cam_ways,
            response_buffer_depth: None,
            read_invalidate: true,
        }
        .validated()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    pub fn validated(self) -> Result<Self> {
        if !self.ways.is_power_of_two() {
            return Err(ConfigError::BadWayCount(self.ways));
        }
        if self.cam_ways == 0 {
            return Err(ConfigError::ZeroCamWays);
        }
        if self.response_buffer_depth == Some(0) {
            return Err(ConfigError::ZeroBufferDepth);
        }
        Ok(self)
    }

    pub fn buffer_depth(&self) -> usize {
        self.response_buffer_depth.unwrap_or(2 * self.cam_ways)
    }
}

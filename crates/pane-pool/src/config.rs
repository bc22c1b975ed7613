//! Pool configuration parameters.

use std::error::Error;
use std::fmt;

/// Configuration for a [`Pool`](crate::Pool).
///
/// Validated at construction; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Diagnostic label used in log lines. Must be non-empty.
    pub name: String,

    /// Memory-pressure threshold on pooled (unleased) entries.
    ///
    /// When a release leaves more than this many entries in the free
    /// list, the payloads of the excess entries are reclaimed and the
    /// reaper is notified. `None` disables automatic shedding; entries
    /// are then reclaimed only through
    /// [`Pool::reclaim_idle`](crate::Pool::reclaim_idle).
    ///
    /// Default: `None`. `Some(0)` is rejected: use
    /// [`Pool::reclaim_all`](crate::Pool::reclaim_all) instead.
    pub soft_limit: Option<usize>,
}

impl PoolConfig {
    /// Default diagnostic label.
    pub const DEFAULT_NAME: &'static str = "pool";

    /// Create a config with the given label and no soft limit.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            soft_limit: None,
        }
    }

    /// Builder-style setter for [`soft_limit`](Self::soft_limit).
    pub fn with_soft_limit(mut self, limit: usize) -> Self {
        self.soft_limit = Some(limit);
        self
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), PoolConfigError> {
        if self.name.is_empty() {
            return Err(PoolConfigError::EmptyName);
        }
        if self.soft_limit == Some(0) {
            return Err(PoolConfigError::ZeroSoftLimit);
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::named(Self::DEFAULT_NAME)
    }
}

/// Errors detected by [`PoolConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolConfigError {
    /// `name` is empty.
    EmptyName,
    /// `soft_limit` is `Some(0)`.
    ZeroSoftLimit,
}

impl fmt::Display for PoolConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "pool name must not be empty"),
            Self::ZeroSoftLimit => write!(f, "soft limit must be at least 1"),
        }
    }
}

impl Error for PoolConfigError {}

//! Filepath: src/config.rs
//!
//! Node-size limits for an [`ATree`](crate::tree::ATree).

use crate::tree::TreeError;

/// Default maximum number of items in a leaf.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 48;

/// Default maximum number of children in an inner node.
pub const DEFAULT_MAX_INNER_SIZE: usize = 64;

/// Smallest limit accepted for either node kind.
///
/// Below three a split can leave a half that is immediately undersized.
pub const MIN_NODE_SIZE: usize = 3;

/// Capacity limits shared by every node of one tree.
///
/// A node is *undersized* when `local_count * 3 <= max`; undersized nodes
/// are merged with or refilled from a sibling during the next structural
/// pass through their parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TreeConfig {
    /// Maximum physical items per leaf.
    pub max_leaf_size: usize,

    /// Maximum children per inner node.
    pub max_inner_size: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            max_inner_size: DEFAULT_MAX_INNER_SIZE,
        }
    }
}

impl TreeConfig {
    /// Replace the leaf limit.
    #[must_use]
    pub const fn with_max_leaf_size(mut self, max: usize) -> Self {
        self.max_leaf_size = max;
        self
    }

    /// Replace the inner-node limit.
    #[must_use]
    pub const fn with_max_inner_size(mut self, max: usize) -> Self {
        self.max_inner_size = max;
        self
    }

    /// Check both limits against [`MIN_NODE_SIZE`].
    ///
    /// # Errors
    /// [`TreeError::InvalidConfig`] if either limit is too small.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.max_leaf_size < MIN_NODE_SIZE {
            return Err(TreeError::InvalidConfig("max_leaf_size must be at least 3"));
        }
        if self.max_inner_size < MIN_NODE_SIZE {
            return Err(TreeError::InvalidConfig("max_inner_size must be at least 3"));
        }
        Ok(())
    }

    #[must_use]
    #[inline(always)]
    pub(crate) const fn leaf_undersized(&self, local: usize) -> bool {
        local * 3 <= self.max_leaf_size
    }

    #[must_use]
    #[inline(always)]
    pub(crate) const fn inner_undersized(&self, local: usize) -> bool {
        local * 3 <= self.max_inner_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_validate() {
        assert!(TreeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_tiny_limits_rejected() {
        let leaf = TreeConfig::default().with_max_leaf_size(2);
        assert!(matches!(leaf.validate(), Err(TreeError::InvalidConfig(_))));

        let inner = TreeConfig::default().with_max_inner_size(1);
        assert!(matches!(inner.validate(), Err(TreeError::InvalidConfig(_))));
    }

    #[test]
    fn test_undersized_threshold() {
        let cfg = TreeConfig::default().with_max_leaf_size(9).with_max_inner_size(6);

        assert!(cfg.leaf_undersized(3));
        assert!(!cfg.leaf_undersized(4));
        assert!(cfg.inner_undersized(2));
        assert!(!cfg.inner_undersized(3));
    }
}

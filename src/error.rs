//! Rendering error types.

use crate::registry::ResourceKind;

/// Errors that can occur in the rendering core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// A capped resource arena reached its configured ceiling.
    ///
    /// This indicates either a leak (resources not released across
    /// reconstructions) or an under-provisioned ceiling; the construct pass
    /// that hit it is aborted without committing partial graph state.
    #[error("{kind:?} arena full (capacity {capacity}) while constructing node '{node}'")]
    ArenaFull {
        /// Which resource arena overflowed.
        kind: ResourceKind,
        /// The configured ceiling for that arena.
        capacity: usize,
        /// Name of the node whose construct phase hit the ceiling.
        node: String,
    },

    /// The node dependency graph contains a cycle.
    #[error("render graph contains cyclic dependency involving: {nodes:?}")]
    CyclicDependency {
        /// Names of the nodes participating in the cycle.
        nodes: Vec<String>,
    },

    /// Failed to create or initialize a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A texture source image has an unsupported channel count.
    #[error("unsupported channel count {channels} in '{path}' (expected 3 or 4)")]
    UnsupportedChannelCount {
        /// Channel count reported by the image header.
        channels: u8,
        /// Source path, for the diagnostic.
        path: String,
    },

    /// A blocking wait (slot fence or image acquire) exceeded its timeout.
    #[error("synchronization timeout: {0}")]
    SyncTimeout(String),

    /// The presentation surface stayed out of date across the bounded
    /// number of rebuild attempts for one frame.
    #[error("surface still out of date after {attempts} rebuild attempts")]
    SurfaceLost {
        /// Rebuild attempts made before giving up.
        attempts: usize,
    },

    /// Submission to the backend failed with no recovery path.
    #[error("frame submission failed: {0}")]
    Submit(String),

    /// The backend could not be initialized.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderError::SyncTimeout("slot 1 fence".to_string());
        assert_eq!(err.to_string(), "synchronization timeout: slot 1 fence");

        let err = RenderError::ArenaFull {
            kind: ResourceKind::Buffer,
            capacity: 4,
            node: "forward".to_string(),
        };
        assert!(err.to_string().contains("capacity 4"));
        assert!(err.to_string().contains("'forward'"));
    }
}

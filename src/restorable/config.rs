use crate::foundation::error::{RestoreError, RestoreResult};

/// When [`crate::RestorableContext::end_frame`] collapses history into baselines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvePolicy {
    /// Resolve at the end of every frame.
    #[default]
    EveryFrame,
    /// Resolve only once the unresolved commands across all images exceed `max_commands`.
    HistoryBudget {
        /// Total unresolved commands tolerated between frames.
        max_commands: usize,
    },
    /// Never resolve implicitly; the caller invokes `resolve_stale_images`.
    Manual,
}

/// Options for [`crate::RestorableContext`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ContextOpts {
    /// Frame-end resolution policy.
    pub resolve_policy: ResolvePolicy,
    /// Longest history kept per image; longer histories are read back immediately.
    pub max_image_history: usize,
}

impl Default for ContextOpts {
    fn default() -> Self {
        Self {
            resolve_policy: ResolvePolicy::default(),
            max_image_history: 1024,
        }
    }
}

impl ContextOpts {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> RestoreResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| RestoreError::Other(anyhow::Error::new(e).context("parse ContextOpts")))?;
        if opts.max_image_history == 0 {
            return Err(RestoreError::Other(anyhow::anyhow!(
                "max_image_history must be > 0"
            )));
        }
        Ok(opts)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/restorable/config.rs"]
mod tests;

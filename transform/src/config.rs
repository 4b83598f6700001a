//! Pass configuration.
//!
//! Provides typed configuration for the conversion pass with bon builders.
//! Supports both explicit configuration and environment variable fallbacks.

use bon::bon;

/// How the insertion pass selects the edges it converts.
///
/// Chosen once per compiler run; never varies per edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum InsertionPolicy {
    /// Every internal data edge goes through the strategy table.
    #[default]
    #[strum(serialize = "edge")]
    PerEdge,

    /// Only graph boundaries: edges leaving `Data` nodes and edges entering
    /// `NetOutput`, which is converted back to the producer's original format.
    #[strum(serialize = "boundary")]
    BoundaryOnly,
}

impl InsertionPolicy {
    /// Read `KILN_TRANS_POLICY` (`edge` or `boundary`).
    pub fn from_env() -> Self {
        std::env::var("KILN_TRANS_POLICY").ok().and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

/// Configuration for conversion-node insertion and merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassConfig {
    /// Edge selection policy.
    pub policy: InsertionPolicy,
    /// Fall back to a generic conversion order for format pairs the table lacks.
    pub consecutive_principle: bool,
    /// Largest rank difference a single `SqueezeV2`/`UnsqueezeV2` may bridge.
    pub squeeze_rank_gap: usize,
    /// Run the inverse-pair merge after insertion.
    pub merge_trans_ops: bool,
    /// Ask the capability store for an accuracy verdict on inserted `Cast` nodes.
    pub accuracy_check: bool,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            policy: InsertionPolicy::PerEdge,
            consecutive_principle: false,
            squeeze_rank_gap: 3,
            merge_trans_ops: true,
            accuracy_check: true,
        }
    }
}

#[bon]
impl PassConfig {
    /// Create a pass configuration with builder pattern.
    #[builder]
    pub fn builder(
        #[builder(default)] policy: InsertionPolicy,
        #[builder(default = false)] consecutive_principle: bool,
        #[builder(default = 3)] squeeze_rank_gap: usize,
        #[builder(default = true)] merge_trans_ops: bool,
        #[builder(default = true)] accuracy_check: bool,
    ) -> Self {
        Self { policy, consecutive_principle, squeeze_rank_gap, merge_trans_ops, accuracy_check }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `KILN_TRANS_POLICY` - `edge` (default) or `boundary`
    /// * `KILN_CONSECUTIVE_PRINCIPLE` - Enable the generic fallback order if set
    /// * `KILN_SQUEEZE_RANK_GAP` - Max rank gap for squeeze/unsqueeze (default: 3)
    /// * `KILN_NO_TRANS_MERGE` - Skip inverse-pair merging if set
    /// * `KILN_NO_ACCURACY_CHECK` - Skip accuracy checks on inserted casts if set
    pub fn from_env() -> Self {
        let policy = InsertionPolicy::from_env();
        let consecutive_principle = std::env::var("KILN_CONSECUTIVE_PRINCIPLE").is_ok();
        let squeeze_rank_gap = std::env::var("KILN_SQUEEZE_RANK_GAP").ok().and_then(|s| s.parse().ok()).unwrap_or(3);
        let merge_trans_ops = std::env::var("KILN_NO_TRANS_MERGE").is_err();
        let accuracy_check = std::env::var("KILN_NO_ACCURACY_CHECK").is_err();

        Self { policy, consecutive_principle, squeeze_rank_gap, merge_trans_ops, accuracy_check }
    }
}

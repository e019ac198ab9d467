//! Preference reconciliation
//!
//! The merge rules live host-side in [`merge`]; [`script`] renders them into
//! a shell/awk procedure that runs inside the service, because the
//! preference file is only reachable from the container's filesystem.

pub mod merge;
pub mod policy;
pub mod reconciler;
pub mod script;
pub mod value;

pub use merge::{format_assignment, merge_preferences, LineMatcher};
pub use policy::{i2p_proxy_policy, PreferenceTarget};
pub use reconciler::{reconcile, ReconcileFailure, ReconcileOutcome, SkipReason};
pub use script::{render_patch_script, ABSENT_MARKER};
pub use value::{PrefValue, PreferenceSet};

//! Organization feature-flag resolution.
//!
//! OR semantics across the learner's organizations: any one enabling org
//! grants access. Always called with the connection of the open mutating
//! transaction so a mid-session flag flip can never leave a mutation
//! half-applied under the old permission state.

use rusqlite::Connection;
use tracing::debug;

use ascent_core::{CoachError, Feature};

use crate::store;

/// Resolve the learner's organizations. A learner with no memberships is an
/// identity the platform has never seen.
pub(crate) fn resolve_orgs(
    conn: &Connection,
    learner_id: &str,
) -> Result<Vec<String>, CoachError> {
    let orgs = store::org_ids(conn, learner_id)?;
    if orgs.is_empty() {
        return Err(CoachError::NotFound(learner_id.to_string()));
    }
    Ok(orgs)
}

/// Check whether any of the learner's organizations enables the feature
pub(crate) fn has_access(
    conn: &Connection,
    orgs: &[String],
    feature: Feature,
) -> Result<bool, CoachError> {
    for org in orgs {
        if store::feature_enabled(conn, org, feature.as_str())? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resolve membership and require the feature, in one step
pub(crate) fn require(
    conn: &Connection,
    learner_id: &str,
    feature: Feature,
) -> Result<(), CoachError> {
    let orgs = resolve_orgs(conn, learner_id)?;
    if !has_access(conn, &orgs, feature)? {
        debug!(learner = learner_id, %feature, "access denied");
        return Err(CoachError::AccessDenied(feature));
    }
    Ok(())
}

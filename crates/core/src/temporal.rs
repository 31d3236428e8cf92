use chrono::{DateTime, Utc};

/// Inclusion predicate for the "as of" filter: a document belongs to the
/// view iff it was last modified at or before the cutoff. An absent cutoff
/// disables filtering entirely; it must not behave like an implicit "now",
/// which would hide documents under client/server clock skew.
pub fn include(cutoff: Option<DateTime<Utc>>, modified_at: DateTime<Utc>) -> bool {
    match cutoff {
        Some(cutoff) => modified_at <= cutoff,
        None => true,
    }
}

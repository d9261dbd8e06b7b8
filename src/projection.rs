//! Pure projections from raw feed documents to display-ready records.
//!
//! Nothing in this module performs I/O or mutates its input: given the same
//! raw document the output is byte-identical.

use serde::{Deserialize, Serialize};
use serde_with::{TimestampMilliSeconds, serde_as};
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use crate::{error::ProjectionError, feed::DocumentSnapshot};

/// UTC render of score timestamps, e.g. `August 25 2026, 3:04:05 PM`.
const DATE_FORMAT: &[FormatItem<'_>] = format_description!(
    "[month repr:long] [day padding:none] [year], [hour repr:12 padding:none]:[minute]:[second] [period]"
);

/// Authenticated identity handed out by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable unique identifier of the account.
    pub uid: String,
    /// Email address, when the provider exposes one.
    pub email: Option<String>,
}

/// Display theme embedded in a user profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSpec {
    /// Primary accent color.
    #[serde(default = "default_primary")]
    pub primary: String,
    /// Secondary accent color.
    #[serde(default = "default_secondary")]
    pub secondary: String,
    /// Whether the dark palette is active.
    #[serde(default)]
    pub dark: bool,
}

impl Default for ThemeSpec {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            dark: false,
        }
    }
}

fn default_primary() -> String {
    "blue".into()
}

fn default_secondary() -> String {
    "red".into()
}

/// Read-only projection of the account document owned by the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    /// Account identifier the document is keyed by.
    pub uid: String,
    /// First name, empty when the user has not filled it in.
    pub first_name: String,
    /// Last name, empty when the user has not filled it in.
    pub last_name: String,
    /// Public username, empty until chosen in the settings flow.
    pub username: String,
    /// Theme preference, falling back to the system default when absent.
    pub theme: ThemeSpec,
}

/// One leaderboard row, derived from a raw score document on every delivery
/// and never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreRecord {
    /// Points achieved in the game.
    pub score: i64,
    /// Moment the score was recorded, rendered with [`DATE_FORMAT`].
    pub date: String,
    /// Non-empty name components joined with a single space.
    pub full_name: String,
    /// Upper-cased first letter of each non-empty name component; empty
    /// whenever the first name is empty.
    pub initials: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawScoreDoc {
    score: i64,
    #[serde_as(as = "TimestampMilliSeconds<i64>")]
    date: OffsetDateTime,
    #[serde(default, rename = "firstName")]
    first_name: String,
    #[serde(default, rename = "lastName")]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct RawProfileDoc {
    #[serde(default, rename = "firstName")]
    first_name: String,
    #[serde(default, rename = "lastName")]
    last_name: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    theme: Option<ThemeSpec>,
}

/// Project a raw score document into a [`ScoreRecord`].
///
/// Callers treat an error like a missing document and drop the row.
pub fn project_score(raw: &serde_json::Value) -> Result<ScoreRecord, ProjectionError> {
    let doc: RawScoreDoc =
        serde_json::from_value(raw.clone()).map_err(|err| ProjectionError::Malformed {
            reason: err.to_string(),
        })?;

    let date = doc
        .date
        .format(&DATE_FORMAT)
        .map_err(|_| ProjectionError::Unrenderable { field: "date" })?;

    Ok(ScoreRecord {
        score: doc.score,
        date,
        full_name: full_name(&doc.first_name, &doc.last_name),
        initials: initials(&doc.first_name, &doc.last_name),
    })
}

/// Project a profile document snapshot into a [`UserProfile`].
///
/// Returns `None` when the document does not exist, carries no data, or
/// cannot be decoded; the theme defaults to [`ThemeSpec::default`] when the
/// document has none.
pub fn project_profile(uid: &str, snapshot: &DocumentSnapshot) -> Option<UserProfile> {
    let data = snapshot.data.as_ref()?;
    let doc: RawProfileDoc = serde_json::from_value(data.clone()).ok()?;

    Some(UserProfile {
        uid: uid.to_string(),
        first_name: doc.first_name,
        last_name: doc.last_name,
        username: doc.username,
        theme: doc.theme.unwrap_or_default(),
    })
}

/// Join the non-empty name components with a single space.
fn full_name(first: &str, last: &str) -> String {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    parts.join(" ")
}

/// First letter of each non-empty component, upper-cased. An empty first
/// name yields an empty string regardless of the last name.
fn initials(first: &str, last: &str) -> String {
    if first.trim().is_empty() {
        return String::new();
    }

    [first, last]
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn score_doc(first: &str, last: &str) -> serde_json::Value {
        json!({
            "score": 31,
            "date": 1_724_580_000_000_i64,
            "firstName": first,
            "lastName": last,
            "username": "jd",
        })
    }

    #[test]
    fn score_projection_derives_name_fields() {
        let record = project_score(&score_doc("Jane", "Doe")).unwrap();
        assert_eq!(record.score, 31);
        assert_eq!(record.full_name, "Jane Doe");
        assert_eq!(record.initials, "JD");
    }

    #[test]
    fn initials_empty_when_first_name_missing() {
        let record = project_score(&score_doc("", "Doe")).unwrap();
        assert_eq!(record.full_name, "Doe");
        assert_eq!(record.initials, "");
    }

    #[test]
    fn single_name_component_keeps_single_initial() {
        let record = project_score(&score_doc("Jane", "")).unwrap();
        assert_eq!(record.full_name, "Jane");
        assert_eq!(record.initials, "J");
    }

    #[test]
    fn score_projection_is_deterministic() {
        let raw = score_doc("Jane", "Doe");
        let first = project_score(&raw).unwrap();
        let second = project_score(&raw).unwrap();
        assert_eq!(first, second);
        // Input is untouched by projecting it.
        assert_eq!(raw, score_doc("Jane", "Doe"));
    }

    #[test]
    fn date_renders_without_locale() {
        let record = project_score(&score_doc("Jane", "Doe")).unwrap();
        assert_eq!(record.date, "August 25 2024, 10:00:00 AM");
    }

    #[test]
    fn malformed_score_is_rejected() {
        let raw = json!({ "date": 0, "firstName": "Jane" });
        assert!(matches!(
            project_score(&raw),
            Err(ProjectionError::Malformed { .. })
        ));
    }

    #[test]
    fn profile_projection_maps_fields() {
        let snapshot = DocumentSnapshot {
            id: "u1".into(),
            data: Some(json!({
                "firstName": "Jane",
                "lastName": "Doe",
                "username": "jd",
                "theme": { "primary": "teal", "secondary": "amber", "dark": true },
            })),
        };

        let profile = project_profile("u1", &snapshot).unwrap();
        assert_eq!(profile.uid, "u1");
        assert_eq!(profile.username, "jd");
        assert!(profile.theme.dark);
        assert_eq!(profile.theme.primary, "teal");
    }

    #[test]
    fn profile_theme_defaults_when_absent() {
        let snapshot = DocumentSnapshot {
            id: "u1".into(),
            data: Some(json!({ "firstName": "Jane", "username": "jd" })),
        };

        let profile = project_profile("u1", &snapshot).unwrap();
        assert_eq!(profile.theme, ThemeSpec::default());
    }

    #[test]
    fn missing_document_projects_to_none() {
        let snapshot = DocumentSnapshot {
            id: "u1".into(),
            data: None,
        };
        assert!(project_profile("u1", &snapshot).is_none());
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Points per citizen level.
pub const POINTS_PER_LEVEL: i64 = 1000;
/// Reward advertised on the report form. Awarded by the backend, not here.
pub const REPORT_REWARD_POINTS: i64 = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub citizen_score: i64,
    #[serde(default)]
    pub total_reports: i64,
    #[serde(default)]
    pub resolved_reports: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Profile {
    pub fn level(&self) -> i64 {
        self.citizen_score.max(0) / POINTS_PER_LEVEL + 1
    }

    pub fn points_to_next_level(&self) -> i64 {
        POINTS_PER_LEVEL - self.citizen_score.max(0) % POINTS_PER_LEVEL
    }

    /// Progress through the current level, 0..=99.
    pub fn level_progress_percent(&self) -> u8 {
        ((self.citizen_score.max(0) % POINTS_PER_LEVEL) / 10) as u8
    }

    pub fn display_name(&self, email: Option<&str>) -> String {
        if let Some(name) = self.full_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        email
            .and_then(|e| e.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("Citizen")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn profile(score: i64) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            full_name: None,
            phone: None,
            avatar_url: None,
            citizen_score: score,
            total_reports: 23,
            resolved_reports: 19,
            created_at: datetime!(2025-01-01 0:00 UTC),
            updated_at: datetime!(2025-01-01 0:00 UTC),
        }
    }

    #[test]
    fn level_math_matches_profile_card() {
        let p = profile(2847);
        assert_eq!(p.level(), 3);
        assert_eq!(p.points_to_next_level(), 153);
        assert_eq!(p.level_progress_percent(), 84);
    }

    #[test]
    fn fresh_profile_is_level_one() {
        let p = profile(0);
        assert_eq!(p.level(), 1);
        assert_eq!(p.points_to_next_level(), 1000);
    }

    #[test]
    fn extreme_scores_do_not_overflow() {
        let p = profile(i64::MAX);
        assert_eq!(p.level(), i64::MAX / POINTS_PER_LEVEL + 1);
        assert_eq!(p.points_to_next_level(), 193);
        assert_eq!(p.level_progress_percent(), 80);

        assert_eq!(profile(-40).points_to_next_level(), 1000);
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        let mut p = profile(10);
        assert_eq!(p.display_name(Some("rajesh@example.com")), "rajesh");
        p.full_name = Some("  ".into());
        assert_eq!(p.display_name(None), "Citizen");
        p.full_name = Some("Rajesh Kumar".into());
        assert_eq!(p.display_name(Some("rajesh@example.com")), "Rajesh Kumar");
    }
}

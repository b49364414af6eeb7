//! List helpers behind the home feed and the map screen's issue list.

use serde::Serialize;

use crate::models::issue::{Coordinates, Issue, IssueStatus};
use crate::models::profile::Profile;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    InProgress,
    Resolved,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Pending,
        StatusFilter::InProgress,
        StatusFilter::Resolved,
    ];

    pub fn matches(&self, status: IssueStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => {
                matches!(status, IssueStatus::Reported | IssueStatus::Assigned)
            }
            StatusFilter::InProgress => status == IssueStatus::InProgress,
            StatusFilter::Resolved => {
                matches!(status, IssueStatus::Resolved | IssueStatus::Closed)
            }
        }
    }
}

fn matches_query(issue: &Issue, needle: &str) -> bool {
    issue.title.to_lowercase().contains(needle)
        || issue.category.label().to_lowercase().contains(needle)
        || issue
            .location_address
            .as_deref()
            .is_some_and(|address| address.to_lowercase().contains(needle))
}

/// Issues passing both the status tab and the search box, in input order.
/// A blank query matches everything.
pub fn filter_issues<'a>(issues: &'a [Issue], filter: StatusFilter, query: &str) -> Vec<&'a Issue> {
    let needle = query.trim().to_lowercase();
    issues
        .iter()
        .filter(|issue| filter.matches(issue.status))
        .filter(|issue| needle.is_empty() || matches_query(issue, &needle))
        .collect()
}

/// Badge counts for each status tab, in [`StatusFilter::ALL`] order.
pub fn filter_counts(issues: &[Issue]) -> Vec<(StatusFilter, usize)> {
    StatusFilter::ALL
        .into_iter()
        .map(|filter| {
            let count = issues.iter().filter(|i| filter.matches(i.status)).count();
            (filter, count)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HomeStats {
    pub total: usize,
    /// Only `resolved`; closed issues are not counted.
    pub resolved: usize,
    pub citizen_score: i64,
}

impl HomeStats {
    pub fn compute(issues: &[Issue], profile: Option<&Profile>) -> Self {
        Self {
            total: issues.len(),
            resolved: issues
                .iter()
                .filter(|i| i.status == IssueStatus::Resolved)
                .count(),
            citizen_score: profile.map_or(0, |p| p.citizen_score),
        }
    }
}

/// The `limit` newest issues.
pub fn recent(issues: &[Issue], limit: usize) -> Vec<&Issue> {
    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(limit);
    sorted
}

/// Great-circle distance in kilometres.
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let (lat1, lat2) = (from.latitude.to_radians(), to.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Nearest first, paired with the distance. Issues without coordinates go
/// last with `None`.
pub fn sort_by_distance(issues: &[Issue], origin: Coordinates) -> Vec<(&Issue, Option<f64>)> {
    let mut ranked: Vec<(&Issue, Option<f64>)> = issues
        .iter()
        .map(|issue| (issue, issue.coordinates().map(|c| distance_km(origin, c))))
        .collect();
    ranked.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::issue::{CreateIssueData, IssueCategory};
    use time::Duration;
    use uuid::Uuid;

    fn issue(title: &str, category: IssueCategory, status: IssueStatus, age_hours: i64) -> Issue {
        let mut issue = Issue::provisional(
            Uuid::new_v4(),
            Uuid::new_v4(),
            &CreateIssueData::new(title, category),
        );
        issue.status = status;
        issue.created_at -= Duration::hours(age_hours);
        issue
    }

    fn sample() -> Vec<Issue> {
        let mut pothole = issue("Large pothole", IssueCategory::Roads, IssueStatus::Reported, 2);
        pothole.location_address = Some("MG Road, Sector 14".into());
        vec![
            pothole,
            issue("Overflowing bin", IssueCategory::Garbage, IssueStatus::Assigned, 5),
            issue("Dark lane", IssueCategory::Streetlights, IssueStatus::InProgress, 1),
            issue("Pipe burst", IssueCategory::Water, IssueStatus::Resolved, 30),
            issue("Fallen tree", IssueCategory::Parks, IssueStatus::Closed, 48),
        ]
    }

    #[test]
    fn status_tabs_group_statuses() {
        let issues = sample();
        let counts = filter_counts(&issues);
        assert_eq!(
            counts,
            vec![
                (StatusFilter::All, 5),
                (StatusFilter::Pending, 2),
                (StatusFilter::InProgress, 1),
                (StatusFilter::Resolved, 2),
            ]
        );
    }

    #[test]
    fn search_covers_title_category_label_and_address() {
        let issues = sample();
        let titles = |query: &str| -> Vec<String> {
            filter_issues(&issues, StatusFilter::All, query)
                .into_iter()
                .map(|i| i.title.clone())
                .collect()
        };

        assert_eq!(titles("PIPE"), vec!["Pipe burst"]);
        assert_eq!(titles("waste"), vec!["Overflowing bin"]);
        assert_eq!(titles("sector 14"), vec!["Large pothole"]);
        assert_eq!(titles("  ").len(), 5);
        assert!(filter_issues(&issues, StatusFilter::Resolved, "pothole").is_empty());
    }

    #[test]
    fn home_stats_and_recent() {
        let issues = sample();
        let stats = HomeStats::compute(&issues, None);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.citizen_score, 0);

        let newest: Vec<&str> = recent(&issues, 3).iter().map(|i| i.title.as_str()).collect();
        assert_eq!(newest, vec!["Dark lane", "Large pothole", "Overflowing bin"]);
    }

    #[test]
    fn closed_issues_are_not_counted_as_resolved_on_home() {
        let issues = vec![
            issue("Pipe burst", IssueCategory::Water, IssueStatus::Resolved, 3),
            issue("Fallen tree", IssueCategory::Parks, IssueStatus::Closed, 4),
        ];

        assert_eq!(HomeStats::compute(&issues, None).resolved, 1);
        assert_eq!(filter_issues(&issues, StatusFilter::Resolved, "").len(), 2);
    }

    #[test]
    fn haversine_matches_known_distance() {
        let delhi = Coordinates {
            latitude: 28.6139,
            longitude: 77.2090,
        };
        let mumbai = Coordinates {
            latitude: 19.0760,
            longitude: 72.8777,
        };
        let km = distance_km(delhi, mumbai);
        assert!((km - 1150.0).abs() < 15.0, "got {km}");
        assert_eq!(distance_km(delhi, delhi), 0.0);
    }

    #[test]
    fn unlocated_issues_sort_last() {
        let mut issues = sample();
        issues[1].location_lat = Some(12.98);
        issues[1].location_lng = Some(77.60);
        issues[2].location_lat = Some(12.90);
        issues[2].location_lng = Some(77.50);
        let origin = Coordinates {
            latitude: 12.97,
            longitude: 77.59,
        };

        let ranked = sort_by_distance(&issues, origin);

        assert_eq!(ranked[0].0.title, "Overflowing bin");
        assert_eq!(ranked[1].0.title, "Dark lane");
        assert!(ranked[2..].iter().all(|(_, d)| d.is_none()));
    }
}

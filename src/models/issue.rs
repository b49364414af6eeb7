use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Roads,
    Water,
    Electricity,
    Garbage,
    Streetlights,
    Drainage,
    Parks,
    Other,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 8] = [
        IssueCategory::Roads,
        IssueCategory::Water,
        IssueCategory::Electricity,
        IssueCategory::Garbage,
        IssueCategory::Streetlights,
        IssueCategory::Drainage,
        IssueCategory::Parks,
        IssueCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Roads => "roads",
            IssueCategory::Water => "water",
            IssueCategory::Electricity => "electricity",
            IssueCategory::Garbage => "garbage",
            IssueCategory::Streetlights => "streetlights",
            IssueCategory::Drainage => "drainage",
            IssueCategory::Parks => "parks",
            IssueCategory::Other => "other",
        }
    }

    /// Label shown on the report form and matched by feed search.
    pub fn label(&self) -> &'static str {
        match self {
            IssueCategory::Roads => "Roads & Potholes",
            IssueCategory::Water => "Water Supply",
            IssueCategory::Electricity => "Electricity",
            IssueCategory::Garbage => "Waste Management",
            IssueCategory::Streetlights => "Street Lighting",
            IssueCategory::Drainage => "Drainage",
            IssueCategory::Parks => "Parks & Trees",
            IssueCategory::Other => "Other Issues",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let needle = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == needle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Reported,
    Assigned,
    InProgress,
    Resolved,
    Closed,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Reported => "reported",
            IssueStatus::Assigned => "assigned",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(
            self,
            IssueStatus::Reported | IssueStatus::Assigned | IssueStatus::InProgress
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: IssueCategory,
    pub status: IssueStatus,
    #[serde(default)]
    pub priority: IssuePriority,
    #[serde(default)]
    pub location_lat: Option<f64>,
    #[serde(default)]
    pub location_lng: Option<f64>,
    #[serde(default)]
    pub location_address: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub voice_note_url: Option<String>,
    #[serde(default)]
    pub upvotes: u64,
    #[serde(default)]
    pub department_assigned: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub estimated_resolution_date: Option<String>,
    #[serde(default)]
    pub actual_resolution_date: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Issue {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.location_lat, self.location_lng) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    /// Placeholder row for a report whose insert has not come back yet.
    pub fn provisional(local_id: Uuid, user_id: Uuid, data: &CreateIssueData) -> Self {
        let now = OffsetDateTime::now_utc();
        Issue {
            id: local_id,
            user_id,
            title: data.title.clone(),
            description: data.description.clone(),
            category: data.category,
            status: IssueStatus::Reported,
            priority: IssuePriority::default(),
            location_lat: data.location_lat,
            location_lng: data.location_lng,
            location_address: data.location_address.clone(),
            photo_url: data.photo_url.clone(),
            video_url: data.video_url.clone(),
            voice_note_url: data.voice_note_url.clone(),
            upvotes: 0,
            department_assigned: None,
            assigned_to: None,
            estimated_resolution_date: None,
            actual_resolution_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIssueData {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: IssueCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_note_url: Option<String>,
}

impl CreateIssueData {
    pub fn new(title: impl Into<String>, category: IssueCategory) -> Self {
        Self {
            title: title.into(),
            description: None,
            category,
            location_lat: None,
            location_lng: None,
            location_address: None,
            photo_url: None,
            video_url: None,
            voice_note_url: None,
        }
    }
}

/// Row body sent to the backend on insert.
#[derive(Debug, Clone, Serialize)]
pub struct NewIssueRow<'a> {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub data: &'a CreateIssueData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Pending,
    Committed,
}

/// A record tagged with whether its last write has been acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tracked<T> {
    pub value: T,
    pub state: SyncState,
}

impl<T> Tracked<T> {
    pub fn pending(value: T) -> Self {
        Self {
            value,
            state: SyncState::Pending,
        }
    }

    pub fn committed(value: T) -> Self {
        Self {
            value,
            state: SyncState::Committed,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == SyncState::Pending
    }
}

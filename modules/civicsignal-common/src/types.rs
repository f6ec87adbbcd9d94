use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::CivicSignalError;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Reject coordinates outside the valid WGS84 range.
    pub fn validate(&self) -> Result<(), CivicSignalError> {
        if !self.lat.is_finite() || self.lat.abs() > 90.0 {
            return Err(CivicSignalError::Validation(format!(
                "latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        if !self.lng.is_finite() || self.lng.abs() > 180.0 {
            return Err(CivicSignalError::Validation(format!(
                "longitude {} out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Pothole,
    Garbage,
    Streetlight,
    WaterLeakage,
    IllegalDumping,
    Drainage,
    Parks,
    Traffic,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Pothole => write!(f, "pothole"),
            Category::Garbage => write!(f, "garbage"),
            Category::Streetlight => write!(f, "streetlight"),
            Category::WaterLeakage => write!(f, "water_leakage"),
            Category::IllegalDumping => write!(f, "illegal_dumping"),
            Category::Drainage => write!(f, "drainage"),
            Category::Parks => write!(f, "parks"),
            Category::Traffic => write!(f, "traffic"),
            Category::Other => write!(f, "other"),
        }
    }
}

impl Category {
    pub fn from_str_loose(s: &str) -> Self {
        match s {
            "pothole" => Self::Pothole,
            "garbage" => Self::Garbage,
            "streetlight" => Self::Streetlight,
            "water_leakage" => Self::WaterLeakage,
            "illegal_dumping" => Self::IllegalDumping,
            "drainage" => Self::Drainage,
            "parks" => Self::Parks,
            "traffic" => Self::Traffic,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueStatus::Pending => write!(f, "pending"),
            IssueStatus::InProgress => write!(f, "in_progress"),
            IssueStatus::Resolved => write!(f, "resolved"),
            IssueStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    PublicWorks,
    Sanitation,
    WaterDepartment,
    Electricity,
    Traffic,
    Parks,
    Other,
}

impl std::fmt::Display for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Department::PublicWorks => write!(f, "public_works"),
            Department::Sanitation => write!(f, "sanitation"),
            Department::WaterDepartment => write!(f, "water_department"),
            Department::Electricity => write!(f, "electricity"),
            Department::Traffic => write!(f, "traffic"),
            Department::Parks => write!(f, "parks"),
            Department::Other => write!(f, "other"),
        }
    }
}

// --- Actor Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Moderator,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Citizen => write!(f, "citizen"),
            Role::Moderator => write!(f, "moderator"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl Role {
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Role::Admin,
            "moderator" => Role::Moderator,
            _ => Role::Citizen,
        }
    }

    /// Staff roles may emit official status-update annotations and trigger
    /// reporter notifications.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }
}

/// The authenticated identity performing a call, as handed over by the
/// authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    /// Full-field modification is reserved for the reporting owner and
    /// admins. Everyone authenticated may still upvote and comment.
    pub fn can_modify(&self, reported_by: Uuid) -> bool {
        self.id == reported_by || self.role == Role::Admin
    }
}

// --- Issue ---

/// An uploaded image attached to an issue. The upload itself happens in the
/// external storage collaborator; this is just the opaque handle it returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub reference_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: Option<String>,
    pub point: GeoPoint,
    pub ward: Option<String>,
    pub zone: Option<String>,
}

impl Location {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            address: None,
            point: GeoPoint::new(lat, lng),
            ward: None,
            zone: None,
        }
    }
}

/// A single civic problem report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: IssueStatus,
    pub priority: Priority,
    pub location: Location,
    pub images: Vec<ImageRef>,
    pub reported_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub department: Option<Department>,
    pub upvotes: HashSet<Uuid>,
    pub upvote_count: u32,
    pub comments_count: u32,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Comment ---

/// Author summary stored on a comment. Role is captured at authoring time;
/// full user records stay with the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub role: Role,
}

/// A before/after status pair carried by a status-update comment. The pair
/// annotates the discussion trail; it does not itself change the issue's
/// status field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: IssueStatus,
    pub to: IssueStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub author: CommentAuthor,
    pub content: String,
    pub is_status_update: bool,
    pub status_from: Option<IssueStatus>,
    pub status_to: Option<IssueStatus>,
    pub is_official: bool,
    pub created_at: DateTime<Utc>,
}

// --- Status change notification ---

/// Emitted when an issue's status field actually changes. The notification
/// collaborator delivers it to the reporter; delivery is fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub issue_id: Uuid,
    pub old: IssueStatus,
    pub new: IssueStatus,
    pub recipient_user_id: Uuid,
}

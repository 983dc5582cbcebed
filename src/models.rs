use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: i64,
    pub title: String,
    pub company_id: Option<i64>,
    pub company_name: String,
    pub tech_stacks: Vec<String>, // raw tags, each may hold "a, b, c"
    pub position: String,
    pub career_level: String,
    pub education: String,
    pub location: String,
    pub salary: String,
    pub start_at: Option<NaiveDate>,
    pub end_at: Option<NaiveDate>, // None = always open
    pub view_count: u64,
    pub photo: Option<String>,
}

impl JobPosting {
    /// A posting is open when it has no end date or the end date is today or later.
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        match self.end_at {
            None => true,
            Some(end) => end >= today,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetail {
    pub posting: JobPosting,
    pub description: Option<String>,
    pub qualifications: Option<String>,
    pub benefits: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub logo: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

/// One favorite row as the server returns it. Several rows can point at the same company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCompanyRecord {
    pub id: Option<i64>,
    pub company_id: i64,
    pub company_name: String,
    pub post_count: i64,
    pub company_photo: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteCompanyGroup {
    pub company_id: i64,
    pub company_name: String,
    pub post_count: i64,
    pub ids: Vec<i64>,
    pub company_photo: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub id: i64,
    pub title: String,
    pub locked: bool,
    pub updated_at: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleNotice {
    pub job_id: i64,
    pub title: String,
    pub company_name: String,
    pub end_at: NaiveDate,
    pub days_left: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    #[default]
    Recent,
    Deadline,
}

impl SortMode {
    pub fn toggled(self) -> Self {
        match self {
            SortMode::Recent => SortMode::Deadline,
            SortMode::Deadline => SortMode::Recent,
        }
    }
}

/// Listing criteria. Empty strings and an empty stack set mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub position: String,
    pub experience: String,
    pub education: String,
    pub location: String,
    pub tech_stacks: BTreeSet<String>,
    pub company_id: Option<i64>,
    pub sort: SortMode,
}

/// Body for resume create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

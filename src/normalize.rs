//! Turns whatever shape the server sends into the canonical records in `models`.
//!
//! Every accepted alias for a field is listed exactly once in the tables below.
//! Adapters never fail: a record without a usable identifier is skipped.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::models::{
    Company, FavoriteCompanyRecord, GeoPoint, JobDetail, JobPosting, Resume,
};

// --- Record array extraction ---

/// Wrapper keys tried in order when a list response is an object.
const WRAPPER_KEYS: &[&str] = &["items", "content", "rows", "data", "list", "result"];

/// How far to follow object-valued wrapper keys, e.g. `{"data": {"content": [..]}}`.
const MAX_WRAPPER_DEPTH: usize = 2;

/// Pull the record array out of a list response.
///
/// Order of attempts:
/// 1. a bare array is returned as is;
/// 2. the first of `WRAPPER_KEYS` holding an array;
/// 3. the first of `WRAPPER_KEYS` holding an object that itself yields records;
/// 4. last resort: the first array-valued property in document order.
///
/// Anything else yields an empty list.
pub fn extract_records(payload: &Value) -> Vec<Value> {
    extract_at_depth(payload, 0)
}

fn extract_at_depth(payload: &Value, depth: usize) -> Vec<Value> {
    let map = match payload {
        Value::Array(items) => return items.clone(),
        Value::Object(map) => map,
        _ => return Vec::new(),
    };

    for key in WRAPPER_KEYS {
        if let Some(Value::Array(items)) = map.get(*key) {
            return items.clone();
        }
    }

    if depth < MAX_WRAPPER_DEPTH {
        for key in WRAPPER_KEYS {
            if let Some(inner @ Value::Object(_)) = map.get(*key) {
                let found = extract_at_depth(inner, depth + 1);
                if !found.is_empty() {
                    return found;
                }
            }
        }
    }

    map.values()
        .find_map(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

/// Single-record responses are sometimes wrapped as `{"data": {..}}`.
fn unwrap_single(payload: &Value) -> &Value {
    if payload.get("id").is_some() {
        return payload;
    }
    for key in ["data", "result"] {
        if let Some(inner @ Value::Object(_)) = payload.get(key) {
            return inner;
        }
    }
    payload
}

// --- Alias tables ---

const JOB_ID: &[&str] = &["id", "jobPostId", "job_post_id", "postId"];
const SCRAP_JOB_ID: &[&str] = &["jobPostId", "job_post_id", "postId", "id"];
const SCRAP_NESTED: &[&str] = &["jobPost", "job", "post"];
const JOB_TITLE: &[&str] = &["title", "jobTitle", "name"];
const JOB_COMPANY_ID: &[&str] = &["companyId", "company.id", "company_id"];
const JOB_COMPANY_NAME: &[&str] = &["companyName", "company.name", "company_name"];
const JOB_TECH_STACKS: &[&str] = &["techStacks", "techStack", "tech_stack", "skills", "stacks"];
const JOB_POSITION: &[&str] = &["position", "jobPosition", "job_position"];
const JOB_CAREER: &[&str] = &["careerLevel", "career_level", "career", "experience"];
const JOB_EDUCATION: &[&str] = &["education", "educationLevel", "education_level"];
const JOB_LOCATION: &[&str] = &["location", "region", "workLocation", "address"];
const JOB_SALARY: &[&str] = &["salary", "pay", "salaryRange"];
const JOB_START: &[&str] = &["startAt", "start_at", "startDate", "createdAt"];
const JOB_END: &[&str] = &["endAt", "end_at", "endDate", "deadline"];
const JOB_VIEWS: &[&str] = &["viewCount", "view_count", "views", "hits"];
const JOB_PHOTO: &[&str] = &["photo", "imageUrl", "thumbnail", "company.photo", "company.logo"];
const JOB_DESCRIPTION: &[&str] = &["description", "content", "body", "detail"];
const JOB_QUALIFICATIONS: &[&str] = &["qualifications", "requirements", "qualification"];
const JOB_BENEFITS: &[&str] = &["benefits", "welfare", "preferred"];

const LATITUDE: &[&str] = &["latitude", "lat", "company.latitude"];
const LONGITUDE: &[&str] = &["longitude", "lng", "lon", "company.longitude"];

const FAV_ID: &[&str] = &["id", "favoriteId", "favoriteCompanyId", "favorite_id"];
const FAV_COMPANY_ID: &[&str] = &["companyId", "company.id", "company_id"];
const FAV_COMPANY_NAME: &[&str] = &["companyName", "company.name", "company_name", "name"];
const FAV_POST_COUNT: &[&str] = &["postCount", "jobPostCount", "openPostCount", "post_count", "count"];
const FAV_PHOTO: &[&str] = &["companyPhoto", "photo", "logo", "company.photo", "company.logo"];
const FAV_INDUSTRY: &[&str] = &["industry", "company.industry"];

const COMPANY_ID: &[&str] = &["id", "companyId", "company_id"];
const COMPANY_NAME: &[&str] = &["name", "companyName", "company_name"];
const COMPANY_LOGO: &[&str] = &["logo", "logoUrl", "photo", "imageUrl"];
const COMPANY_INDUSTRY: &[&str] = &["industry", "category"];
const COMPANY_ADDRESS: &[&str] = &["address", "location", "roadAddress"];

const RESUME_ID: &[&str] = &["id", "resumeId", "resume_id"];
const RESUME_TITLE: &[&str] = &["title", "name"];
const RESUME_LOCKED: &[&str] = &["locked", "isLocked", "is_locked"];
const RESUME_UPDATED: &[&str] = &["updatedAt", "updated_at", "modifiedAt"];
const RESUME_SUMMARY: &[&str] = &["summary", "introduction", "content"];

// --- Field lookups ---

/// Dotted paths walk nested objects: `company.id`.
fn lookup<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

fn first<'a>(record: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| lookup(record, alias))
}

fn text(record: &Value, aliases: &[&str]) -> Option<String> {
    match first(record, aliases)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric parse of the first non-null alias. Non-integral or garbage values are absent.
fn int(record: &Value, aliases: &[&str]) -> Option<i64> {
    coerce_int(first(record, aliases)?)
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| integral(n.as_f64()?)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| integral(s.parse::<f64>().ok()?))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

fn float(record: &Value, aliases: &[&str]) -> Option<f64> {
    let f = match first(record, aliases)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn flag(record: &Value, aliases: &[&str]) -> bool {
    match first(record, aliases) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        Some(Value::String(s)) => matches!(s.trim(), "true" | "Y" | "y" | "1"),
        _ => false,
    }
}

fn date(record: &Value, aliases: &[&str]) -> Option<NaiveDate> {
    match first(record, aliases)? {
        Value::String(s) => parse_date(s),
        // Jackson's default LocalDate encoding: [2025, 1, 10] or [2025, 1, 10, 9, 30]
        Value::Array(parts) if parts.len() >= 3 => {
            let y = parts[0].as_i64()?;
            let m = parts[1].as_u64()?;
            let d = parts[2].as_u64()?;
            NaiveDate::from_ymd_opt(
                i32::try_from(y).ok()?,
                u32::try_from(m).ok()?,
                u32::try_from(d).ok()?,
            )
        }
        _ => None,
    }
}

/// Accepts plain dates, local date-times and RFC 3339 timestamps. Anything else is absent.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn tags(record: &Value, aliases: &[&str]) -> Vec<String> {
    match first(record, aliases) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(_) => text(item, &["name", "label"]),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn geo(record: &Value) -> Option<GeoPoint> {
    Some(GeoPoint {
        latitude: float(record, LATITUDE)?,
        longitude: float(record, LONGITUDE)?,
    })
}

// --- Adapters ---

fn posting_with_id(record: &Value, id_aliases: &[&str]) -> Option<JobPosting> {
    let id = int(record, id_aliases)?;
    Some(JobPosting {
        id,
        title: text(record, JOB_TITLE).unwrap_or_default(),
        company_id: int(record, JOB_COMPANY_ID),
        company_name: text(record, JOB_COMPANY_NAME).unwrap_or_default(),
        tech_stacks: tags(record, JOB_TECH_STACKS),
        position: text(record, JOB_POSITION).unwrap_or_default(),
        career_level: text(record, JOB_CAREER).unwrap_or_default(),
        education: text(record, JOB_EDUCATION).unwrap_or_default(),
        location: text(record, JOB_LOCATION).unwrap_or_default(),
        salary: text(record, JOB_SALARY).unwrap_or_default(),
        start_at: date(record, JOB_START),
        end_at: date(record, JOB_END),
        view_count: int(record, JOB_VIEWS).unwrap_or(0).max(0) as u64,
        photo: text(record, JOB_PHOTO),
    })
}

pub fn job_posting(record: &Value) -> Option<JobPosting> {
    posting_with_id(record, JOB_ID)
}

pub fn job_postings(payload: &Value) -> Vec<JobPosting> {
    extract_records(payload).iter().filter_map(job_posting).collect()
}

pub fn job_detail(payload: &Value) -> Option<JobDetail> {
    let record = unwrap_single(payload);
    Some(JobDetail {
        posting: job_posting(record)?,
        description: text(record, JOB_DESCRIPTION),
        qualifications: text(record, JOB_QUALIFICATIONS),
        benefits: text(record, JOB_BENEFITS),
        coordinates: geo(record),
    })
}

/// Scrap rows either nest the posting or carry it flat next to the scrap's own id.
pub fn scrapped_posting(record: &Value) -> Option<JobPosting> {
    for key in SCRAP_NESTED {
        if let Some(inner @ Value::Object(_)) = record.get(*key) {
            return job_posting(inner);
        }
    }
    posting_with_id(record, SCRAP_JOB_ID)
}

pub fn scrapped_postings(payload: &Value) -> Vec<JobPosting> {
    extract_records(payload).iter().filter_map(scrapped_posting).collect()
}

pub fn favorite_record(record: &Value) -> Option<FavoriteCompanyRecord> {
    Some(FavoriteCompanyRecord {
        id: int(record, FAV_ID),
        company_id: int(record, FAV_COMPANY_ID)?,
        company_name: text(record, FAV_COMPANY_NAME).unwrap_or_default(),
        post_count: int(record, FAV_POST_COUNT).unwrap_or(0),
        company_photo: text(record, FAV_PHOTO),
        industry: text(record, FAV_INDUSTRY),
    })
}

pub fn favorite_records(payload: &Value) -> Vec<FavoriteCompanyRecord> {
    extract_records(payload).iter().filter_map(favorite_record).collect()
}

pub fn company(payload: &Value) -> Option<Company> {
    let record = unwrap_single(payload);
    Some(Company {
        id: int(record, COMPANY_ID)?,
        name: text(record, COMPANY_NAME).unwrap_or_default(),
        logo: text(record, COMPANY_LOGO),
        industry: text(record, COMPANY_INDUSTRY),
        address: text(record, COMPANY_ADDRESS),
        coordinates: geo(record),
    })
}

pub fn resume(payload: &Value) -> Option<Resume> {
    let record = unwrap_single(payload);
    Some(Resume {
        id: int(record, RESUME_ID)?,
        title: text(record, RESUME_TITLE).unwrap_or_default(),
        locked: flag(record, RESUME_LOCKED),
        updated_at: text(record, RESUME_UPDATED),
        summary: text(record, RESUME_SUMMARY),
    })
}

pub fn resumes(payload: &Value) -> Vec<Resume> {
    extract_records(payload).iter().filter_map(resume).collect()
}

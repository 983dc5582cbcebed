//! Read paths: listing, detail, and the "my page" collections.
//!
//! Favorites and scraps are best-effort: a failure logs and yields an empty list.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::JobBoardApi;
use crate::error::ApiError;
use crate::fanout::join_ordered;
use crate::favorites;
use crate::models::{
    Company, FavoriteCompanyGroup, JobDetail, JobPosting, Resume, ScheduleNotice,
};
use crate::normalize;

pub async fn load_jobs(
    api: &dyn JobBoardApi,
    company_id: Option<i64>,
    page_size: usize,
) -> Result<Vec<JobPosting>, ApiError> {
    let payload = api.list_job_posts(company_id, page_size).await?;
    let jobs = normalize::job_postings(&payload);
    debug!("Loaded {} postings", jobs.len());
    Ok(jobs)
}

pub async fn load_job_detail(api: &dyn JobBoardApi, id: i64) -> Result<JobDetail, ApiError> {
    let payload = api.get_job_post(id).await?;
    normalize::job_detail(&payload)
        .ok_or_else(|| ApiError::Decode(format!("job post {} has no usable id", id)))
}

pub async fn load_company(api: &dyn JobBoardApi, id: i64) -> Result<Company, ApiError> {
    let payload = api.get_company(id).await?;
    normalize::company(&payload)
        .ok_or_else(|| ApiError::Decode(format!("company {} has no usable id", id)))
}

pub async fn load_favorite_groups(
    api: &dyn JobBoardApi,
    page_size: usize,
) -> Vec<FavoriteCompanyGroup> {
    match api.list_favorite_companies(0, page_size).await {
        Ok(payload) => favorites::aggregate(&normalize::favorite_records(&payload)),
        Err(e) => {
            warn!("Could not load favorite companies: {}", e);
            Vec::new()
        }
    }
}

pub async fn load_scraps(api: &dyn JobBoardApi, page_size: usize) -> Vec<JobPosting> {
    match api.list_scraps(0, page_size).await {
        Ok(payload) => normalize::scrapped_postings(&payload),
        Err(e) => {
            warn!("Could not load scraps: {}", e);
            Vec::new()
        }
    }
}

/// Upcoming deadlines among the scrapped postings, soonest first.
pub fn schedule_notices(scraps: &[JobPosting], today: NaiveDate) -> Vec<ScheduleNotice> {
    let mut notices: Vec<ScheduleNotice> = scraps
        .iter()
        .filter(|job| job.is_open_on(today))
        .filter_map(|job| {
            let end_at = job.end_at?;
            Some(ScheduleNotice {
                job_id: job.id,
                title: job.title.clone(),
                company_name: job.company_name.clone(),
                end_at,
                days_left: (end_at - today).num_days(),
            })
        })
        .collect();
    notices.sort_by(|a, b| a.end_at.cmp(&b.end_at).then(b.job_id.cmp(&a.job_id)));
    notices
}

pub async fn load_resumes(
    api: &dyn JobBoardApi,
    unlocked_only: bool,
) -> Result<Vec<Resume>, ApiError> {
    let payload = api.list_resumes(unlocked_only).await?;
    Ok(normalize::resumes(&payload))
}

/// Fetch every resume's detail concurrently. A branch that fails keeps its
/// summary record in place.
pub async fn hydrate_resumes(api: &Arc<dyn JobBoardApi>, summaries: Vec<Resume>) -> Vec<Resume> {
    let tasks: Vec<_> = summaries
        .iter()
        .map(|summary| {
            let api = Arc::clone(api);
            let id = summary.id;
            async move {
                match api.get_resume(id).await {
                    Ok(payload) => normalize::resume(&payload),
                    Err(e) => {
                        warn!("Resume {} detail unavailable: {}", id, e);
                        None
                    }
                }
            }
        })
        .collect();

    let details = join_ordered(tasks).await;
    summaries
        .into_iter()
        .zip(details)
        .map(|(summary, detail)| detail.flatten().unwrap_or(summary))
        .collect()
}

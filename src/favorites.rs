//! Favorite companies: merging duplicate rows, finding a company's open postings,
//! and the change signal other views listen to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::client::JobBoardApi;
use crate::error::ApiError;
use crate::models::{FavoriteCompanyGroup, FavoriteCompanyRecord, JobPosting};
use crate::normalize;

// --- Aggregation ---

/// One group per company, in first-seen order. Counts are summed, record ids
/// collected in input order, photo and industry taken from the first row that has them.
pub fn aggregate(records: &[FavoriteCompanyRecord]) -> Vec<FavoriteCompanyGroup> {
    let mut groups: Vec<FavoriteCompanyGroup> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for record in records {
        match index.get(&record.company_id) {
            Some(&i) => {
                let group = &mut groups[i];
                group.post_count = group.post_count.saturating_add(record.post_count);
                group.ids.extend(record.id);
                if group.company_name.is_empty() {
                    group.company_name = record.company_name.clone();
                }
                if group.company_photo.is_none() {
                    group.company_photo = record.company_photo.clone();
                }
                if group.industry.is_none() {
                    group.industry = record.industry.clone();
                }
            }
            None => {
                index.insert(record.company_id, groups.len());
                groups.push(FavoriteCompanyGroup {
                    company_id: record.company_id,
                    company_name: record.company_name.clone(),
                    post_count: record.post_count,
                    ids: record.id.into_iter().collect(),
                    company_photo: record.company_photo.clone(),
                    industry: record.industry.clone(),
                });
            }
        }
    }

    groups
}

// --- Open postings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenPostingSource {
    /// The posting list filtered by company on the server.
    CompanyFilter,
    /// The company's own posting endpoint.
    CompanyPosts,
    /// The whole posting list, filtered here.
    FullScan,
}

impl OpenPostingSource {
    pub const DEFAULT_ORDER: [OpenPostingSource; 3] = [
        OpenPostingSource::CompanyFilter,
        OpenPostingSource::CompanyPosts,
        OpenPostingSource::FullScan,
    ];
}

impl fmt::Display for OpenPostingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpenPostingSource::CompanyFilter => "company-filter",
            OpenPostingSource::CompanyPosts => "company-posts",
            OpenPostingSource::FullScan => "full-scan",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("no postings for this company")]
    Empty,
}

#[derive(Debug, Error)]
pub enum OpenPostingError {
    #[error("every lookup failed: {}", summarize(.0))]
    Exhausted(Vec<(OpenPostingSource, StrategyError)>),
}

fn summarize(failures: &[(OpenPostingSource, StrategyError)]) -> String {
    failures
        .iter()
        .map(|(source, err)| format!("{}: {}", source, err))
        .collect::<Vec<_>>()
        .join("; ")
}

async fn candidates(
    api: &dyn JobBoardApi,
    source: OpenPostingSource,
    company_id: i64,
    page_size: usize,
) -> Result<Vec<JobPosting>, ApiError> {
    let postings = match source {
        OpenPostingSource::CompanyFilter => {
            normalize::job_postings(&api.list_job_posts(Some(company_id), page_size).await?)
        }
        OpenPostingSource::CompanyPosts => {
            let mut postings =
                normalize::job_postings(&api.list_company_job_posts(company_id).await?);
            // scoped endpoint, rows may omit the company
            for posting in &mut postings {
                posting.company_id.get_or_insert(company_id);
            }
            postings
        }
        OpenPostingSource::FullScan => {
            normalize::job_postings(&api.list_job_posts(None, page_size).await?)
        }
    };
    Ok(postings)
}

/// Try each source in order; the first that yields postings for the company wins
/// and is narrowed to the ones still open on `today`.
///
/// A company with no postings anywhere is an empty result, not an error.
pub async fn resolve_open_postings(
    api: &dyn JobBoardApi,
    company_id: i64,
    sources: &[OpenPostingSource],
    page_size: usize,
    today: NaiveDate,
) -> Result<Vec<JobPosting>, OpenPostingError> {
    let mut failures: Vec<(OpenPostingSource, StrategyError)> = Vec::new();

    for &source in sources {
        match candidates(api, source, company_id, page_size).await {
            Ok(postings) => {
                let own: Vec<JobPosting> = postings
                    .into_iter()
                    .filter(|p| p.company_id == Some(company_id))
                    .collect();
                if own.is_empty() {
                    debug!("{} returned nothing for company {}", source, company_id);
                    failures.push((source, StrategyError::Empty));
                    continue;
                }
                return Ok(own.into_iter().filter(|p| p.is_open_on(today)).collect());
            }
            Err(e) => {
                warn!("Open-posting lookup via {} failed for company {}: {}", source, company_id, e);
                failures.push((source, e.into()));
            }
        }
    }

    if failures.iter().all(|(_, e)| matches!(e, StrategyError::Empty)) {
        Ok(Vec::new())
    } else {
        Err(OpenPostingError::Exhausted(failures))
    }
}

// --- Change signal ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    Added(i64),
    Removed(i64),
}

impl FavoriteChange {
    pub fn company_id(self) -> i64 {
        match self {
            FavoriteChange::Added(id) | FavoriteChange::Removed(id) => id,
        }
    }
}

/// Explicit publish/subscribe for favorite changes. A subscription ends when its
/// receiver is dropped.
#[derive(Debug, Clone)]
pub struct FavoritesBus {
    sender: broadcast::Sender<FavoriteChange>,
}

impl Default for FavoritesBus {
    fn default() -> Self {
        Self::new()
    }
}

impl FavoritesBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(32);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FavoriteChange> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers were told. Zero is fine.
    pub fn notify(&self, change: FavoriteChange) -> usize {
        self.sender.send(change).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

//! User-initiated writes.
//!
//! Toggles flip local state first and revert it if the server refuses. Every
//! failure surfaces as an `ActionError`, except view counting which is fire-and-forget.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::JobBoardApi;
use crate::error::{ActionError, ApiError};
use crate::fanout::join_ordered;
use crate::favorites::{FavoriteChange, FavoritesBus};
use crate::models::{FavoriteCompanyGroup, Resume, ResumeDraft};
use crate::normalize;
use crate::window::ListingView;

/// Local view of which ids the user has marked (favorite companies or scrapped jobs).
#[derive(Debug, Clone, Default)]
pub struct MembershipSet {
    ids: HashSet<i64>,
}

impl MembershipSet {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns whether `id` is a member afterwards.
    fn flip(&mut self, id: i64) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }
}

/// Returns whether the company is now a favorite.
pub async fn toggle_favorite(
    api: &dyn JobBoardApi,
    favorites: &mut MembershipSet,
    bus: &FavoritesBus,
    company_id: i64,
) -> Result<bool, ActionError> {
    let now_member = favorites.flip(company_id);
    let outcome = if now_member {
        api.add_favorite_company(company_id).await
    } else {
        api.remove_favorite_company(company_id).await
    };

    if let Err(e) = outcome {
        favorites.flip(company_id);
        warn!("Favorite toggle for company {} failed: {}", company_id, e);
        return Err(e.into());
    }

    let change = if now_member {
        FavoriteChange::Added(company_id)
    } else {
        FavoriteChange::Removed(company_id)
    };
    let told = bus.notify(change);
    info!("Favorite company {} {:?} ({} listeners)", company_id, change, told);
    Ok(now_member)
}

/// Returns whether the posting is now scrapped.
pub async fn toggle_scrap(
    api: &dyn JobBoardApi,
    scraps: &mut MembershipSet,
    job_id: i64,
) -> Result<bool, ActionError> {
    let now_member = scraps.flip(job_id);
    let outcome = if now_member {
        api.add_scrap(job_id).await
    } else {
        api.remove_scrap(job_id).await
    };

    match outcome {
        Ok(()) => {
            info!("Scrap for job {} set to {}", job_id, now_member);
            Ok(now_member)
        }
        Err(e) => {
            scraps.flip(job_id);
            warn!("Scrap toggle for job {} failed: {}", job_id, e);
            Err(e.into())
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct GroupRemoval {
    pub removed: Vec<i64>,
    pub failed: Vec<i64>,
}

impl GroupRemoval {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Delete every favorite record behind an aggregated company entry.
///
/// Records without ids fall back to removal by company id. The bus hears about
/// the company once, if anything was removed.
pub async fn remove_favorite_group(
    api: &Arc<dyn JobBoardApi>,
    group: &FavoriteCompanyGroup,
    bus: &FavoritesBus,
) -> GroupRemoval {
    let mut removal = GroupRemoval::default();

    if group.ids.is_empty() {
        match api.remove_favorite_company(group.company_id).await {
            Ok(()) => removal.removed.push(group.company_id),
            Err(e) => {
                warn!("Could not remove favorite company {}: {}", group.company_id, e);
                removal.failed.push(group.company_id);
            }
        }
    } else {
        let tasks: Vec<_> = group
            .ids
            .iter()
            .map(|&record_id| {
                let api = Arc::clone(api);
                async move { api.remove_favorite_record(record_id).await }
            })
            .collect();

        for (&record_id, result) in group.ids.iter().zip(join_ordered(tasks).await) {
            match result {
                Some(Ok(())) => removal.removed.push(record_id),
                Some(Err(e)) => {
                    warn!("Could not remove favorite record {}: {}", record_id, e);
                    removal.failed.push(record_id);
                }
                None => removal.failed.push(record_id),
            }
        }
    }

    if !removal.removed.is_empty() {
        bus.notify(FavoriteChange::Removed(group.company_id));
    }
    removal
}

pub async fn apply(
    api: &dyn JobBoardApi,
    job_id: i64,
    resume_id: Option<i64>,
) -> Result<(), ActionError> {
    let resume_id = resume_id
        .ok_or_else(|| ActionError::Validation("select a resume before applying".to_string()))?;
    api.apply(job_id, resume_id).await?;
    info!("Applied to job {} with resume {}", job_id, resume_id);
    Ok(())
}

/// Bump the local count, then tell the server. The local count stays bumped
/// either way. Returns the new local count, or None if the posting is not loaded.
pub async fn record_view(api: &dyn JobBoardApi, listing: &mut ListingView, job_id: i64) -> Option<u64> {
    let count = listing.increment_view(job_id);
    if let Err(e) = api.increment_view(job_id).await {
        warn!("View count for job {} not recorded: {}", job_id, e);
    } else {
        debug!("View recorded for job {}", job_id);
    }
    count
}

// --- Resumes ---

fn validate(draft: &ResumeDraft) -> Result<(), ActionError> {
    if draft.title.trim().is_empty() {
        return Err(ActionError::Validation("resume title is required".to_string()));
    }
    Ok(())
}

fn decode_resume(payload: &serde_json::Value) -> Result<Resume, ActionError> {
    normalize::resume(payload)
        .ok_or_else(|| ActionError::Failed(ApiError::Decode("resume without id".to_string())))
}

pub async fn create_resume(api: &dyn JobBoardApi, draft: &ResumeDraft) -> Result<Resume, ActionError> {
    validate(draft)?;
    let payload = api.create_resume(draft).await?;
    let resume = decode_resume(&payload)?;
    info!("Created resume {}", resume.id);
    Ok(resume)
}

pub async fn update_resume(
    api: &dyn JobBoardApi,
    id: i64,
    draft: &ResumeDraft,
) -> Result<Resume, ActionError> {
    validate(draft)?;
    let payload = api.update_resume(id, draft).await?;
    decode_resume(&payload)
}

pub async fn delete_resume(api: &dyn JobBoardApi, id: i64) -> Result<(), ActionError> {
    api.delete_resume(id).await?;
    info!("Deleted resume {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, Failure};
    use crate::window::LayoutMode;
    use serde_json::json;

    #[tokio::test]
    async fn test_toggle_favorite_adds_and_notifies() {
        let api = FakeApi::new();
        let bus = FavoritesBus::new();
        let mut rx = bus.subscribe();
        let mut favorites = MembershipSet::default();

        let now = toggle_favorite(&api, &mut favorites, &bus, 7).await.unwrap();
        assert!(now);
        assert!(favorites.contains(7));
        assert_eq!(api.calls("add_favorite_company:7"), 1);
        assert_eq!(rx.try_recv().unwrap(), FavoriteChange::Added(7));

        let now = toggle_favorite(&api, &mut favorites, &bus, 7).await.unwrap();
        assert!(!now);
        assert!(favorites.is_empty());
        assert_eq!(rx.try_recv().unwrap(), FavoriteChange::Removed(7));
    }

    #[tokio::test]
    async fn test_toggle_favorite_reverts_on_failure() {
        let api = FakeApi::new().fail("add_favorite_company", Failure::Unauthorized);
        let bus = FavoritesBus::new();
        let mut rx = bus.subscribe();
        let mut favorites = MembershipSet::default();

        let err = toggle_favorite(&api, &mut favorites, &bus, 7).await.unwrap_err();
        assert!(matches!(err, ActionError::LoginRequired));
        assert!(!favorites.contains(7));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_toggle_scrap_reverts_on_failure() {
        let api = FakeApi::new().fail("remove_scrap:3", Failure::Server);
        let mut scraps = MembershipSet::new([3, 4]);

        let err = toggle_scrap(&api, &mut scraps, 3).await.unwrap_err();
        assert!(matches!(err, ActionError::Failed(_)));
        assert!(scraps.contains(3));

        assert!(!toggle_scrap(&api, &mut scraps, 4).await.unwrap());
        assert!(toggle_scrap(&api, &mut scraps, 5).await.unwrap());
        assert_eq!(scraps.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_favorite_group_reports_failures() {
        let fake = Arc::new(FakeApi::new().fail("remove_favorite_record:11", Failure::Server));
        let api: Arc<dyn JobBoardApi> = fake.clone();
        let bus = FavoritesBus::new();
        let mut rx = bus.subscribe();
        let group = FavoriteCompanyGroup {
            company_id: 1,
            company_name: "Acme".to_string(),
            post_count: 5,
            ids: vec![10, 11, 12],
            company_photo: None,
            industry: None,
        };

        let removal = remove_favorite_group(&api, &group, &bus).await;
        assert_eq!(removal.removed, vec![10, 12]);
        assert_eq!(removal.failed, vec![11]);
        assert!(!removal.is_complete());
        assert_eq!(rx.try_recv().unwrap(), FavoriteChange::Removed(1));
    }

    #[tokio::test]
    async fn test_remove_group_without_record_ids() {
        let fake = Arc::new(FakeApi::new());
        let api: Arc<dyn JobBoardApi> = fake.clone();
        let group = FavoriteCompanyGroup {
            company_id: 4,
            company_name: "Solo".to_string(),
            post_count: 0,
            ids: vec![],
            company_photo: None,
            industry: None,
        };

        let removal = remove_favorite_group(&api, &group, &FavoritesBus::new()).await;
        assert!(removal.is_complete());
        assert_eq!(fake.calls("remove_favorite_company:4"), 1);
        assert_eq!(fake.calls("remove_favorite_record"), 0);
    }

    #[tokio::test]
    async fn test_apply_requires_resume() {
        let api = FakeApi::new();
        let err = apply(&api, 1, None).await.unwrap_err();
        assert!(matches!(err, ActionError::Validation(_)));
        assert_eq!(api.calls("apply"), 0);

        apply(&api, 1, Some(9)).await.unwrap();
        assert_eq!(api.calls("apply:1"), 1);
        assert_eq!(api.calls("apply_resume:9"), 1);
    }

    #[tokio::test]
    async fn test_apply_unauthorized() {
        let api = FakeApi::new().fail("apply", Failure::Unauthorized);
        let err = apply(&api, 1, Some(9)).await.unwrap_err();
        assert!(matches!(err, ActionError::LoginRequired));
    }

    #[tokio::test]
    async fn test_record_view_survives_failure() {
        let api = FakeApi::new().fail("increment_view", Failure::Server);
        let jobs = normalize::job_postings(&json!([{"id": 1, "title": "A", "viewCount": 4}]));
        let mut listing = ListingView::with_jobs(LayoutMode::Paged, jobs);

        assert_eq!(record_view(&api, &mut listing, 1).await, Some(5));
        assert_eq!(listing.job(1).unwrap().view_count, 5);
        assert_eq!(record_view(&api, &mut listing, 99).await, None);
    }

    #[tokio::test]
    async fn test_resume_lifecycle() {
        let api = FakeApi::new();
        let draft = ResumeDraft {
            title: "Backend".to_string(),
            summary: Some("Rust".to_string()),
        };
        let created = create_resume(&api, &draft).await.unwrap();
        assert_eq!(created.id, 100);
        assert_eq!(created.summary.as_deref(), Some("Rust"));

        let updated = update_resume(&api, 100, &draft).await.unwrap();
        assert_eq!(updated.title, "Backend");

        delete_resume(&api, 100).await.unwrap();
        assert_eq!(api.calls("delete_resume:100"), 1);

        let blank = ResumeDraft {
            title: "  ".to_string(),
            summary: None,
        };
        assert!(matches!(
            create_resume(&api, &blank).await,
            Err(ActionError::Validation(_))
        ));
        assert_eq!(api.calls("create_resume"), 1);
    }
}

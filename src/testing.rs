//! In-memory `JobBoardApi` for tests: canned payloads, call counting, injected failures.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::client::JobBoardApi;
use crate::error::ApiError;
use crate::models::ResumeDraft;

#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unauthorized,
    Server,
    NotFound,
}

impl Failure {
    fn to_error(self) -> ApiError {
        match self {
            Failure::Unauthorized => ApiError::Unauthorized,
            Failure::Server => ApiError::Status {
                status: 500,
                body: "internal".to_string(),
            },
            Failure::NotFound => ApiError::NotFound("fake".to_string()),
        }
    }
}

#[derive(Default)]
pub struct FakeApi {
    postings: Vec<Value>,
    company_postings: HashMap<i64, Value>,
    companies: HashMap<i64, Value>,
    favorites: Value,
    scraps: Value,
    resumes: Vec<Value>,
    failures: Mutex<HashMap<String, Failure>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_postings(mut self, postings: Vec<Value>) -> Self {
        self.postings = postings;
        self
    }

    pub fn with_company_postings(mut self, company_id: i64, payload: Value) -> Self {
        self.company_postings.insert(company_id, payload);
        self
    }

    pub fn with_company(mut self, company: Value) -> Self {
        if let Some(id) = company.get("id").and_then(Value::as_i64) {
            self.companies.insert(id, company);
        }
        self
    }

    pub fn with_favorites(mut self, payload: Value) -> Self {
        self.favorites = payload;
        self
    }

    pub fn with_scraps(mut self, payload: Value) -> Self {
        self.scraps = payload;
        self
    }

    pub fn with_resumes(mut self, resumes: Vec<Value>) -> Self {
        self.resumes = resumes;
        self
    }

    /// Fail `method` (every call) or `method:arg` (calls with that argument).
    pub fn fail(self, key: &str, failure: Failure) -> Self {
        self.failures.lock().unwrap().insert(key.to_string(), failure);
        self
    }

    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn hit(&self, method: &str, arg: Option<i64>) -> Result<(), ApiError> {
        let keyed = arg.map(|a| format!("{}:{}", method, a));
        {
            let mut calls = self.calls.lock().unwrap();
            *calls.entry(method.to_string()).or_default() += 1;
            if let Some(k) = &keyed {
                *calls.entry(k.clone()).or_default() += 1;
            }
        }
        let failures = self.failures.lock().unwrap();
        let failure = keyed
            .as_ref()
            .and_then(|k| failures.get(k))
            .or_else(|| failures.get(method));
        match failure {
            Some(f) => Err(f.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl JobBoardApi for FakeApi {
    async fn list_job_posts(&self, company_id: Option<i64>, size: usize) -> Result<Value, ApiError> {
        self.hit("list_job_posts", company_id)?;
        let items: Vec<Value> = self
            .postings
            .iter()
            .filter(|p| match company_id {
                Some(id) => p.get("companyId").and_then(Value::as_i64) == Some(id),
                None => true,
            })
            .take(size)
            .cloned()
            .collect();
        Ok(json!({ "content": items }))
    }

    async fn get_job_post(&self, id: i64) -> Result<Value, ApiError> {
        self.hit("get_job_post", Some(id))?;
        self.postings
            .iter()
            .find(|p| p.get("id").and_then(Value::as_i64) == Some(id))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("job {}", id)))
    }

    async fn increment_view(&self, id: i64) -> Result<(), ApiError> {
        self.hit("increment_view", Some(id))
    }

    async fn get_company(&self, id: i64) -> Result<Value, ApiError> {
        self.hit("get_company", Some(id))?;
        self.companies
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("company {}", id)))
    }

    async fn list_company_job_posts(&self, company_id: i64) -> Result<Value, ApiError> {
        self.hit("list_company_job_posts", Some(company_id))?;
        Ok(self
            .company_postings
            .get(&company_id)
            .cloned()
            .unwrap_or_else(|| json!([])))
    }

    async fn list_favorite_companies(&self, _page: usize, _size: usize) -> Result<Value, ApiError> {
        self.hit("list_favorite_companies", None)?;
        Ok(self.favorites.clone())
    }

    async fn add_favorite_company(&self, company_id: i64) -> Result<(), ApiError> {
        self.hit("add_favorite_company", Some(company_id))
    }

    async fn remove_favorite_company(&self, company_id: i64) -> Result<(), ApiError> {
        self.hit("remove_favorite_company", Some(company_id))
    }

    async fn remove_favorite_record(&self, record_id: i64) -> Result<(), ApiError> {
        self.hit("remove_favorite_record", Some(record_id))
    }

    async fn list_scraps(&self, _page: usize, _size: usize) -> Result<Value, ApiError> {
        self.hit("list_scraps", None)?;
        Ok(self.scraps.clone())
    }

    async fn add_scrap(&self, job_id: i64) -> Result<(), ApiError> {
        self.hit("add_scrap", Some(job_id))
    }

    async fn remove_scrap(&self, job_id: i64) -> Result<(), ApiError> {
        self.hit("remove_scrap", Some(job_id))
    }

    async fn list_resumes(&self, _unlocked_only: bool) -> Result<Value, ApiError> {
        self.hit("list_resumes", None)?;
        Ok(json!({ "data": self.resumes.clone() }))
    }

    async fn get_resume(&self, id: i64) -> Result<Value, ApiError> {
        self.hit("get_resume", Some(id))?;
        self.resumes
            .iter()
            .find(|r| r.get("id").and_then(Value::as_i64) == Some(id))
            .map(|r| {
                let mut detail = r.clone();
                detail["summary"] = json!(format!("detail of {}", id));
                detail
            })
            .ok_or_else(|| ApiError::NotFound(format!("resume {}", id)))
    }

    async fn create_resume(&self, draft: &ResumeDraft) -> Result<Value, ApiError> {
        self.hit("create_resume", None)?;
        Ok(json!({ "id": 100, "title": draft.title, "summary": draft.summary }))
    }

    async fn update_resume(&self, id: i64, draft: &ResumeDraft) -> Result<Value, ApiError> {
        self.hit("update_resume", Some(id))?;
        Ok(json!({ "id": id, "title": draft.title, "summary": draft.summary }))
    }

    async fn delete_resume(&self, id: i64) -> Result<(), ApiError> {
        self.hit("delete_resume", Some(id))
    }

    async fn apply(&self, job_post_id: i64, resume_id: i64) -> Result<(), ApiError> {
        self.hit("apply", Some(job_post_id))?;
        self.hit("apply_resume", Some(resume_id))
    }
}

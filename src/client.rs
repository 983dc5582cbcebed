//! Remote job-board API. Reads hand back raw JSON for `normalize` to sort out.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::models::ResumeDraft;

const JOB_POSTS_ENDPOINT: &str = "/job-posts";
const COMPANIES_ENDPOINT: &str = "/companies";
const FAVORITE_COMPANIES_ENDPOINT: &str = "/favorites/companies";
const FAVORITES_ENDPOINT: &str = "/favorites";
const SCRAPS_ENDPOINT: &str = "/scraps";
const RESUMES_ENDPOINT: &str = "/resumes";
const APPLICATIONS_ENDPOINT: &str = "/applications";

#[async_trait]
pub trait JobBoardApi: Send + Sync {
    async fn list_job_posts(&self, company_id: Option<i64>, size: usize) -> Result<Value, ApiError>;
    async fn get_job_post(&self, id: i64) -> Result<Value, ApiError>;
    async fn increment_view(&self, id: i64) -> Result<(), ApiError>;

    async fn get_company(&self, id: i64) -> Result<Value, ApiError>;
    async fn list_company_job_posts(&self, company_id: i64) -> Result<Value, ApiError>;

    async fn list_favorite_companies(&self, page: usize, size: usize) -> Result<Value, ApiError>;
    async fn add_favorite_company(&self, company_id: i64) -> Result<(), ApiError>;
    async fn remove_favorite_company(&self, company_id: i64) -> Result<(), ApiError>;
    async fn remove_favorite_record(&self, record_id: i64) -> Result<(), ApiError>;

    async fn list_scraps(&self, page: usize, size: usize) -> Result<Value, ApiError>;
    async fn add_scrap(&self, job_id: i64) -> Result<(), ApiError>;
    async fn remove_scrap(&self, job_id: i64) -> Result<(), ApiError>;

    async fn list_resumes(&self, unlocked_only: bool) -> Result<Value, ApiError>;
    async fn get_resume(&self, id: i64) -> Result<Value, ApiError>;
    async fn create_resume(&self, draft: &ResumeDraft) -> Result<Value, ApiError>;
    async fn update_resume(&self, id: i64, draft: &ResumeDraft) -> Result<Value, ApiError>;
    async fn delete_resume(&self, id: i64) -> Result<(), ApiError>;

    async fn apply(&self, job_post_id: i64, resume_id: i64) -> Result<(), ApiError>;
}

pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value, ApiError> {
        let response = check_status(builder.send().await?).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(response.url().path().to_string())),
        _ => {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ApiError::Status { status: status.as_u16(), body })
        }
    }
}

#[async_trait]
impl JobBoardApi for HttpClient {
    async fn list_job_posts(&self, company_id: Option<i64>, size: usize) -> Result<Value, ApiError> {
        let mut query = vec![("size", size.to_string())];
        if let Some(id) = company_id {
            query.push(("companyId", id.to_string()));
        }
        self.send_json(self.request(Method::GET, JOB_POSTS_ENDPOINT).query(&query))
            .await
    }

    async fn get_job_post(&self, id: i64) -> Result<Value, ApiError> {
        let path = format!("{}/{}", JOB_POSTS_ENDPOINT, id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn increment_view(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}/view", JOB_POSTS_ENDPOINT, id);
        self.send_empty(self.request(Method::POST, &path)).await
    }

    async fn get_company(&self, id: i64) -> Result<Value, ApiError> {
        let path = format!("{}/{}", COMPANIES_ENDPOINT, id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn list_company_job_posts(&self, company_id: i64) -> Result<Value, ApiError> {
        let path = format!("{}/{}/job-posts", COMPANIES_ENDPOINT, company_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn list_favorite_companies(&self, page: usize, size: usize) -> Result<Value, ApiError> {
        let query = [("page", page), ("size", size)];
        self.send_json(self.request(Method::GET, FAVORITE_COMPANIES_ENDPOINT).query(&query))
            .await
    }

    async fn add_favorite_company(&self, company_id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}", FAVORITE_COMPANIES_ENDPOINT, company_id);
        self.send_empty(self.request(Method::POST, &path)).await
    }

    async fn remove_favorite_company(&self, company_id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}", FAVORITE_COMPANIES_ENDPOINT, company_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn remove_favorite_record(&self, record_id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}", FAVORITES_ENDPOINT, record_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn list_scraps(&self, page: usize, size: usize) -> Result<Value, ApiError> {
        let query = [("page", page), ("size", size)];
        self.send_json(self.request(Method::GET, SCRAPS_ENDPOINT).query(&query))
            .await
    }

    async fn add_scrap(&self, job_id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}", SCRAPS_ENDPOINT, job_id);
        self.send_empty(self.request(Method::POST, &path)).await
    }

    async fn remove_scrap(&self, job_id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}", SCRAPS_ENDPOINT, job_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn list_resumes(&self, unlocked_only: bool) -> Result<Value, ApiError> {
        let mut builder = self.request(Method::GET, RESUMES_ENDPOINT);
        if unlocked_only {
            builder = builder.query(&[("unlockedOnly", "true")]);
        }
        self.send_json(builder).await
    }

    async fn get_resume(&self, id: i64) -> Result<Value, ApiError> {
        let path = format!("{}/{}", RESUMES_ENDPOINT, id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn create_resume(&self, draft: &ResumeDraft) -> Result<Value, ApiError> {
        self.send_json(self.request(Method::POST, RESUMES_ENDPOINT).json(draft))
            .await
    }

    async fn update_resume(&self, id: i64, draft: &ResumeDraft) -> Result<Value, ApiError> {
        let path = format!("{}/{}", RESUMES_ENDPOINT, id);
        self.send_json(self.request(Method::PUT, &path).json(draft)).await
    }

    async fn delete_resume(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("{}/{}", RESUMES_ENDPOINT, id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn apply(&self, job_post_id: i64, resume_id: i64) -> Result<(), ApiError> {
        let payload = json!({
            "jobPostId": job_post_id,
            "resumeId": resume_id
        });
        self.send_empty(self.request(Method::POST, APPLICATIONS_ENDPOINT).json(&payload))
            .await
    }
}

use std::cmp::Ordering;

use crate::models::{FilterState, JobPosting, SortMode};
use crate::tech_stack::TechStackMatcher;

/// Experience filter value meaning "any posting that asks for years of experience".
pub const EXPERIENCED: &str = "경력";
/// Year unit as it appears in career levels such as "3년 이상".
const YEAR_MARKER: &str = "년";

fn lowered(value: &str) -> String {
    value.trim().to_lowercase()
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Predicate built once per filter pass. Every non-empty criterion must hold.
pub struct JobFilter {
    company_id: Option<i64>,
    search: String,
    position: String,
    experience: String,
    education: String,
    location: String,
    stacks: TechStackMatcher,
}

impl JobFilter {
    pub fn new(state: &FilterState) -> Self {
        Self {
            company_id: state.company_id,
            search: lowered(&state.search),
            position: lowered(&state.position),
            experience: lowered(&state.experience),
            education: lowered(&state.education),
            location: lowered(&state.location),
            stacks: TechStackMatcher::new(&state.tech_stacks),
        }
    }

    pub fn matches(&self, job: &JobPosting) -> bool {
        if let Some(company_id) = self.company_id {
            if job.company_id != Some(company_id) {
                return false;
            }
        }

        if !self.search.is_empty() {
            let hit = [&job.title, &job.company_name, &job.position, &job.location]
                .iter()
                .any(|field| contains_ci(field, &self.search));
            if !hit {
                return false;
            }
        }

        if !self.position.is_empty() && !contains_ci(&job.position, &self.position) {
            return false;
        }

        if !self.experience.is_empty() {
            let ok = if self.experience == EXPERIENCED {
                job.career_level.contains(YEAR_MARKER)
            } else {
                contains_ci(&job.career_level, &self.experience)
            };
            if !ok {
                return false;
            }
        }

        if !self.education.is_empty() && !contains_ci(&job.education, &self.education) {
            return false;
        }

        if !self.location.is_empty() && !contains_ci(&job.location, &self.location) {
            return false;
        }

        self.stacks.matches(job)
    }
}

#[cfg(test)]
pub fn matches(job: &JobPosting, state: &FilterState) -> bool {
    JobFilter::new(state).matches(job)
}

/// `Recent`: higher id first. `Deadline`: earliest end date first, open-ended
/// postings last, two open-ended postings by higher id first.
pub fn compare(a: &JobPosting, b: &JobPosting, mode: SortMode) -> Ordering {
    match mode {
        SortMode::Recent => b.id.cmp(&a.id),
        SortMode::Deadline => match (a.end_at, b.end_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.id.cmp(&a.id),
        },
    }
}

/// Indices into `jobs` of the postings that pass `state`, in display order.
/// The sort is stable, so ties keep their collection order.
pub fn select(jobs: &[JobPosting], state: &FilterState) -> Vec<usize> {
    let filter = JobFilter::new(state);
    let mut picked: Vec<usize> = jobs
        .iter()
        .enumerate()
        .filter(|(_, job)| filter.matches(job))
        .map(|(i, _)| i)
        .collect();
    picked.sort_by(|&a, &b| compare(&jobs[a], &jobs[b], state.sort));
    picked
}

#[cfg(test)]
pub fn apply<'a>(jobs: &'a [JobPosting], state: &FilterState) -> Vec<&'a JobPosting> {
    select(jobs, state).into_iter().map(|i| &jobs[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn job(id: i64) -> JobPosting {
        JobPosting {
            id,
            title: format!("Job {}", id),
            company_id: Some(1),
            company_name: "Acme".to_string(),
            tech_stacks: Vec::new(),
            position: "Backend".to_string(),
            career_level: "신입".to_string(),
            education: "학력무관".to_string(),
            location: "Seoul Gangnam".to_string(),
            salary: String::new(),
            start_at: None,
            end_at: None,
            view_count: 0,
            photo: None,
        }
    }

    fn ids(jobs: &[&JobPosting]) -> Vec<i64> {
        jobs.iter().map(|j| j.id).collect()
    }

    #[test]
    fn test_recent_sort_descending_id() {
        let jobs: Vec<JobPosting> = [5, 1, 9, 3].into_iter().map(job).collect();
        let state = FilterState::default();
        assert_eq!(ids(&apply(&jobs, &state)), vec![9, 5, 3, 1]);
    }

    #[test]
    fn test_deadline_sort_undated_last() {
        let mut a = job(1);
        a.end_at = NaiveDate::from_ymd_opt(2025, 1, 10);
        let b = job(2);
        let mut c = job(3);
        c.end_at = NaiveDate::from_ymd_opt(2024, 6, 1);

        let jobs = vec![a, b, c];
        let state = FilterState { sort: SortMode::Deadline, ..Default::default() };
        assert_eq!(ids(&apply(&jobs, &state)), vec![3, 1, 2]);
    }

    #[test]
    fn test_deadline_sort_undated_pair_falls_back_to_id() {
        let jobs = vec![job(4), job(8), job(6)];
        let state = FilterState { sort: SortMode::Deadline, ..Default::default() };
        assert_eq!(ids(&apply(&jobs, &state)), vec![8, 6, 4]);
    }

    #[test]
    fn test_deadline_sort_equal_dates_keep_input_order() {
        let day = NaiveDate::from_ymd_opt(2025, 2, 1);
        let mut x = job(1);
        x.end_at = day;
        let mut y = job(7);
        y.end_at = day;
        let mut z = job(3);
        z.end_at = day;

        let jobs = vec![x, y, z];
        let state = FilterState { sort: SortMode::Deadline, ..Default::default() };
        assert_eq!(ids(&apply(&jobs, &state)), vec![1, 7, 3]);
    }

    #[test]
    fn test_search_hits_any_field() {
        let mut by_title = job(1);
        by_title.title = "Rust Engineer".to_string();
        let mut by_company = job(2);
        by_company.company_name = "RustCorp".to_string();
        let mut by_location = job(3);
        by_location.location = "Trust Tower".to_string();
        let other = job(4);
        let mut by_position = job(5);
        by_position.position = "Rust Backend".to_string();

        let jobs = vec![by_title, by_company, by_location, other, by_position];
        let state = FilterState { search: "RUST".to_string(), ..Default::default() };
        assert_eq!(ids(&apply(&jobs, &state)), vec![5, 3, 2, 1]);
    }

    #[test]
    fn test_experience_special_value() {
        let mut senior = job(1);
        senior.career_level = "경력 3년 이상".to_string();
        let mut years_only = job(2);
        years_only.career_level = "5년".to_string();
        let newcomer = job(3);

        let jobs = vec![senior, years_only, newcomer];
        let state = FilterState { experience: EXPERIENCED.to_string(), ..Default::default() };
        assert_eq!(ids(&apply(&jobs, &state)), vec![2, 1]);

        let state = FilterState { experience: "신입".to_string(), ..Default::default() };
        assert_eq!(ids(&apply(&jobs, &state)), vec![3]);
    }

    #[test]
    fn test_company_scope() {
        let mut other = job(2);
        other.company_id = Some(2);
        let mut unknown = job(3);
        unknown.company_id = None;

        let jobs = vec![job(1), other, unknown];
        let state = FilterState { company_id: Some(2), ..Default::default() };
        assert_eq!(ids(&apply(&jobs, &state)), vec![2]);
    }

    #[test]
    fn test_conjunction_across_criteria() {
        let mut a = job(1);
        a.tech_stacks = vec!["Java, Spring".to_string()];
        let mut b = job(2);
        b.tech_stacks = vec!["Java".to_string()];
        b.location = "Busan".to_string();
        let mut c = job(3);
        c.tech_stacks = vec!["Go".to_string()];

        let jobs = vec![a.clone(), b, c];
        let state = FilterState {
            location: "seoul".to_string(),
            tech_stacks: ["Java".to_string()].into(),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&jobs, &state)), vec![1]);

        // each criterion alone agrees with the combined verdict
        assert!(matches(&a, &FilterState { location: "seoul".to_string(), ..Default::default() }));
        assert!(matches(&a, &FilterState { tech_stacks: ["Java".to_string()].into(), ..Default::default() }));
    }

    #[test]
    fn test_unsatisfiable_criterion_empties_result() {
        let jobs: Vec<JobPosting> = (1..=5).map(job).collect();
        let state = FilterState {
            search: "Acme".to_string(),
            education: "박사".to_string(),
            ..Default::default()
        };
        assert!(apply(&jobs, &state).is_empty());

        let state = FilterState { position: "Frontend".to_string(), ..Default::default() };
        assert!(apply(&jobs, &state).is_empty());
    }

    #[test]
    fn test_whitespace_criteria_are_ignored() {
        let jobs: Vec<JobPosting> = (1..=3).map(job).collect();
        let state = FilterState { position: "   ".to_string(), ..Default::default() };
        assert_eq!(apply(&jobs, &state).len(), 3);
    }

    #[test]
    fn test_apply_is_idempotent_and_pure() {
        let jobs: Vec<JobPosting> = [2, 7, 4].into_iter().map(job).collect();
        let before = jobs.clone();
        let state = FilterState { search: "job".to_string(), ..Default::default() };

        let first = ids(&apply(&jobs, &state));
        let second = ids(&apply(&jobs, &state));
        assert_eq!(first, second);
        assert_eq!(jobs, before);
    }
}

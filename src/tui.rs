use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;

use crate::actions::{self, MembershipSet};
use crate::assets::LogoCache;
use crate::client::JobBoardApi;
use crate::config::Config;
use crate::error::ApiError;
use crate::favorites::{FavoriteChange, FavoritesBus};
use crate::fetch;
use crate::models::{FilterState, JobPosting};
use crate::window::{LayoutMode, ListingView};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

struct AppState {
    listing: ListingView,
    selected: usize,
    scroll_offset: u16,
    logos: LogoCache,
    favorites: MembershipSet,
    status: String,
}

impl AppState {
    fn new(mode: LayoutMode, filter: FilterState) -> Self {
        let mut listing = ListingView::new(mode);
        listing.set_filter(filter);
        Self {
            listing,
            selected: 0,
            scroll_offset: 0,
            logos: LogoCache::new(),
            favorites: MembershipSet::default(),
            status: String::new(),
        }
    }

    fn displayed_len(&self) -> usize {
        self.listing.displayed().len()
    }

    fn current_job(&self) -> Option<&JobPosting> {
        self.listing.displayed().get(self.selected).copied()
    }

    fn next(&mut self) {
        let len = self.displayed_len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    /// Cursor on the last row counts as the sentinel coming into view.
    fn reached_end(&mut self) -> bool {
        let len = self.displayed_len();
        len > 0 && self.selected == len - 1 && self.listing.on_visible()
    }

    fn reset_cursor(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    async fn refresh_logos(&mut self, api: &Arc<dyn JobBoardApi>) {
        let ids = self.listing.displayed_company_ids();
        let fetched = self.logos.hydrate(api, &ids).await;
        if fetched > 0 {
            debug!("Hydrated logos for {} companies", fetched);
        }
    }

    async fn reload(&mut self, api: &Arc<dyn JobBoardApi>, page_size: usize) -> Result<(), ApiError> {
        let ticket = self.listing.begin_fetch();
        let company = self.listing.filter().company_id;
        match fetch::load_jobs(api.as_ref(), company, page_size).await {
            Ok(jobs) => {
                if self.listing.apply_fetch(ticket, jobs) {
                    self.status = format!("Loaded {} postings", self.listing.jobs().len());
                }
                self.selected = self.selected.min(self.displayed_len().saturating_sub(1));
                Ok(())
            }
            Err(e) => {
                self.listing.fail_fetch(ticket);
                Err(e)
            }
        }
    }

    async fn reload_favorites(&mut self, api: &Arc<dyn JobBoardApi>, page_size: usize) {
        let groups = fetch::load_favorite_groups(api.as_ref(), page_size).await;
        self.favorites = MembershipSet::new(groups.iter().map(|g| g.company_id));
    }
}

/// Everything the browser shows before the first frame. The listing itself must
/// load; favorites and logos are best-effort.
async fn load_state(
    api: &Arc<dyn JobBoardApi>,
    config: &Config,
    filter: FilterState,
    mode: LayoutMode,
) -> Result<AppState> {
    let mut state = AppState::new(mode, filter);
    state
        .reload(api, config.page_size)
        .await
        .context("Failed to load job postings")?;
    state.reload_favorites(api, config.favorites_page_size).await;
    state.refresh_logos(api).await;
    Ok(state)
}

pub async fn run_browse(
    api: Arc<dyn JobBoardApi>,
    config: &Config,
    filter: FilterState,
    mode: LayoutMode,
) -> Result<()> {
    let bus = FavoritesBus::new();
    let mut changes = bus.subscribe();

    let mut state = load_state(&api, config, filter, mode).await?;
    if state.listing.jobs().is_empty() {
        println!("No job postings found.");
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, &api, config, &bus, &mut changes).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    api: &Arc<dyn JobBoardApi>,
    config: &Config,
    bus: &FavoritesBus,
    changes: &mut broadcast::Receiver<FavoriteChange>,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(Some(state.selected));
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if drain_changes(changes) {
            state
                .reload_favorites(api, config.favorites_page_size)
                .await;
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        let mut subset_changed = false;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => {
                state.next();
                if state.listing.mode() == LayoutMode::Incremental && state.reached_end() {
                    subset_changed = true;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => state.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
            KeyCode::Right if state.listing.mode() == LayoutMode::Paged => {
                let before = state.listing.current_page();
                subset_changed = state.listing.next_page() != before;
            }
            KeyCode::Left if state.listing.mode() == LayoutMode::Paged => {
                let before = state.listing.current_page();
                subset_changed = state.listing.prev_page() != before;
            }
            KeyCode::Home if state.listing.mode() == LayoutMode::Paged => {
                let before = state.listing.current_page();
                subset_changed = state.listing.first_page() != before;
            }
            KeyCode::End if state.listing.mode() == LayoutMode::Paged => {
                let before = state.listing.current_page();
                subset_changed = state.listing.last_page() != before;
            }
            KeyCode::Char('s') => {
                subset_changed = state.listing.update_filter(|f| f.sort = f.sort.toggled());
                state.status = format!("Sorted by {:?}", state.listing.filter().sort);
            }
            KeyCode::Char('r') => match state.reload(api, config.page_size).await {
                Ok(()) => subset_changed = true,
                Err(e) => state.status = format!("Could not load postings: {}", e),
            },
            KeyCode::Char('f') => {
                if let Some(company_id) = state.current_job().and_then(|j| j.company_id) {
                    state.status = match actions::toggle_favorite(
                        api.as_ref(),
                        &mut state.favorites,
                        bus,
                        company_id,
                    )
                    .await
                    {
                        Ok(true) => format!("Company {} added to favorites", company_id),
                        Ok(false) => format!("Company {} removed from favorites", company_id),
                        Err(e) => e.to_string(),
                    };
                }
            }
            KeyCode::Char('v') => {
                if let Some(job_id) = state.current_job().map(|j| j.id) {
                    if let Some(count) = actions::record_view(api.as_ref(), &mut state.listing, job_id).await {
                        state.status = format!("Job #{} viewed ({} views)", job_id, count);
                    }
                }
            }
            _ => {}
        }

        if subset_changed {
            if state.listing.mode() == LayoutMode::Paged || key.code == KeyCode::Char('s') {
                state.reset_cursor();
            }
            state.refresh_logos(api).await;
        }
    }
    Ok(())
}

/// Returns true if anything arrived. A lagged receiver still counts as a change.
fn drain_changes(changes: &mut broadcast::Receiver<FavoriteChange>) -> bool {
    let mut changed = false;
    loop {
        match changes.try_recv() {
            Ok(change) => {
                debug!("Favorite change for company {}", change.company_id());
                changed = true;
            }
            Err(TryRecvError::Lagged(_)) => changed = true,
            Err(TryRecvError::Empty | TryRecvError::Closed) => return changed,
        }
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
        .split(frame.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    // Left panel: displayed postings
    let today = Local::now().date_naive();
    let items: Vec<ListItem> = state
        .listing
        .displayed()
        .iter()
        .map(|job| {
            let marker = match job.company_id {
                Some(id) if state.favorites.contains(id) => "*",
                _ => " ",
            };
            let open = if job.is_open_on(today) { " " } else { "x" };
            ListItem::new(format!(
                "{}{} #{:<5} {} | {}",
                marker,
                open,
                job.id,
                crate::truncate(&job.title, 32),
                job.company_name
            ))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(list_title(state)))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail = Paragraph::new(build_detail(state))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));
    frame.render_widget(detail, chunks[1]);

    let status = Paragraph::new(format!(" {}", state.status)).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, rows[1]);

    let help = match state.listing.mode() {
        LayoutMode::Paged => " j/k:move  ←/→:page  Home/End:first/last  s:sort  f:favorite  v:view  r:reload  q:quit",
        LayoutMode::Incremental => " j/k:move (more loads at the bottom)  s:sort  f:favorite  v:view  r:reload  q:quit",
    };
    frame.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), rows[2]);
}

fn list_title(state: &AppState) -> String {
    let listing = &state.listing;
    let position = match listing.mode() {
        LayoutMode::Paged => {
            let buttons: Vec<String> = listing
                .page_buttons()
                .map(|p| {
                    if p == listing.current_page() {
                        format!("[{}]", p)
                    } else {
                        p.to_string()
                    }
                })
                .collect();
            format!("page {}/{} {}", listing.current_page(), listing.total_pages().max(1), buttons.join(" "))
        }
        LayoutMode::Incremental => {
            let more = if listing.has_more() { "+" } else { "" };
            format!("{}{} shown", state.displayed_len(), more)
        }
    };
    let favorites = if state.favorites.is_empty() {
        "none".to_string()
    } else {
        state.favorites.len().to_string()
    };
    format!(
        " Postings ({} of {}, {:?}) {}  favorites: {} ",
        listing.filtered_len(),
        listing.jobs().len(),
        listing.filter().sort,
        position,
        favorites
    )
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(job) = state.current_job() else {
        return Text::raw("No posting selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        job.title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company_name)));

    if let Some(logo) = job.company_id.and_then(|id| state.logos.logo(id)) {
        lines.push(Line::from(Span::styled(
            format!("Logo: {}", logo),
            Style::default().fg(Color::DarkGray),
        )));
    }
    lines.push(Line::from(""));

    let fields = [
        ("Position", job.position.as_str()),
        ("Experience", job.career_level.as_str()),
        ("Education", job.education.as_str()),
        ("Location", job.location.as_str()),
        ("Salary", job.salary.as_str()),
    ];
    for (label, value) in fields {
        if !value.is_empty() {
            lines.push(Line::from(format!("{}: {}", label, value)));
        }
    }

    let deadline = match job.end_at {
        Some(end) => end.to_string(),
        None => "open".to_string(),
    };
    let today = Local::now().date_naive();
    let deadline_style = if job.is_open_on(today) {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };
    lines.push(Line::from(Span::styled(format!("Deadline: {}", deadline), deadline_style)));
    lines.push(Line::from(format!("Views: {}", job.view_count)));
    lines.push(Line::from(""));

    let labels: Vec<&str> = job
        .tech_stacks
        .iter()
        .flat_map(|raw| crate::tech_stack::split_tags(raw))
        .map(|tag| state.listing.vocabulary().label_for(tag).unwrap_or(tag))
        .collect();
    if !labels.is_empty() {
        lines.push(Line::from(Span::styled(
            "Tech stack",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&labels.join(", "), 60).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, Failure};
    use serde_json::json;

    #[tokio::test]
    async fn test_failed_listing_load_is_an_error() {
        let api: Arc<dyn JobBoardApi> =
            Arc::new(FakeApi::new().fail("list_job_posts", Failure::Server));
        let err = load_state(&api, &Config::default(), FilterState::default(), LayoutMode::Paged)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to load job postings"));
    }

    #[tokio::test]
    async fn test_load_state_survives_favorites_failure() {
        let fake = Arc::new(
            FakeApi::new()
                .with_postings(vec![
                    json!({"id": 1, "title": "Backend", "companyId": 7}),
                    json!({"id": 2, "title": "Frontend", "companyId": 8}),
                ])
                .with_company(json!({"id": 7, "name": "Seven", "logo": "seven.png"}))
                .fail("list_favorite_companies", Failure::Unauthorized),
        );
        let api: Arc<dyn JobBoardApi> = fake.clone();

        let state = load_state(&api, &Config::default(), FilterState::default(), LayoutMode::Incremental)
            .await
            .unwrap();
        assert_eq!(state.listing.jobs().len(), 2);
        assert!(state.favorites.is_empty());
        assert_eq!(state.logos.logo(7), Some("seven.png"));
        assert_eq!(fake.calls("get_company:8"), 1);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_listing() {
        let api: Arc<dyn JobBoardApi> = Arc::new(
            FakeApi::new().with_postings(vec![json!({"id": 1, "title": "Backend"})]),
        );
        let mut state = load_state(&api, &Config::default(), FilterState::default(), LayoutMode::Paged)
            .await
            .unwrap();

        let broken: Arc<dyn JobBoardApi> =
            Arc::new(FakeApi::new().fail("list_job_posts", Failure::Unauthorized));
        assert!(state.reload(&broken, 100).await.is_err());
        assert_eq!(state.listing.jobs().len(), 1);
    }
}

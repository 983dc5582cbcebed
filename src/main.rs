mod actions;
mod assets;
mod client;
mod config;
mod error;
mod fanout;
mod favorites;
mod fetch;
mod listing;
mod models;
mod normalize;
mod tech_stack;
mod tui;
mod window;

#[cfg(test)]
mod testing;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use actions::MembershipSet;
use client::{HttpClient, JobBoardApi};
use config::Config;
use favorites::FavoritesBus;
use models::{FilterState, JobPosting, ResumeDraft, SortMode};
use window::{LayoutMode, ListingView};

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Browse job postings, favorite companies, scraps and resumes on a job board")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    /// Free-text search over title, company, position and location
    #[arg(short, long)]
    search: Option<String>,

    /// Position (e.g. backend)
    #[arg(short, long)]
    position: Option<String>,

    /// Experience level ("경력" matches any posting asking for years)
    #[arg(short, long)]
    experience: Option<String>,

    /// Education requirement
    #[arg(long)]
    education: Option<String>,

    /// Location
    #[arg(short, long)]
    location: Option<String>,

    /// Tech stack label, repeatable; a posting matches if it has any of them
    #[arg(long = "stack")]
    stacks: Vec<String>,

    /// Only postings of this company
    #[arg(short, long)]
    company: Option<i64>,

    /// Sort order
    #[arg(long, value_enum, default_value_t = SortMode::Recent)]
    sort: SortMode,
}

impl FilterArgs {
    fn into_state(self) -> FilterState {
        FilterState {
            search: self.search.unwrap_or_default(),
            position: self.position.unwrap_or_default(),
            experience: self.experience.unwrap_or_default(),
            education: self.education.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            tech_stacks: self.stacks.into_iter().collect(),
            company_id: self.company,
            sort: self.sort,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List job postings, one page at a time
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Page number (out-of-range pages are clamped)
        #[arg(long, default_value = "1")]
        page: usize,
    },

    /// Browse postings interactively
    Browse {
        #[command(flatten)]
        filter: FilterArgs,

        /// Grow the list as you scroll instead of numbered pages
        #[arg(long)]
        incremental: bool,
    },

    /// Show posting details
    Show {
        /// Job posting ID
        id: i64,
    },

    /// Count a view of a posting
    View {
        /// Job posting ID
        id: i64,
    },

    /// List tech-stack filter options
    Stacks,

    /// List favorite companies
    Favorites,

    /// Manage favorite companies
    Favorite {
        #[command(subcommand)]
        command: FavoriteCommands,
    },

    /// List scrapped postings
    Scraps,

    /// Manage scrapped postings
    Scrap {
        #[command(subcommand)]
        command: ScrapCommands,
    },

    /// Upcoming deadlines of scrapped postings
    Schedule,

    /// Open postings of a company
    OpenPostings {
        /// Company ID
        company_id: i64,
    },

    /// Show company details
    Company {
        /// Company ID
        id: i64,
    },

    /// List resumes
    Resumes {
        /// Only resumes that are not locked
        #[arg(long)]
        unlocked: bool,
    },

    /// Manage resumes
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// Apply to a posting
    Apply {
        /// Job posting ID
        job_id: i64,

        /// Resume ID to apply with
        #[arg(short, long)]
        resume: Option<i64>,
    },
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Add a company to favorites
    Add {
        /// Company ID
        company_id: i64,
    },

    /// Remove a company from favorites
    Remove {
        /// Company ID
        company_id: i64,
    },

    /// Remove every favorite record for a company
    Drop {
        /// Company ID
        company_id: i64,
    },
}

#[derive(Subcommand)]
enum ScrapCommands {
    /// Scrap a posting
    Add {
        /// Job posting ID
        job_id: i64,
    },

    /// Remove a scrap
    Remove {
        /// Job posting ID
        job_id: i64,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// Show a resume
    Show {
        /// Resume ID
        id: i64,
    },

    /// Create a resume
    Create {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        summary: Option<String>,
    },

    /// Update a resume
    Update {
        /// Resume ID
        id: i64,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        summary: Option<String>,
    },

    /// Delete a resume
    Delete {
        /// Resume ID
        id: i64,
    },
}

fn init_logging(verbose: bool, interactive: bool) {
    let fallback = if interactive {
        // keep the alternate screen clean unless asked
        "off"
    } else if verbose {
        "jobboard=debug"
    } else {
        "jobboard=info"
    };
    Registry::default()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .init();
}

async fn load_listing(
    api: &dyn JobBoardApi,
    config: &Config,
    filter: FilterState,
    mode: LayoutMode,
) -> Result<ListingView> {
    let mut listing = ListingView::new(mode);
    let ticket = listing.begin_fetch();
    let jobs = fetch::load_jobs(api, filter.company_id, config.page_size)
        .await
        .context("Failed to load job postings")?;
    listing.apply_fetch(ticket, jobs);
    warn_unknown_stacks(&listing, &filter);
    listing.set_filter(filter);
    Ok(listing)
}

fn warn_unknown_stacks(listing: &ListingView, filter: &FilterState) {
    let vocabulary = listing.vocabulary();
    for stack in &filter.tech_stacks {
        if stack == tech_stack::ALL_OPTION || vocabulary.label_for(stack).is_some() {
            continue;
        }
        match vocabulary.suggest(stack) {
            Some(label) => eprintln!("No posting uses '{}'. Did you mean '{}'?", stack, label),
            None => eprintln!("No posting uses '{}'.", stack),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, matches!(cli.command, Commands::Browse { .. }));

    let config = Config::load(cli.config.as_deref())?;
    let api: Arc<dyn JobBoardApi> = Arc::new(HttpClient::new(&config)?);
    let today = Local::now().date_naive();

    match cli.command {
        Commands::List { filter, page } => {
            let mut listing =
                load_listing(api.as_ref(), &config, filter.into_state(), LayoutMode::Paged).await?;
            listing.go_to_page(page);

            let jobs = listing.displayed();
            if jobs.is_empty() {
                println!("No job postings found.");
            } else {
                print_postings(&jobs, today);
                let buttons: Vec<String> = listing
                    .page_buttons()
                    .map(|p| if p == listing.current_page() { format!("[{}]", p) } else { p.to_string() })
                    .collect();
                println!(
                    "\nPage {}/{}  {}  ({} matching of {})",
                    listing.current_page(),
                    listing.total_pages(),
                    buttons.join(" "),
                    listing.filtered_len(),
                    listing.jobs().len()
                );
            }
        }

        Commands::Browse { filter, incremental } => {
            let mode = if incremental { LayoutMode::Incremental } else { LayoutMode::Paged };
            tui::run_browse(Arc::clone(&api), &config, filter.into_state(), mode).await?;
        }

        Commands::Show { id } => {
            let detail = fetch::load_job_detail(api.as_ref(), id)
                .await
                .with_context(|| format!("Failed to load job post #{}", id))?;
            let job = &detail.posting;
            println!("Job #{}", job.id);
            println!("Title: {}", job.title);
            if !job.company_name.is_empty() {
                println!("Company: {}", job.company_name);
            }
            for (label, value) in [
                ("Position", &job.position),
                ("Experience", &job.career_level),
                ("Education", &job.education),
                ("Location", &job.location),
                ("Salary", &job.salary),
            ] {
                if !value.is_empty() {
                    println!("{}: {}", label, value);
                }
            }
            if !job.tech_stacks.is_empty() {
                println!("Tech stack: {}", job.tech_stacks.join(", "));
            }
            match (job.start_at, job.end_at) {
                (Some(start), Some(end)) => println!("Period: {} ~ {}", start, end),
                (None, Some(end)) => println!("Deadline: {}", end),
                (Some(start), None) => println!("Period: {} ~ (open)", start),
                (None, None) => println!("Deadline: open"),
            }
            println!("Views: {}", job.view_count);
            if let Some(point) = detail.coordinates {
                println!("Coordinates: {:.5}, {:.5}", point.latitude, point.longitude);
            }
            for (heading, text) in [
                ("Description", &detail.description),
                ("Qualifications", &detail.qualifications),
                ("Benefits", &detail.benefits),
            ] {
                if let Some(text) = text {
                    println!("\n--- {} ---\n{}", heading, textwrap::fill(text, 80));
                }
            }
        }

        Commands::View { id } => {
            api.increment_view(id)
                .await
                .with_context(|| format!("Failed to record a view of job #{}", id))?;
            println!("Recorded a view of job #{}.", id);
        }

        Commands::Stacks => {
            let listing = load_listing(api.as_ref(), &config, FilterState::default(), LayoutMode::Paged).await?;
            let vocabulary = listing.vocabulary();
            if vocabulary.is_empty() {
                println!("No tech stacks found.");
            } else {
                for option in vocabulary.options() {
                    println!("{}", option);
                }
                println!("\n{} stacks across {} postings", vocabulary.len(), listing.jobs().len());
            }
        }

        Commands::Favorites => {
            let groups = fetch::load_favorite_groups(api.as_ref(), config.favorites_page_size).await;
            if groups.is_empty() {
                println!("No favorite companies.");
            } else {
                println!("{:<8} {:<28} {:>6} {:>8} {:<20}", "ID", "COMPANY", "POSTS", "RECORDS", "INDUSTRY");
                println!("{}", "-".repeat(74));
                for group in groups {
                    println!(
                        "{:<8} {:<28} {:>6} {:>8} {:<20}",
                        group.company_id,
                        truncate(&group.company_name, 26),
                        group.post_count,
                        group.ids.len(),
                        truncate(&group.industry.unwrap_or_default(), 18)
                    );
                }
            }
        }

        Commands::Favorite { command } => {
            let groups = fetch::load_favorite_groups(api.as_ref(), config.favorites_page_size).await;
            let mut favorites = MembershipSet::new(groups.iter().map(|g| g.company_id));
            let bus = FavoritesBus::new();

            match command {
                FavoriteCommands::Add { company_id } => {
                    if favorites.contains(company_id) {
                        println!("Company {} is already a favorite.", company_id);
                    } else {
                        actions::toggle_favorite(api.as_ref(), &mut favorites, &bus, company_id).await?;
                        println!("Added company {} to favorites.", company_id);
                    }
                }

                FavoriteCommands::Remove { company_id } => {
                    if !favorites.contains(company_id) {
                        println!("Company {} is not a favorite.", company_id);
                    } else {
                        actions::toggle_favorite(api.as_ref(), &mut favorites, &bus, company_id).await?;
                        println!("Removed company {} from favorites.", company_id);
                    }
                }

                FavoriteCommands::Drop { company_id } => {
                    let group = groups
                        .iter()
                        .find(|g| g.company_id == company_id)
                        .ok_or_else(|| anyhow!("Company {} is not a favorite", company_id))?;
                    let removal = actions::remove_favorite_group(&api, group, &bus).await;
                    println!("Removed {} favorite record(s) for company {}.", removal.removed.len(), company_id);
                    if !removal.is_complete() {
                        println!("  Failed: {:?}", removal.failed);
                    }
                }
            }
        }

        Commands::Scraps => {
            let scraps = fetch::load_scraps(api.as_ref(), config.favorites_page_size).await;
            if scraps.is_empty() {
                println!("No scrapped postings.");
            } else {
                let refs: Vec<&JobPosting> = scraps.iter().collect();
                print_postings(&refs, today);
            }
        }

        Commands::Scrap { command } => {
            let scraps = fetch::load_scraps(api.as_ref(), config.favorites_page_size).await;
            let mut scrapped = MembershipSet::new(scraps.iter().map(|j| j.id));

            match command {
                ScrapCommands::Add { job_id } => {
                    if scrapped.contains(job_id) {
                        println!("Job #{} is already scrapped.", job_id);
                    } else {
                        actions::toggle_scrap(api.as_ref(), &mut scrapped, job_id).await?;
                        println!("Scrapped job #{}.", job_id);
                    }
                }

                ScrapCommands::Remove { job_id } => {
                    if !scrapped.contains(job_id) {
                        println!("Job #{} is not scrapped.", job_id);
                    } else {
                        actions::toggle_scrap(api.as_ref(), &mut scrapped, job_id).await?;
                        println!("Removed scrap of job #{}.", job_id);
                    }
                }
            }
        }

        Commands::Schedule => {
            let scraps = fetch::load_scraps(api.as_ref(), config.favorites_page_size).await;
            let notices = fetch::schedule_notices(&scraps, today);
            if notices.is_empty() {
                println!("No upcoming deadlines.");
            } else {
                println!("{:<12} {:<7} {:<7} {:<30} {:<20}", "DEADLINE", "LEFT", "ID", "TITLE", "COMPANY");
                println!("{}", "-".repeat(80));
                for notice in notices {
                    let left = if notice.days_left == 0 {
                        "D-day".to_string()
                    } else {
                        format!("D-{}", notice.days_left)
                    };
                    println!(
                        "{:<12} {:<7} {:<7} {:<30} {:<20}",
                        notice.end_at,
                        left,
                        notice.job_id,
                        truncate(&notice.title, 28),
                        truncate(&notice.company_name, 18)
                    );
                }
            }
        }

        Commands::OpenPostings { company_id } => {
            let postings = favorites::resolve_open_postings(
                api.as_ref(),
                company_id,
                &config.open_posting_sources,
                config.page_size,
                today,
            )
            .await?;
            if postings.is_empty() {
                println!("No open postings for company {}.", company_id);
            } else {
                let refs: Vec<&JobPosting> = postings.iter().collect();
                print_postings(&refs, today);
            }
        }

        Commands::Company { id } => {
            let company = fetch::load_company(api.as_ref(), id)
                .await
                .with_context(|| format!("Failed to load company #{}", id))?;
            println!("Company #{}", company.id);
            println!("Name: {}", company.name);
            if let Some(industry) = &company.industry {
                println!("Industry: {}", industry);
            }
            if let Some(address) = &company.address {
                println!("Address: {}", address);
            }
            if let Some(logo) = &company.logo {
                println!("Logo: {}", logo);
            }
            if let Some(point) = company.coordinates {
                println!("Coordinates: {:.5}, {:.5}", point.latitude, point.longitude);
            }
        }

        Commands::Resumes { unlocked } => {
            let summaries = fetch::load_resumes(api.as_ref(), unlocked)
                .await
                .context("Failed to load resumes")?;
            let resumes = fetch::hydrate_resumes(&api, summaries).await;
            if resumes.is_empty() {
                println!("No resumes found.");
            } else {
                println!("{:<6} {:<24} {:<7} {:<20} {:<30}", "ID", "TITLE", "LOCKED", "UPDATED", "SUMMARY");
                println!("{}", "-".repeat(90));
                for resume in resumes {
                    println!(
                        "{:<6} {:<24} {:<7} {:<20} {:<30}",
                        resume.id,
                        truncate(&resume.title, 22),
                        if resume.locked { "yes" } else { "no" },
                        truncate(&resume.updated_at.unwrap_or_default(), 18),
                        truncate(&resume.summary.unwrap_or_default().replace('\n', " "), 28)
                    );
                }
            }
        }

        Commands::Resume { command } => match command {
            ResumeCommands::Show { id } => {
                let payload = api
                    .get_resume(id)
                    .await
                    .with_context(|| format!("Failed to load resume #{}", id))?;
                let resume = normalize::resume(&payload)
                    .ok_or_else(|| anyhow!("Resume #{} could not be read", id))?;
                println!("Resume '{}' (ID: {})", resume.title, resume.id);
                println!("Locked: {}", if resume.locked { "yes" } else { "no" });
                if let Some(updated) = &resume.updated_at {
                    println!("Updated: {}", updated);
                }
                if let Some(summary) = &resume.summary {
                    println!("\n--- Summary ---\n{}", textwrap::fill(summary, 80));
                }
            }

            ResumeCommands::Create { title, summary } => {
                let resume = actions::create_resume(api.as_ref(), &ResumeDraft { title, summary }).await?;
                println!("Created resume '{}' (ID: {})", resume.title, resume.id);
            }

            ResumeCommands::Update { id, title, summary } => {
                let resume = actions::update_resume(api.as_ref(), id, &ResumeDraft { title, summary }).await?;
                println!("Updated resume '{}' (ID: {})", resume.title, resume.id);
            }

            ResumeCommands::Delete { id } => {
                actions::delete_resume(api.as_ref(), id).await?;
                println!("Deleted resume #{}.", id);
            }
        },

        Commands::Apply { job_id, resume } => {
            actions::apply(api.as_ref(), job_id, resume).await?;
            println!("Applied to job #{}.", job_id);
        }
    }

    Ok(())
}

fn print_postings(jobs: &[&JobPosting], today: NaiveDate) {
    println!(
        "{:<7} {:<30} {:<18} {:<12} {:<12} {:>6}",
        "ID", "TITLE", "COMPANY", "LOCATION", "DEADLINE", "VIEWS"
    );
    println!("{}", "-".repeat(90));
    for job in jobs {
        let deadline = match job.end_at {
            Some(end) if !job.is_open_on(today) => format!("{} x", end),
            Some(end) => end.to_string(),
            None => "open".to_string(),
        };
        println!(
            "{:<7} {:<30} {:<18} {:<12} {:<12} {:>6}",
            job.id,
            truncate(&job.title, 28),
            truncate(&job.company_name, 16),
            truncate(&job.location, 10),
            deadline,
            job.view_count
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

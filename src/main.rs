use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{FeedbackType, QuestionScore};
use crate::report::scale::{format_score, interpretation};
use crate::report::{ReportData, ReportFormat};

mod aggregate;
mod config;
mod db;
mod models;
mod report;

#[derive(Parser)]
#[command(name = "feedback360")]
#[command(about = "360-degree leadership feedback scoring and reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo company, survey and responses
    Seed,
    /// Import survey responses from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print mean MCQ scores grouped by feedback type
    Means {
        #[arg(long)]
        survey: Option<Uuid>,
        #[arg(long)]
        json: bool,
    },
    /// Print participation, category averages and consistency checks
    Analyze {
        #[arg(long)]
        survey: Option<Uuid>,
    },
    /// Generate a feedback report document
    Report {
        #[arg(long)]
        survey: Option<Uuid>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Html)]
        format: ReportFormat,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = run(Cli::parse()).await {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await.context("failed to apply migrations")?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await.context("failed to seed demo data")?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            info!(inserted, path = %csv.display(), "import finished");
            println!("Inserted {inserted} responses from {}.", csv.display());
        }
        Commands::Means { survey, json } => {
            print_means(&pool, survey, json).await?;
        }
        Commands::Analyze { survey } => {
            analyze(&pool, survey).await?;
        }
        Commands::Report {
            survey,
            format,
            out_dir,
        } => {
            let survey_id = db::resolve_survey_id(&pool, survey).await?;
            let data = db::load_survey_data(&pool, survey_id).await?;
            let now = Local::now();
            let report = ReportData::assemble(data, now.date_naive());
            let base = out_dir.unwrap_or(config.reports_dir);
            let path = report::write_report(&base, &report, format, now.naive_local())?;
            println!("Report written to {}.", path.display());
        }
    }

    Ok(())
}

async fn print_means(pool: &PgPool, survey: Option<Uuid>, json: bool) -> anyhow::Result<()> {
    let survey_id = db::resolve_survey_id(pool, survey).await?;
    let data = db::load_survey_data(pool, survey_id).await?;
    let scores = aggregate::question_scores(&data.questions, &data.options, &data.responses);

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
        return Ok(());
    }

    if scores.is_empty() {
        println!("No scored responses for survey {survey_id}.");
        return Ok(());
    }

    let mut by_type: BTreeMap<FeedbackType, Vec<&QuestionScore>> = BTreeMap::new();
    for score in &scores {
        by_type.entry(score.feedback_type).or_default().push(score);
    }

    println!("Question means for {}:", data.survey.title);
    for (feedback_type, mut scores) in by_type {
        scores.sort_by_key(|score| score.position);
        println!();
        println!("{} feedback:", feedback_type.label());
        for score in scores {
            println!(
                "- Q{} [{}] {}: {} ({} responses)",
                score.position,
                score.category,
                score.question_text,
                format_score(score.mean_score),
                score.response_count
            );
        }
    }
    Ok(())
}

async fn analyze(pool: &PgPool, survey: Option<Uuid>) -> anyhow::Result<()> {
    let survey_id = db::resolve_survey_id(pool, survey).await?;
    let data = db::load_survey_data(pool, survey_id).await?;

    println!("Survey: {} ({})", data.survey.title, data.survey.status.as_str());
    if data.subject.email.is_empty() {
        println!("Subject: {}", data.subject.name);
    } else {
        println!("Subject: {} <{}>", data.subject.name, data.subject.email);
    }

    println!();
    println!("Participation:");
    for stat in &data.participation {
        println!(
            "- {}: {}/{} responded ({}%)",
            stat.feedback_type.label(),
            stat.responded,
            stat.invited,
            aggregate::response_rate(stat)
        );
    }

    println!();
    println!("Responses:");
    for (feedback_type, count) in aggregate::response_counts(&data.responses) {
        println!(
            "- {}: {} responses from {} raters",
            feedback_type.label(),
            count.total,
            count.respondents
        );
    }

    let scores = aggregate::question_scores(&data.questions, &data.options, &data.responses);
    let categories = aggregate::category_averages(&scores);
    println!();
    println!("Category averages:");
    if categories.is_empty() {
        println!("No scored responses recorded.");
    }
    for category in &categories {
        println!(
            "- {}: overall {} ({}, {} responses)",
            category.category,
            format_score(category.overall),
            interpretation(category.overall),
            category.response_count()
        );
        for (feedback_type, average) in &category.types {
            println!(
                "    {}: {} across {} questions",
                feedback_type.label(),
                format_score(average.average),
                average.count
            );
        }
    }

    let mismatches = aggregate::self_feedback_mismatches(&data.responses);
    println!();
    if mismatches.is_empty() {
        println!("Self feedback: all responses are about the rater.");
    } else {
        warn!(
            count = mismatches.len(),
            "self responses whose subject is not the rater"
        );
        println!("Self feedback: {} mismatched responses", mismatches.len());
        for response in mismatches {
            println!("- {} (question {})", response.employee_email, response.question_id);
        }
    }

    Ok(())
}

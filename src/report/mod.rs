use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate;
use crate::models::{
    CategoryAverage, FeedbackType, ParticipationStat, QuestionScore, Subject, Survey, SurveyData,
    Verbatim, VerbatimIndex,
};

mod docx;
mod html;
mod markdown;
pub mod scale;

pub const REPORT_TITLE: &str = "360° LEADERSHIP FEEDBACK REPORT";

pub const INTRODUCTION: &str = "This 360-degree feedback report presents perspectives from multiple sources to support your leadership development. The feedback comes from colleagues who work with you in different capacities, providing a comprehensive view of your leadership effectiveness.";

pub const CONFIDENTIAL_NOTICE: &str =
    "This report contains confidential feedback for development purposes only.";

pub const NEXT_STEPS: [&str; 5] = [
    "Review your detailed results and identify specific behaviors to develop",
    "Discuss this feedback with your manager or coach",
    "Create a development plan focusing on 1-2 priority areas",
    "Seek opportunities to practice new behaviors",
    "Request ongoing feedback to track your progress",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Html,
    Docx,
    Markdown,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Docx => "docx",
            ReportFormat::Markdown => "md",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportData {
    pub survey: Survey,
    pub subject: Subject,
    pub participation: Vec<ParticipationStat>,
    pub question_scores: Vec<QuestionScore>,
    pub categories: Vec<CategoryAverage>,
    pub verbatims: VerbatimIndex,
    pub generated_on: NaiveDate,
}

pub struct QuestionGroup<'a> {
    pub question_text: &'a str,
    pub scores: Vec<&'a QuestionScore>,
}

impl ReportData {
    pub fn assemble(data: SurveyData, generated_on: NaiveDate) -> Self {
        let question_scores =
            aggregate::question_scores(&data.questions, &data.options, &data.responses);
        let categories = aggregate::category_averages(&question_scores);
        let verbatims = aggregate::group_verbatims(&data.questions, &data.responses);

        let mut participation = data.participation;
        participation.sort_by_key(|stat| stat.feedback_type);

        debug!(
            survey_id = %data.survey.id,
            scored_questions = question_scores.len(),
            categories = categories.len(),
            "aggregated survey responses"
        );

        Self {
            survey: data.survey,
            subject: data.subject,
            participation,
            question_scores,
            categories,
            verbatims,
            generated_on,
        }
    }

    pub fn question_groups(&self, category: &str) -> Vec<QuestionGroup<'_>> {
        let mut groups: Vec<QuestionGroup<'_>> = Vec::new();
        for score in self.question_scores.iter().filter(|s| s.category == category) {
            match groups
                .iter_mut()
                .find(|group| group.question_text == score.question_text)
            {
                Some(group) => group.scores.push(score),
                None => groups.push(QuestionGroup {
                    question_text: &score.question_text,
                    scores: vec![score],
                }),
            }
        }
        groups
    }

    pub fn verbatims_for(&self, category: &str) -> Option<&BTreeMap<FeedbackType, Vec<Verbatim>>> {
        self.verbatims
            .get(category)
            .filter(|by_type| by_type.values().any(|comments| !comments.is_empty()))
    }

    pub fn assessment_period(&self) -> String {
        format!(
            "{} - {}",
            format_date(self.survey.start_date),
            format_date(self.survey.end_date)
        )
    }
}

pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_default()
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn render(format: ReportFormat, data: &ReportData) -> anyhow::Result<Vec<u8>> {
    match format {
        ReportFormat::Html => Ok(html::render(data).into_bytes()),
        ReportFormat::Markdown => Ok(markdown::render(data).into_bytes()),
        ReportFormat::Docx => docx::render(data),
    }
}

/// `<base>/<survey id>/360-feedback-report-YYYYMMDD-HHMM.<ext>`
pub fn report_path(
    base: &Path,
    survey_id: Uuid,
    generated_at: NaiveDateTime,
    format: ReportFormat,
) -> PathBuf {
    base.join(survey_id.to_string()).join(format!(
        "360-feedback-report-{}.{}",
        generated_at.format("%Y%m%d-%H%M"),
        format.extension()
    ))
}

pub fn write_report(
    base: &Path,
    data: &ReportData,
    format: ReportFormat,
    generated_at: NaiveDateTime,
) -> anyhow::Result<PathBuf> {
    let path = report_path(base, data.survey.id, generated_at, format);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create reports directory {}", dir.display()))?;
    }

    let contents = render(format, data)?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    info!(path = %path.display(), format = format.extension(), "report written");
    Ok(path)
}

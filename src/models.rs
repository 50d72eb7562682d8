use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// declaration order is report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackType {
    #[serde(rename = "self")]
    SelfAssessment,
    Manager,
    Peer,
    Reportee,
}

impl FeedbackType {
    pub const ALL: [FeedbackType; 4] = [
        FeedbackType::SelfAssessment,
        FeedbackType::Manager,
        FeedbackType::Peer,
        FeedbackType::Reportee,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackType::SelfAssessment => "self",
            FeedbackType::Manager => "manager",
            FeedbackType::Peer => "peer",
            FeedbackType::Reportee => "reportee",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FeedbackType::SelfAssessment => "Self",
            FeedbackType::Manager => "Manager",
            FeedbackType::Peer => "Peer",
            FeedbackType::Reportee => "Reportee",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "self" => Ok(FeedbackType::SelfAssessment),
            "manager" => Ok(FeedbackType::Manager),
            "peer" => Ok(FeedbackType::Peer),
            "reportee" => Ok(FeedbackType::Reportee),
            other => bail!("unknown feedback type {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Text,
}

impl QuestionType {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Text => "text",
        }
    }
}

impl FromStr for QuestionType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "mcq" => Ok(QuestionType::Mcq),
            "text" => Ok(QuestionType::Text),
            other => bail!("unknown question type {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    Draft,
    Active,
    Completed,
}

impl SurveyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SurveyStatus::Draft => "draft",
            SurveyStatus::Active => "active",
            SurveyStatus::Completed => "completed",
        }
    }
}

impl FromStr for SurveyStatus {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "draft" => Ok(SurveyStatus::Draft),
            "active" => Ok(SurveyStatus::Active),
            "completed" => Ok(SurveyStatus::Completed),
            other => bail!("unknown survey status {other:?}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Survey {
    pub id: Uuid,
    pub title: String,
    pub company_name: Option<String>,
    pub status: SurveyStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct Subject {
    pub name: String,
    pub email: String,
    pub role: String,
    pub company_name: String,
}

impl Subject {
    pub fn placeholder(company_name: Option<&str>) -> Self {
        Self {
            name: "Leadership Development Participant".to_string(),
            email: String::new(),
            role: "Team Member".to_string(),
            company_name: company_name.unwrap_or("Organization").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurveyQuestion {
    pub id: Uuid,
    pub feedback_type: FeedbackType,
    pub category_name: Option<String>,
    pub question_text: String,
    pub question_type: QuestionType,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct QuestionOption {
    pub question_id: Uuid,
    pub option_text: String,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub question_id: Uuid,
    pub employee_email: String,
    pub rater_employee_id: Option<Uuid>,
    pub subject_employee_id: Option<Uuid>,
    pub feedback_type: FeedbackType,
    pub response_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipationStat {
    pub feedback_type: FeedbackType,
    pub invited: i64,
    pub responded: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionScore {
    pub question_id: Uuid,
    pub category: String,
    pub question_text: String,
    pub feedback_type: FeedbackType,
    pub position: i32,
    pub mean_score: f64,
    pub response_count: usize,
    pub individual_scores: Vec<i32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeAverage {
    pub total: f64,
    pub count: usize,
    pub average: f64,
    pub response_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryAverage {
    pub category: String,
    pub types: BTreeMap<FeedbackType, TypeAverage>,
    pub overall: f64,
}

impl CategoryAverage {
    pub fn response_count(&self) -> usize {
        self.types.values().map(|t| t.response_count).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Verbatim {
    pub question: String,
    pub response: String,
}

/// category -> feedback type -> comments
pub type VerbatimIndex = BTreeMap<String, BTreeMap<FeedbackType, Vec<Verbatim>>>;

#[derive(Debug, Clone)]
pub struct SurveyData {
    pub survey: Survey,
    pub subject: Subject,
    pub participation: Vec<ParticipationStat>,
    pub questions: Vec<SurveyQuestion>,
    pub options: Vec<QuestionOption>,
    pub responses: Vec<ResponseRecord>,
}

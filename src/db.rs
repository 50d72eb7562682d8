use std::str::FromStr;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate;
use crate::models::{
    FeedbackType, ParticipationStat, QuestionOption, QuestionType, ResponseRecord, Subject, Survey,
    SurveyData, SurveyQuestion,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn parse_column<T>(row: &PgRow, column: &str) -> anyhow::Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    let raw: String = row.get(column);
    raw.parse()
        .with_context(|| format!("invalid {column} value {raw:?}"))
}

const SEED_SCALE: [&str; 5] = [
    "Strongly Disagree",
    "Disagree",
    "Neutral",
    "Agree",
    "Strongly Agree",
];

// (category, MCQ statements, open question)
const SEED_CATEGORIES: [(&str, [&str; 2], &str); 3] = [
    (
        "Communication",
        [
            "Explains decisions and the context behind them",
            "Listens actively and invites different views",
        ],
        "What should this leader keep doing when communicating?",
    ),
    (
        "Delegation",
        [
            "Hands off ownership rather than just tasks",
            "Gives the team room to make decisions",
        ],
        "Where could this leader delegate more effectively?",
    ),
    (
        "Strategic Thinking",
        [
            "Connects the team's work to company goals",
            "Anticipates risks before they become problems",
        ],
        "What would make this leader more strategic?",
    ),
];

fn seed_comment(feedback_type: FeedbackType, rater_index: usize) -> &'static str {
    let comments: [&str; 2] = match feedback_type {
        FeedbackType::SelfAssessment => [
            "I feel confident delivering results but need to grow my team leadership skills.",
            "I want to become more strategic while staying close to the work.",
        ],
        FeedbackType::Manager => [
            "Consistently delivers quality results; should invest in strategic thinking.",
            "Shows leadership potential but needs to empower the team more.",
        ],
        FeedbackType::Peer => [
            "Great to work with and always willing to help.",
            "Strong contributor who could speak up more in larger meetings.",
        ],
        FeedbackType::Reportee => [
            "Provides clear direction and regular coaching.",
            "Supportive, though I would like more stretch opportunities.",
        ],
    };
    comments[rater_index % comments.len()]
}

fn seed_position(feedback_type: FeedbackType, category: usize, rater: usize, item: usize) -> usize {
    let base: i64 = match feedback_type {
        FeedbackType::SelfAssessment => 3,
        _ => 4,
    };
    let category_offset: i64 = match category {
        0 => 0,
        1 => -1,
        _ => 0,
    };
    let variation = ((rater + item) % 3) as i64 - 1;
    (base + category_offset + variation).clamp(1, 5) as usize
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let company_id = Uuid::parse_str("6f1c2a8e-3b5d-4c7a-9e21-0d4b8f6a1c37")?;
    let survey_id = Uuid::parse_str("b2e4c6d8-1a3f-4e5b-8c7d-9f0a2b4c6e81")?;

    sqlx::query(
        r#"
        INSERT INTO feedback360.companies (id, name, address, contact_email)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(company_id)
    .bind("Acme Corp")
    .bind("123 Main St")
    .bind("info@acme.com")
    .execute(pool)
    .await?;

    let employees = vec![
        ("Bob Jones", "bob@acme.com", "Engineering Manager"),
        ("Alice Smith", "alice@acme.com", "Director of Engineering"),
        ("Frank Miller", "frank@acme.com", "Product Manager"),
        ("Dana Cruz", "dana@acme.com", "Design Lead"),
        ("Omar Haddad", "omar@acme.com", "QA Lead"),
        ("Emma Wilson", "emma@acme.com", "Software Engineer"),
        ("Grace Lee", "grace@acme.com", "Software Engineer"),
    ];

    let mut employee_ids = Vec::new();
    for (name, email, role) in employees {
        let id: Uuid = sqlx::query(
            r#"
            INSERT INTO feedback360.employees (id, company_id, name, email, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE
            SET name = EXCLUDED.name, role = EXCLUDED.role
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_one(pool)
        .await?
        .get("id");
        employee_ids.push((id, email));
    }

    let mut tx = pool.begin().await?;

    let created = sqlx::query(
        r#"
        INSERT INTO feedback360.surveys (id, title, company_id, status, start_date, end_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(survey_id)
    .bind("Leadership 360 - Bob Jones")
    .bind(company_id)
    .bind("completed")
    .bind(NaiveDate::from_ymd_opt(2026, 1, 5).context("invalid date")?)
    .bind(NaiveDate::from_ymd_opt(2026, 2, 20).context("invalid date")?)
    .execute(&mut *tx)
    .await?;

    if created.rows_affected() == 0 {
        info!(%survey_id, "demo survey already seeded");
        tx.rollback().await?;
        return Ok(());
    }

    let (subject_id, _) = employee_ids[0];
    // (feedback type, rater index into employee_ids, responds)
    let raters = [
        (FeedbackType::SelfAssessment, 0, true),
        (FeedbackType::Manager, 1, true),
        (FeedbackType::Peer, 2, true),
        (FeedbackType::Peer, 3, true),
        (FeedbackType::Peer, 4, false),
        (FeedbackType::Reportee, 5, true),
        (FeedbackType::Reportee, 6, true),
    ];

    let mut questions: Vec<(FeedbackType, usize, usize, Uuid, QuestionType)> = Vec::new();
    for feedback_type in FeedbackType::ALL {
        let mut position = 0i32;
        for (category_index, (category, statements, open_question)) in
            SEED_CATEGORIES.iter().enumerate()
        {
            let items = statements
                .iter()
                .map(|text| (*text, QuestionType::Mcq))
                .chain(std::iter::once((*open_question, QuestionType::Text)));
            for (item, (text, question_type)) in items.enumerate() {
                position += 1;
                let question_id = Uuid::new_v4();
                sqlx::query(
                    r#"
                    INSERT INTO feedback360.survey_questions
                    (id, survey_id, feedback_type, category_name, question_text, question_type, position)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    "#,
                )
                .bind(question_id)
                .bind(survey_id)
                .bind(feedback_type.as_str())
                .bind(*category)
                .bind(text)
                .bind(question_type.as_str())
                .bind(position)
                .execute(&mut *tx)
                .await?;

                if question_type == QuestionType::Mcq {
                    for (index, option_text) in SEED_SCALE.iter().enumerate() {
                        sqlx::query(
                            r#"
                            INSERT INTO feedback360.survey_question_options
                            (id, survey_question_id, option_text, position)
                            VALUES ($1, $2, $3, $4)
                            "#,
                        )
                        .bind(Uuid::new_v4())
                        .bind(question_id)
                        .bind(*option_text)
                        .bind(index as i32 + 1)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
                questions.push((feedback_type, category_index, item, question_id, question_type));
            }
        }
    }

    let mut responses = 0usize;
    for (rater_index, (feedback_type, employee_index, responds)) in raters.into_iter().enumerate() {
        let (rater_id, rater_email) = employee_ids[employee_index];
        aggregate::check_rater_relationship(feedback_type, rater_id, subject_id)?;

        sqlx::query(
            r#"
            INSERT INTO feedback360.survey_participants (id, survey_id, employee_id, feedback_type)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (survey_id, employee_id, feedback_type) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(survey_id)
        .bind(rater_id)
        .bind(feedback_type.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO feedback360.survey_rater_assignments
            (id, survey_id, subject_employee_id, rater_employee_id, feedback_type)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (survey_id, subject_employee_id, rater_employee_id, feedback_type) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(survey_id)
        .bind(subject_id)
        .bind(rater_id)
        .bind(feedback_type.as_str())
        .execute(&mut *tx)
        .await?;

        if !responds {
            continue;
        }

        for (question_type_for, category, item, question_id, question_type) in &questions {
            if *question_type_for != feedback_type {
                continue;
            }
            let response_text = match question_type {
                QuestionType::Mcq => {
                    SEED_SCALE[seed_position(feedback_type, *category, rater_index, *item) - 1]
                }
                QuestionType::Text => seed_comment(feedback_type, rater_index + category),
            };

            sqlx::query(
                r#"
                INSERT INTO feedback360.survey_responses
                (id, survey_id, question_id, employee_email, subject_employee_id,
                 feedback_type, response_text, source_key)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (source_key) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(survey_id)
            .bind(question_id)
            .bind(rater_email)
            .bind(subject_id)
            .bind(feedback_type.as_str())
            .bind(response_text)
            .bind(format!("seed-{question_id}-{rater_email}"))
            .execute(&mut *tx)
            .await?;
            responses += 1;
        }
    }

    tx.commit().await?;
    info!(%survey_id, questions = questions.len(), responses, "seeded demo survey");
    Ok(())
}

async fn employee_id(pool: &PgPool, email: &str) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query("SELECT id FROM feedback360.employees WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|row| row.get("id")))
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        survey_id: Uuid,
        rater_email: String,
        subject_email: String,
        feedback_type: String,
        question_position: i32,
        response_text: String,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = result.with_context(|| format!("line {line}: malformed row"))?;
        let feedback_type: FeedbackType = row
            .feedback_type
            .parse()
            .with_context(|| format!("line {line}: bad feedback_type"))?;

        let rater_id = employee_id(pool, &row.rater_email)
            .await?
            .with_context(|| format!("line {line}: unknown rater {}", row.rater_email))?;
        let subject_id = employee_id(pool, &row.subject_email)
            .await?
            .with_context(|| format!("line {line}: unknown subject {}", row.subject_email))?;
        aggregate::check_rater_relationship(feedback_type, rater_id, subject_id)
            .with_context(|| format!("line {line}: invalid rater relationship"))?;

        let question_id: Uuid = sqlx::query(
            r#"
            SELECT id FROM feedback360.survey_questions
            WHERE survey_id = $1 AND feedback_type = $2 AND position = $3
            "#,
        )
        .bind(row.survey_id)
        .bind(feedback_type.as_str())
        .bind(row.question_position)
        .fetch_optional(pool)
        .await?
        .with_context(|| {
            format!(
                "line {line}: survey {} has no {feedback_type} question at position {}",
                row.survey_id, row.question_position
            )
        })?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO feedback360.survey_responses
            (id, survey_id, question_id, employee_email, subject_employee_id,
             feedback_type, response_text, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.survey_id)
        .bind(question_id)
        .bind(&row.rater_email)
        .bind(subject_id)
        .bind(feedback_type.as_str())
        .bind(&row.response_text)
        .bind(&source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        } else {
            debug!(line, %source_key, "response already imported");
        }
    }

    Ok(inserted)
}

/// Falls back to the most recently created survey.
pub async fn resolve_survey_id(pool: &PgPool, requested: Option<Uuid>) -> anyhow::Result<Uuid> {
    if let Some(id) = requested {
        return Ok(id);
    }

    let row = sqlx::query("SELECT id FROM feedback360.surveys ORDER BY created_at DESC LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("failed to look up latest survey")?
        .context("no survey id provided and none found; use --survey <id>")?;
    Ok(row.get("id"))
}

pub async fn fetch_survey(pool: &PgPool, survey_id: Uuid) -> anyhow::Result<Survey> {
    let row = sqlx::query(
        r#"
        SELECT s.id, s.title, s.status, s.start_date, s.end_date, c.name AS company_name
        FROM feedback360.surveys s
        LEFT JOIN feedback360.companies c ON c.id = s.company_id
        WHERE s.id = $1
        "#,
    )
    .bind(survey_id)
    .fetch_optional(pool)
    .await
    .context("failed to load survey")?
    .with_context(|| format!("survey {survey_id} not found"))?;

    Ok(Survey {
        id: row.get("id"),
        title: row.get("title"),
        company_name: row.get("company_name"),
        status: parse_column(&row, "status")?,
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
    })
}

pub async fn fetch_subject(
    pool: &PgPool,
    survey_id: Uuid,
    survey_company: Option<&str>,
) -> anyhow::Result<Subject> {
    let row = sqlx::query(
        r#"
        SELECT e.name, e.email, e.role, c.name AS company_name
        FROM feedback360.survey_participants sp
        JOIN feedback360.employees e ON e.id = sp.employee_id
        JOIN feedback360.companies c ON c.id = e.company_id
        WHERE sp.survey_id = $1 AND sp.feedback_type = 'self'
        ORDER BY sp.created_at, sp.id
        LIMIT 1
        "#,
    )
    .bind(survey_id)
    .fetch_optional(pool)
    .await
    .context("failed to load survey subject")?;

    Ok(match row {
        Some(row) => Subject {
            name: row.get("name"),
            email: row.get("email"),
            role: row.get("role"),
            company_name: row.get("company_name"),
        },
        None => Subject::placeholder(survey_company),
    })
}

pub async fn fetch_participation(
    pool: &PgPool,
    survey_id: Uuid,
) -> anyhow::Result<Vec<ParticipationStat>> {
    let rows = sqlx::query(
        r#"
        SELECT sp.feedback_type,
               COUNT(DISTINCT sp.employee_id) AS invited,
               COUNT(DISTINCT sr.employee_email) AS responded
        FROM feedback360.survey_participants sp
        JOIN feedback360.employees e ON e.id = sp.employee_id
        LEFT JOIN feedback360.survey_responses sr
          ON sr.survey_id = sp.survey_id
         AND sr.feedback_type = sp.feedback_type
         AND sr.employee_email = e.email
        WHERE sp.survey_id = $1
        GROUP BY sp.feedback_type
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
    .context("failed to load participation")?;

    let mut stats = Vec::new();
    for row in rows {
        stats.push(ParticipationStat {
            feedback_type: parse_column(&row, "feedback_type")?,
            invited: row.get("invited"),
            responded: row.get("responded"),
        });
    }
    stats.sort_by_key(|stat| stat.feedback_type);
    Ok(stats)
}

pub async fn fetch_questions(
    pool: &PgPool,
    survey_id: Uuid,
) -> anyhow::Result<Vec<SurveyQuestion>> {
    let rows = sqlx::query(
        r#"
        SELECT id, feedback_type, category_name, question_text, question_type, position
        FROM feedback360.survey_questions
        WHERE survey_id = $1
        ORDER BY category_name, position
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
    .context("failed to load questions")?;

    let mut questions = Vec::new();
    for row in rows {
        questions.push(SurveyQuestion {
            id: row.get("id"),
            feedback_type: parse_column(&row, "feedback_type")?,
            category_name: row.get("category_name"),
            question_text: row.get("question_text"),
            question_type: parse_column(&row, "question_type")?,
            position: row.get("position"),
        });
    }
    Ok(questions)
}

pub async fn fetch_options(pool: &PgPool, survey_id: Uuid) -> anyhow::Result<Vec<QuestionOption>> {
    let rows = sqlx::query(
        r#"
        SELECT o.survey_question_id, o.option_text, o.position
        FROM feedback360.survey_question_options o
        JOIN feedback360.survey_questions q ON q.id = o.survey_question_id
        WHERE q.survey_id = $1
        ORDER BY o.survey_question_id, o.position
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
    .context("failed to load question options")?;

    Ok(rows
        .into_iter()
        .map(|row| QuestionOption {
            question_id: row.get("survey_question_id"),
            option_text: row.get("option_text"),
            position: row.get("position"),
        })
        .collect())
}

pub async fn fetch_responses(
    pool: &PgPool,
    survey_id: Uuid,
) -> anyhow::Result<Vec<ResponseRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT r.question_id, r.employee_email, e.id AS rater_employee_id,
               r.subject_employee_id, r.feedback_type, r.response_text
        FROM feedback360.survey_responses r
        LEFT JOIN feedback360.employees e ON e.email = r.employee_email
        WHERE r.survey_id = $1
        ORDER BY r.created_at, r.id
        "#,
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await
    .context("failed to load responses")?;

    let mut responses = Vec::new();
    for row in rows {
        responses.push(ResponseRecord {
            question_id: row.get("question_id"),
            employee_email: row.get("employee_email"),
            rater_employee_id: row.get("rater_employee_id"),
            subject_employee_id: row.get("subject_employee_id"),
            feedback_type: parse_column(&row, "feedback_type")?,
            response_text: row.get("response_text"),
        });
    }
    Ok(responses)
}

pub async fn load_survey_data(pool: &PgPool, survey_id: Uuid) -> anyhow::Result<SurveyData> {
    let survey = fetch_survey(pool, survey_id).await?;
    let subject = fetch_subject(pool, survey_id, survey.company_name.as_deref()).await?;
    let participation = fetch_participation(pool, survey_id).await?;
    let questions = fetch_questions(pool, survey_id).await?;
    let options = fetch_options(pool, survey_id).await?;
    let responses = fetch_responses(pool, survey_id).await?;

    info!(
        %survey_id,
        status = survey.status.as_str(),
        questions = questions.len(),
        responses = responses.len(),
        "loaded survey data"
    );

    Ok(SurveyData {
        survey,
        subject,
        participation,
        questions,
        options,
        responses,
    })
}

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::bail;
use uuid::Uuid;

use crate::models::{
    CategoryAverage, FeedbackType, ParticipationStat, QuestionOption, QuestionScore, QuestionType,
    ResponseRecord, SurveyQuestion, TypeAverage, Verbatim, VerbatimIndex,
};

pub const DEFAULT_CATEGORY: &str = "General";

pub fn category_label(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

pub fn question_scores(
    questions: &[SurveyQuestion],
    options: &[QuestionOption],
    responses: &[ResponseRecord],
) -> Vec<QuestionScore> {
    let mut scale: HashMap<(Uuid, &str), i32> = HashMap::new();
    for option in options {
        // repeated option text scores at its lowest position
        let position = scale
            .entry((option.question_id, option.option_text.as_str()))
            .or_insert(option.position);
        *position = (*position).min(option.position);
    }

    let mut matched: HashMap<Uuid, Vec<i32>> = HashMap::new();
    for response in responses {
        let Some(text) = response.response_text.as_deref() else {
            continue;
        };
        if let Some(position) = scale.get(&(response.question_id, text)) {
            matched.entry(response.question_id).or_default().push(*position);
        }
    }

    let mut scores: Vec<QuestionScore> = questions
        .iter()
        .filter(|question| question.question_type == QuestionType::Mcq)
        .filter_map(|question| {
            let positions = matched.remove(&question.id)?;
            let total: i64 = positions.iter().map(|p| i64::from(*p)).sum();
            Some(QuestionScore {
                question_id: question.id,
                category: category_label(question.category_name.as_deref()),
                question_text: question.question_text.clone(),
                feedback_type: question.feedback_type,
                position: question.position,
                mean_score: total as f64 / positions.len() as f64,
                response_count: positions.len(),
                individual_scores: positions,
            })
        })
        .collect();

    scores.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then(a.position.cmp(&b.position))
            .then(a.feedback_type.cmp(&b.feedback_type))
    });
    scores
}

/// The overall figure pools every question mean in the category regardless of
/// feedback type (sum of all per-type totals over the count of all questions).
pub fn category_averages(scores: &[QuestionScore]) -> Vec<CategoryAverage> {
    let mut grouped: BTreeMap<&str, BTreeMap<FeedbackType, TypeAverage>> = BTreeMap::new();

    for score in scores {
        let entry = grouped
            .entry(score.category.as_str())
            .or_default()
            .entry(score.feedback_type)
            .or_default();
        entry.total += score.mean_score;
        entry.count += 1;
        entry.response_count += score.response_count;
    }

    grouped
        .into_iter()
        .map(|(category, mut types)| {
            let (sum, count) = types
                .values()
                .fold((0.0, 0usize), |(sum, count), t| (sum + t.total, count + t.count));
            for type_average in types.values_mut() {
                type_average.average = if type_average.count == 0 {
                    0.0
                } else {
                    type_average.total / type_average.count as f64
                };
            }
            CategoryAverage {
                category: category.to_string(),
                types,
                overall: if count == 0 { 0.0 } else { sum / count as f64 },
            }
        })
        .collect()
}

pub fn group_verbatims(
    questions: &[SurveyQuestion],
    responses: &[ResponseRecord],
) -> VerbatimIndex {
    let text_questions: HashMap<Uuid, &SurveyQuestion> = questions
        .iter()
        .filter(|question| question.question_type == QuestionType::Text)
        .map(|question| (question.id, question))
        .collect();

    let mut index = VerbatimIndex::new();
    for response in responses {
        let Some(question) = text_questions.get(&response.question_id) else {
            continue;
        };
        let text = response.response_text.as_deref().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        index
            .entry(category_label(question.category_name.as_deref()))
            .or_default()
            .entry(question.feedback_type)
            .or_default()
            .push(Verbatim {
                question: question.question_text.clone(),
                response: text.to_string(),
            });
    }
    index
}

pub fn split_recommendations(
    categories: &[CategoryAverage],
) -> (Vec<&CategoryAverage>, Vec<&CategoryAverage>) {
    let mut sorted: Vec<&CategoryAverage> = categories.iter().collect();
    sorted.sort_by(|a, b| {
        b.overall
            .partial_cmp(&a.overall)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // top half rounded up, bottom half rounded down: a lone category is only a strength
    let strengths = sorted.len().div_ceil(2);
    let development = sorted.len() / 2;
    let bottom = sorted[sorted.len() - development..].to_vec();
    sorted.truncate(strengths);
    (sorted, bottom)
}

pub fn response_rate(stat: &ParticipationStat) -> i64 {
    if stat.invited <= 0 {
        return 0;
    }
    (stat.responded as f64 / stat.invited as f64 * 100.0).round() as i64
}

pub fn check_rater_relationship(
    feedback_type: FeedbackType,
    rater_employee_id: Uuid,
    subject_employee_id: Uuid,
) -> anyhow::Result<()> {
    if feedback_type == FeedbackType::SelfAssessment && rater_employee_id != subject_employee_id {
        bail!(
            "self feedback must be about the rater: \
             rater {rater_employee_id} rated subject {subject_employee_id}"
        );
    }
    Ok(())
}

// unknown raters count as mismatches
pub fn self_feedback_mismatches(responses: &[ResponseRecord]) -> Vec<&ResponseRecord> {
    responses
        .iter()
        .filter(|response| response.feedback_type == FeedbackType::SelfAssessment)
        .filter(|response| match (response.rater_employee_id, response.subject_employee_id) {
            (Some(rater), Some(subject)) => rater != subject,
            _ => true,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCount {
    pub respondents: usize,
    pub total: usize,
}

pub fn response_counts(responses: &[ResponseRecord]) -> BTreeMap<FeedbackType, ResponseCount> {
    let mut raters: BTreeMap<FeedbackType, BTreeSet<&str>> = BTreeMap::new();
    let mut totals: BTreeMap<FeedbackType, usize> = BTreeMap::new();

    for response in responses {
        raters
            .entry(response.feedback_type)
            .or_default()
            .insert(response.employee_email.as_str());
        *totals.entry(response.feedback_type).or_default() += 1;
    }

    totals
        .into_iter()
        .map(|(feedback_type, total)| {
            let respondents = raters.get(&feedback_type).map_or(0, BTreeSet::len);
            (feedback_type, ResponseCount { respondents, total })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCALE: [&str; 5] = [
        "Strongly Disagree",
        "Disagree",
        "Neutral",
        "Agree",
        "Strongly Agree",
    ];

    fn question(
        feedback_type: FeedbackType,
        category: Option<&str>,
        question_type: QuestionType,
        position: i32,
    ) -> SurveyQuestion {
        SurveyQuestion {
            id: Uuid::new_v4(),
            feedback_type,
            category_name: category.map(str::to_string),
            question_text: format!("{category:?} {feedback_type} Q{position}"),
            question_type,
            position,
        }
    }

    fn options_for(question: &SurveyQuestion) -> Vec<QuestionOption> {
        SCALE
            .iter()
            .enumerate()
            .map(|(index, text)| QuestionOption {
                question_id: question.id,
                option_text: text.to_string(),
                position: index as i32 + 1,
            })
            .collect()
    }

    fn answer(question: &SurveyQuestion, text: &str) -> ResponseRecord {
        ResponseRecord {
            question_id: question.id,
            employee_email: format!("rater-{}@example.com", Uuid::new_v4()),
            rater_employee_id: None,
            subject_employee_id: None,
            feedback_type: question.feedback_type,
            response_text: Some(text.to_string()),
        }
    }

    fn answers_at(question: &SurveyQuestion, positions: &[usize]) -> Vec<ResponseRecord> {
        positions
            .iter()
            .map(|position| answer(question, SCALE[position - 1]))
            .collect()
    }

    #[test]
    fn manager_mean_matches_worked_example() {
        let q = question(FeedbackType::Manager, Some("Communication"), QuestionType::Mcq, 1);
        let responses = answers_at(&q, &[3, 4, 4, 5, 3]);

        let scores = question_scores(&[q.clone()], &options_for(&q), &responses);
        assert_eq!(scores.len(), 1);
        assert!((scores[0].mean_score - 3.8).abs() < 1e-9);
        assert_eq!(scores[0].response_count, 5);
        assert_eq!(scores[0].individual_scores, vec![3, 4, 4, 5, 3]);
    }

    #[test]
    fn unmatched_text_is_dropped() {
        let q = question(FeedbackType::Peer, Some("Delivery"), QuestionType::Mcq, 1);
        let mut responses = answers_at(&q, &[2, 4]);
        responses.push(answer(&q, "strongly agree"));
        responses.push(answer(&q, "Maybe"));
        responses.push(ResponseRecord {
            response_text: None,
            ..answer(&q, "")
        });

        let scores = question_scores(&[q.clone()], &options_for(&q), &responses);
        assert_eq!(scores[0].response_count, 2);
        assert!((scores[0].mean_score - 3.0).abs() < 1e-9);
    }

    #[test]
    fn option_text_only_matches_its_own_question() {
        let first = question(FeedbackType::Peer, Some("Delivery"), QuestionType::Mcq, 1);
        let second = question(FeedbackType::Peer, Some("Delivery"), QuestionType::Mcq, 2);
        let responses = answers_at(&second, &[5]);

        let scores = question_scores(&[first.clone(), second], &options_for(&first), &responses);
        assert!(scores.is_empty());
    }

    #[test]
    fn repeated_option_text_scores_once_at_lowest_position() {
        let q = question(FeedbackType::Peer, Some("Delivery"), QuestionType::Mcq, 1);
        let options = vec![
            QuestionOption {
                question_id: q.id,
                option_text: "Agree".to_string(),
                position: 4,
            },
            QuestionOption {
                question_id: q.id,
                option_text: "Agree".to_string(),
                position: 2,
            },
        ];
        let responses = vec![answer(&q, "Agree")];

        let scores = question_scores(&[q], &options, &responses);
        assert_eq!(scores[0].response_count, 1);
        assert_eq!(scores[0].individual_scores, vec![2]);
        assert!((scores[0].mean_score - 2.0).abs() < 1e-9);
    }

    #[test]
    fn text_questions_never_score() {
        let q = question(FeedbackType::Manager, Some("Communication"), QuestionType::Text, 1);
        let options = options_for(&q);
        let responses = vec![answer(&q, "Agree")];

        assert!(question_scores(&[q], &options, &responses).is_empty());
    }

    #[test]
    fn scores_are_ordered_by_category_position_then_type() {
        let questions = vec![
            question(FeedbackType::Reportee, Some("Vision"), QuestionType::Mcq, 1),
            question(FeedbackType::Peer, Some("Coaching"), QuestionType::Mcq, 2),
            question(FeedbackType::Manager, Some("Coaching"), QuestionType::Mcq, 1),
            question(FeedbackType::SelfAssessment, Some("Coaching"), QuestionType::Mcq, 1),
        ];
        let options: Vec<QuestionOption> = questions.iter().flat_map(options_for).collect();
        let responses: Vec<ResponseRecord> = questions
            .iter()
            .flat_map(|q| answers_at(q, &[4]))
            .collect();

        let order: Vec<(String, i32, FeedbackType)> =
            question_scores(&questions, &options, &responses)
                .into_iter()
                .map(|s| (s.category, s.position, s.feedback_type))
                .collect();
        assert_eq!(
            order,
            vec![
                ("Coaching".to_string(), 1, FeedbackType::SelfAssessment),
                ("Coaching".to_string(), 1, FeedbackType::Manager),
                ("Coaching".to_string(), 2, FeedbackType::Peer),
                ("Vision".to_string(), 1, FeedbackType::Reportee),
            ]
        );
    }

    #[test]
    fn overall_pools_question_means_across_types() {
        let questions = vec![
            question(FeedbackType::SelfAssessment, Some("Coaching"), QuestionType::Mcq, 1),
            question(FeedbackType::Manager, Some("Coaching"), QuestionType::Mcq, 1),
            question(FeedbackType::Manager, Some("Coaching"), QuestionType::Mcq, 2),
            question(FeedbackType::Manager, Some("Coaching"), QuestionType::Mcq, 3),
        ];
        let options: Vec<QuestionOption> = questions.iter().flat_map(options_for).collect();
        let mut responses = answers_at(&questions[0], &[5]);
        responses.extend(answers_at(&questions[1], &[2]));
        responses.extend(answers_at(&questions[2], &[2]));
        responses.extend(answers_at(&questions[3], &[2]));

        let categories = category_averages(&question_scores(&questions, &options, &responses));
        assert_eq!(categories.len(), 1);
        let coaching = &categories[0];

        // (5 + 2 + 2 + 2) / 4, not (5 + 2) / 2
        assert!((coaching.overall - 2.75).abs() < 1e-9);
        assert!((coaching.types[&FeedbackType::SelfAssessment].average - 5.0).abs() < 1e-9);
        assert!((coaching.types[&FeedbackType::Manager].average - 2.0).abs() < 1e-9);
        assert_eq!(coaching.types[&FeedbackType::Manager].count, 3);
    }

    #[test]
    fn overall_lies_between_type_averages() {
        let questions = vec![
            question(FeedbackType::SelfAssessment, Some("Vision"), QuestionType::Mcq, 1),
            question(FeedbackType::Manager, Some("Vision"), QuestionType::Mcq, 1),
            question(FeedbackType::Peer, Some("Vision"), QuestionType::Mcq, 1),
            question(FeedbackType::Peer, Some("Vision"), QuestionType::Mcq, 2),
            question(FeedbackType::Reportee, Some("Vision"), QuestionType::Mcq, 1),
        ];
        let options: Vec<QuestionOption> = questions.iter().flat_map(options_for).collect();
        let mut responses = answers_at(&questions[0], &[4, 4]);
        responses.extend(answers_at(&questions[1], &[1, 2, 3]));
        responses.extend(answers_at(&questions[2], &[5, 5, 4]));
        responses.extend(answers_at(&questions[3], &[3]));
        responses.extend(answers_at(&questions[4], &[2, 5]));

        for category in category_averages(&question_scores(&questions, &options, &responses)) {
            let averages: Vec<f64> = category.types.values().map(|t| t.average).collect();
            let min = averages.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = averages.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert!(category.overall >= min - 1e-9 && category.overall <= max + 1e-9);
        }
    }

    #[test]
    fn category_response_counts_sum_to_matched_responses() {
        let questions = vec![
            question(FeedbackType::Manager, Some("Coaching"), QuestionType::Mcq, 1),
            question(FeedbackType::Peer, Some("Delivery"), QuestionType::Mcq, 1),
            question(FeedbackType::Peer, None, QuestionType::Mcq, 2),
            question(FeedbackType::Peer, Some("Delivery"), QuestionType::Text, 3),
        ];
        let options: Vec<QuestionOption> = questions.iter().flat_map(options_for).collect();
        let mut responses = answers_at(&questions[0], &[1, 2, 3]);
        responses.extend(answers_at(&questions[1], &[4, 5]));
        responses.extend(answers_at(&questions[2], &[3]));
        responses.push(answer(&questions[1], "no idea"));
        responses.push(answer(&questions[3], "Great partner"));

        let scores = question_scores(&questions, &options, &responses);
        let categories = category_averages(&scores);
        let per_category: usize = categories.iter().map(CategoryAverage::response_count).sum();
        assert_eq!(per_category, 6);
        assert_eq!(per_category, scores.iter().map(|s| s.response_count).sum::<usize>());
    }

    #[test]
    fn categories_without_scores_are_omitted() {
        let scored = question(FeedbackType::Manager, Some("Coaching"), QuestionType::Mcq, 1);
        let silent = question(FeedbackType::Manager, Some("Vision"), QuestionType::Mcq, 2);
        let mut options = options_for(&scored);
        options.extend(options_for(&silent));
        let responses = answers_at(&scored, &[4]);

        let categories =
            category_averages(&question_scores(&[scored, silent], &options, &responses));
        let names: Vec<&str> = categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["Coaching"]);
    }

    #[test]
    fn missing_category_falls_back_to_general() {
        assert_eq!(category_label(None), "General");
        assert_eq!(category_label(Some("  ")), "General");
        assert_eq!(category_label(Some("Vision")), "Vision");
    }

    #[test]
    fn verbatims_skip_blank_text_and_group_by_type() {
        let text_self =
            question(FeedbackType::SelfAssessment, Some("Vision"), QuestionType::Text, 3);
        let text_peer = question(FeedbackType::Peer, Some("Vision"), QuestionType::Text, 3);
        let mcq = question(FeedbackType::Peer, Some("Vision"), QuestionType::Mcq, 1);
        let responses = vec![
            answer(&text_self, "I want to delegate more."),
            answer(&text_peer, "   "),
            answer(&text_peer, " Shares context early. "),
            answer(&mcq, "Agree"),
        ];

        let index = group_verbatims(&[text_self, text_peer, mcq], &responses);
        let vision = &index["Vision"];
        assert_eq!(vision.len(), 2);
        assert_eq!(vision[&FeedbackType::Peer].len(), 1);
        assert_eq!(vision[&FeedbackType::Peer][0].response, "Shares context early.");
        assert_eq!(
            vision[&FeedbackType::SelfAssessment][0].response,
            "I want to delegate more."
        );
    }

    fn category(name: &str, overall: f64) -> CategoryAverage {
        CategoryAverage {
            category: name.to_string(),
            types: BTreeMap::new(),
            overall,
        }
    }

    #[test]
    fn recommendations_split_top_and_bottom_half() {
        let categories = vec![
            category("Coaching", 3.1),
            category("Vision", 4.6),
            category("Delivery", 2.4),
            category("Trust", 3.9),
            category("Focus", 3.5),
        ];

        let (strengths, development) = split_recommendations(&categories);
        let strengths: Vec<&str> = strengths.iter().map(|c| c.category.as_str()).collect();
        let development: Vec<&str> = development.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(strengths, vec!["Vision", "Trust", "Focus"]);
        assert_eq!(development, vec!["Coaching", "Delivery"]);
    }

    #[test]
    fn single_category_is_a_strength_and_never_a_priority() {
        let categories = vec![category("Vision", 2.0)];
        let (strengths, development) = split_recommendations(&categories);
        assert_eq!(strengths.len(), 1);
        assert!(development.is_empty());

        let (strengths, development) = split_recommendations(&[]);
        assert!(strengths.is_empty() && development.is_empty());
    }

    #[test]
    fn response_rate_rounds_and_handles_no_invites() {
        let stat = |invited, responded| ParticipationStat {
            feedback_type: FeedbackType::Peer,
            invited,
            responded,
        };
        assert_eq!(response_rate(&stat(3, 2)), 67);
        assert_eq!(response_rate(&stat(8, 1)), 13);
        assert_eq!(response_rate(&stat(4, 4)), 100);
        assert_eq!(response_rate(&stat(0, 0)), 0);
    }

    #[test]
    fn self_feedback_must_target_the_rater() {
        let rater = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(check_rater_relationship(FeedbackType::SelfAssessment, rater, rater).is_ok());
        assert!(check_rater_relationship(FeedbackType::SelfAssessment, rater, other).is_err());
        assert!(check_rater_relationship(FeedbackType::Peer, rater, other).is_ok());
    }

    #[test]
    fn detects_self_responses_about_someone_else() {
        let q = question(FeedbackType::SelfAssessment, Some("Vision"), QuestionType::Mcq, 1);
        let rater = Uuid::new_v4();
        let consistent = ResponseRecord {
            rater_employee_id: Some(rater),
            subject_employee_id: Some(rater),
            ..answer(&q, "Agree")
        };
        let crossed = ResponseRecord {
            rater_employee_id: Some(rater),
            subject_employee_id: Some(Uuid::new_v4()),
            ..answer(&q, "Agree")
        };
        let unknown_rater = answer(&q, "Agree");

        let responses = vec![consistent, crossed, unknown_rater];
        assert_eq!(self_feedback_mismatches(&responses).len(), 2);
    }

    #[test]
    fn counts_distinct_respondents_per_type() {
        let q = question(FeedbackType::Peer, Some("Vision"), QuestionType::Mcq, 1);
        let mut first = answer(&q, "Agree");
        first.employee_email = "frank@acme.com".to_string();
        let mut second = first.clone();
        second.response_text = Some("Neutral".to_string());
        let third = answer(&q, "Agree");

        let counts = response_counts(&[first, second, third]);
        assert_eq!(
            counts[&FeedbackType::Peer],
            ResponseCount {
                respondents: 2,
                total: 3
            }
        );
    }
}

use std::fmt::Write;

use super::scale::{format_score, interpretation, visual_scale, RATING_SCALE};
use super::{format_date, ReportData, CONFIDENTIAL_NOTICE, INTRODUCTION, NEXT_STEPS};
use crate::aggregate;

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

pub fn render(data: &ReportData) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# 360° Leadership Feedback Report");
    let _ = writeln!(output);
    let _ = writeln!(output, "- Participant: {}", data.subject.name);
    let _ = writeln!(output, "- Position: {}", data.subject.role);
    let _ = writeln!(output, "- Organization: {}", data.subject.company_name);
    let _ = writeln!(output, "- Survey: {}", data.survey.title);
    let _ = writeln!(output, "- Assessment Period: {}", data.assessment_period());
    let _ = writeln!(
        output,
        "- Report Generated: {}",
        format_date(Some(data.generated_on))
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "**CONFIDENTIAL** {CONFIDENTIAL_NOTICE}");

    let _ = writeln!(output);
    let _ = writeln!(output, "## Introduction & Overview");
    let _ = writeln!(output, "{INTRODUCTION}");
    let _ = writeln!(output);
    let _ = writeln!(output, "Rating Scale:");
    for (value, meaning) in RATING_SCALE {
        let _ = writeln!(output, "- {value} = {meaning}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Participation Summary");
    if data.participation.is_empty() {
        let _ = writeln!(output, "No participants invited to this survey.");
    } else {
        let _ = writeln!(
            output,
            "| Feedback Source | Invited | Responded | Response Rate |"
        );
        let _ = writeln!(output, "|---|---:|---:|---:|");
        for stat in &data.participation {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {}% |",
                stat.feedback_type.label(),
                stat.invited,
                stat.responded,
                aggregate::response_rate(stat)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall Results Summary");
    if data.categories.is_empty() {
        let _ = writeln!(output, "No scored responses recorded for this survey.");
    } else {
        let _ = writeln!(
            output,
            "| Leadership Area | Overall Score | Visual Scale | Performance Level |"
        );
        let _ = writeln!(output, "|---|---:|---|---|");
        for category in &data.categories {
            let _ = writeln!(
                output,
                "| {} | {} | `{}` | {} |",
                table_cell(&category.category),
                format_score(category.overall),
                visual_scale(category.overall),
                interpretation(category.overall)
            );
        }
    }

    for category in &data.categories {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", category.category);
        let _ = writeln!(
            output,
            "Overall Category Score: {} - {}",
            format_score(category.overall),
            interpretation(category.overall)
        );
        let _ = writeln!(output);
        for (feedback_type, average) in &category.types {
            let _ = writeln!(
                output,
                "- {}: {} `{}` across {} questions",
                feedback_type.label(),
                format_score(average.average),
                visual_scale(average.average),
                average.count
            );
        }

        for group in data.question_groups(&category.category) {
            let _ = writeln!(output);
            let _ = writeln!(output, "### {}", group.question_text);
            for score in group.scores {
                let individual = score
                    .individual_scores
                    .iter()
                    .map(i32::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let _ = writeln!(
                    output,
                    "- {} ({} responses): {} `{}` ({})",
                    score.feedback_type.label(),
                    score.response_count,
                    format_score(score.mean_score),
                    visual_scale(score.mean_score),
                    individual
                );
            }
        }

        if let Some(verbatims) = data.verbatims_for(&category.category) {
            let _ = writeln!(output);
            let _ = writeln!(output, "### Verbatim Comments");
            for (feedback_type, comments) in verbatims {
                if comments.is_empty() {
                    continue;
                }
                let _ = writeln!(output, "{} Feedback:", feedback_type.label());
                for comment in comments {
                    let _ = writeln!(output, "> \"{}\"", comment.response);
                }
            }
        }
    }

    let (strengths, development) = aggregate::split_recommendations(&data.categories);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Development Recommendations");
    let _ = writeln!(output, "### Key Strengths");
    for category in strengths {
        let _ = writeln!(
            output,
            "- {}: {} - {}",
            category.category,
            format_score(category.overall),
            interpretation(category.overall)
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "### Development Priorities");
    for category in development {
        let _ = writeln!(
            output,
            "- {}: {} - {}",
            category.category,
            format_score(category.overall),
            interpretation(category.overall)
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "### Next Steps");
    for (index, step) in NEXT_STEPS.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", index + 1, step);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::sample_report;

    #[test]
    fn lists_question_scores_with_individual_values() {
        let markdown = render(&sample_report());

        assert!(markdown.contains("### Explains decisions & context clearly"));
        assert!(markdown.contains("- Manager (2 responses): 4.50 `█ █ █ █ ▌` (4,5)"));
        assert!(markdown.contains("- Self (1 responses): 5.00 `█ █ █ █ █` (5)"));
    }

    #[test]
    fn includes_verbatims_under_their_category() {
        let markdown = render(&sample_report());

        let communication = markdown.find("## Communication").unwrap_or(usize::MAX);
        let verbatim = markdown
            .find("> \"Always shares <context> early\"")
            .unwrap_or(usize::MAX);
        let delegation = markdown.find("## Delegation").unwrap_or(usize::MAX);
        assert!(communication < verbatim && verbatim < delegation);
    }

    #[test]
    fn pipes_in_category_names_do_not_split_table_cells() {
        let mut report = sample_report();
        report.categories[1].category = "Delegation | Trust".to_string();

        let markdown = render(&report);
        assert!(markdown.contains("| Delegation \\| Trust | 2.50 |"));
        assert!(markdown.contains("## Delegation | Trust"));
    }

    #[test]
    fn empty_survey_still_renders_every_section() {
        let mut report = sample_report();
        report.categories.clear();
        report.question_scores.clear();
        report.participation.clear();

        let markdown = render(&report);
        assert!(markdown.contains("No participants invited to this survey."));
        assert!(markdown.contains("No scored responses recorded for this survey."));
        assert!(markdown.contains("## Development Recommendations"));
    }
}

use std::fmt::Write;

use super::scale::{
    format_score, interpretation, rate_color, score_bar, score_color, RATING_SCALE,
};
use super::{
    escape, format_date, ReportData, CONFIDENTIAL_NOTICE, INTRODUCTION, NEXT_STEPS, REPORT_TITLE,
};
use crate::aggregate;

const STYLE: &str = r#"
    @page { size: A4; margin: 0.75in; }
    body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; }
    .header { text-align: center; margin-bottom: 40px; border-bottom: 3px solid #1976D2; padding-bottom: 20px; }
    .title { font-size: 28px; font-weight: bold; color: #1976D2; margin-bottom: 20px; }
    .subtitle { font-size: 18px; color: #666; margin: 5px 0; }
    .section { margin: 30px 0; }
    .section-header { font-size: 22px; font-weight: bold; color: #1976D2; border-bottom: 2px solid #1976D2; padding-bottom: 8px; margin-bottom: 20px; }
    .category { page-break-before: always; }
    .category h2 { color: #1976D2; border-bottom: 3px solid #1976D2; padding-bottom: 10px; margin: 30px 0 20px 0; }
    .category-score { background-color: #E3F2FD; padding: 12px; border-radius: 6px; margin-bottom: 20px; color: #1976D2; font-weight: bold; }
    .question { margin: 20px 0; page-break-inside: avoid; }
    .question-text { background-color: #F8F9FA; padding: 12px; border-left: 4px solid #2196F3; margin-bottom: 8px; font-weight: bold; color: #1976D2; }
    .score-bar { display: inline-block; width: 120px; height: 20px; background-color: #F5F5F5; border-radius: 4px; padding: 2px; margin: 0 10px; vertical-align: middle; }
    .score-segment { width: 18%; height: 100%; display: inline-block; margin: 0 1px; border-radius: 2px; }
    .score { font-weight: bold; }
    .verbatim { font-style: italic; margin: 4px 0 4px 16px; }
    table { width: 100%; border-collapse: collapse; margin: 15px 0; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }
    th { background-color: #1976D2; color: white; padding: 14px 16px; text-align: left; font-weight: 600; font-size: 14px; }
    td { padding: 12px 16px; border-bottom: 1px solid #E0E0E0; }
    td.center, th.center { text-align: center; }
    tr:nth-child(even) { background-color: #F8F9FA; }
    .confidential { text-align: center; margin-top: 40px; padding: 20px; background-color: #FFF3E0; border: 2px solid #FF9800; border-radius: 8px; }
"#;

fn bar(score: f64) -> String {
    let segments: String = score_bar(score)
        .into_iter()
        .map(|segment| {
            format!(
                r#"<div class="score-segment" style="background-color: #{}; opacity: {};"></div>"#,
                segment.color, segment.opacity
            )
        })
        .collect();
    format!(r#"<div class="score-bar">{segments}</div>"#)
}

fn score_span(score: f64, size: u32) -> String {
    format!(
        r#"<span class="score" style="font-size: {size}px; color: #{};">{}</span>"#,
        score_color(score),
        format_score(score)
    )
}

pub fn render(data: &ReportData) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html>");
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, r#"<meta charset="UTF-8">"#);
    let _ = writeln!(output, "<title>360° Leadership Feedback Report</title>");
    let _ = writeln!(output, "<style>{STYLE}</style>");
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body>");

    write_header(&mut output, data);
    write_scale_legend(&mut output);
    write_participation(&mut output, data);
    write_overall_summary(&mut output, data);
    for category in &data.categories {
        write_category(&mut output, data, &category.category);
    }
    write_recommendations(&mut output, data);

    let _ = writeln!(
        output,
        r#"<div class="confidential"><strong>CONFIDENTIAL</strong><br>{CONFIDENTIAL_NOTICE}</div>"#
    );
    let _ = writeln!(output, "</body>");
    let _ = writeln!(output, "</html>");
    output
}

fn subtitle(output: &mut String, label: &str, value: &str) {
    let _ = writeln!(
        output,
        r#"<div class="subtitle"><strong>{label}:</strong> {}</div>"#,
        escape(value)
    );
}

fn write_header(output: &mut String, data: &ReportData) {
    let _ = writeln!(output, r#"<div class="header">"#);
    let _ = writeln!(output, r#"<div class="title">{REPORT_TITLE}</div>"#);
    subtitle(output, "Participant", &data.subject.name);
    subtitle(output, "Position", &data.subject.role);
    subtitle(output, "Organization", &data.subject.company_name);
    subtitle(output, "Survey", &data.survey.title);
    subtitle(output, "Assessment Period", &data.assessment_period());
    subtitle(output, "Report Generated", &format_date(Some(data.generated_on)));
    let _ = writeln!(output, "</div>");
}

fn write_scale_legend(output: &mut String) {
    let _ = writeln!(output, r#"<div class="section">"#);
    let _ = writeln!(output, r#"<div class="section-header">Introduction &amp; Overview</div>"#);
    let _ = writeln!(output, "<p>{INTRODUCTION}</p>");
    let _ = writeln!(output, "<p><strong>Rating Scale:</strong> This report uses a 5-point scale where:</p>");
    let _ = writeln!(output, "<ul>");
    for (value, meaning) in RATING_SCALE {
        let _ = writeln!(output, "<li>{value} = {meaning}</li>");
    }
    let _ = writeln!(output, "</ul>");
    let _ = writeln!(output, "</div>");
}

fn write_participation(output: &mut String, data: &ReportData) {
    let _ = writeln!(output, r#"<div class="section">"#);
    let _ = writeln!(output, r#"<div class="section-header">Participation Summary</div>"#);
    let _ = writeln!(output, "<table>");
    let _ = writeln!(
        output,
        r#"<thead><tr><th>Feedback Source</th><th class="center">Invited</th><th class="center">Responded</th><th class="center">Response Rate</th></tr></thead>"#
    );
    let _ = writeln!(output, "<tbody>");
    for stat in &data.participation {
        let rate = aggregate::response_rate(stat);
        let _ = writeln!(
            output,
            r#"<tr><td><strong>{}</strong></td><td class="center">{}</td><td class="center"><strong>{}</strong></td><td class="center"><span class="score" style="color: #{};">{}%</span></td></tr>"#,
            stat.feedback_type.label(),
            stat.invited,
            stat.responded,
            rate_color(rate),
            rate
        );
    }
    let _ = writeln!(output, "</tbody>");
    let _ = writeln!(output, "</table>");
    let _ = writeln!(output, "</div>");
}

fn write_overall_summary(output: &mut String, data: &ReportData) {
    let _ = writeln!(output, r#"<div class="section">"#);
    let _ = writeln!(output, r#"<div class="section-header">Overall Results Summary</div>"#);
    let _ = writeln!(output, "<table>");
    let _ = writeln!(
        output,
        r#"<thead><tr><th>Leadership Area</th><th class="center">Overall Score</th><th class="center">Visual Scale (1-5)</th><th>Performance Level</th></tr></thead>"#
    );
    let _ = writeln!(output, "<tbody>");
    for category in &data.categories {
        let _ = writeln!(
            output,
            r#"<tr><td><strong>{}</strong></td><td class="center">{}</td><td class="center">{}</td><td>{}</td></tr>"#,
            escape(&category.category),
            score_span(category.overall, 20),
            bar(category.overall),
            interpretation(category.overall)
        );
    }
    let _ = writeln!(output, "</tbody>");
    let _ = writeln!(output, "</table>");
    let _ = writeln!(output, "</div>");
}

fn write_category(output: &mut String, data: &ReportData, name: &str) {
    let Some(category) = data.categories.iter().find(|c| c.category == name) else {
        return;
    };

    let _ = writeln!(output, r#"<div class="category">"#);
    let _ = writeln!(output, "<h2>{} - Detailed Question Results</h2>", escape(name));
    let _ = writeln!(
        output,
        r#"<div class="category-score">Overall Category Score: {} - {}</div>"#,
        format_score(category.overall),
        interpretation(category.overall)
    );

    let _ = writeln!(output, "<table>");
    let _ = writeln!(
        output,
        r#"<thead><tr><th>Feedback Source</th><th class="center">Average Score</th><th class="center">Visual Scale</th><th class="center"># Questions</th></tr></thead>"#
    );
    let _ = writeln!(output, "<tbody>");
    for (feedback_type, average) in &category.types {
        let _ = writeln!(
            output,
            r#"<tr><td><strong>{}</strong></td><td class="center">{}</td><td class="center">{}</td><td class="center">{}</td></tr>"#,
            feedback_type.label(),
            score_span(average.average, 16),
            bar(average.average),
            average.count
        );
    }
    let _ = writeln!(output, "</tbody>");
    let _ = writeln!(output, "</table>");

    for group in data.question_groups(name) {
        let _ = writeln!(output, r#"<div class="question">"#);
        let _ = writeln!(
            output,
            r#"<div class="question-text">{}</div>"#,
            escape(group.question_text)
        );
        let _ = writeln!(output, "<table>");
        let _ = writeln!(
            output,
            r#"<thead><tr><th>Feedback Source</th><th class="center">Score</th><th class="center">Visual Scale (1-5)</th><th class="center">Individual Scores</th></tr></thead>"#
        );
        let _ = writeln!(output, "<tbody>");
        for score in group.scores {
            let individual = score
                .individual_scores
                .iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(
                output,
                r#"<tr><td>{} ({} responses)</td><td class="center">{}</td><td class="center">{}</td><td class="center">{}</td></tr>"#,
                score.feedback_type.label(),
                score.response_count,
                score_span(score.mean_score, 18),
                bar(score.mean_score),
                individual
            );
        }
        let _ = writeln!(output, "</tbody>");
        let _ = writeln!(output, "</table>");
        let _ = writeln!(output, "</div>");
    }

    if let Some(verbatims) = data.verbatims_for(name) {
        let _ = writeln!(output, "<h3>Verbatim Comments</h3>");
        for (feedback_type, comments) in verbatims {
            if comments.is_empty() {
                continue;
            }
            let _ = writeln!(output, "<p><strong>{} Feedback:</strong></p>", feedback_type.label());
            for comment in comments {
                let _ = writeln!(
                    output,
                    r#"<p class="verbatim">&quot;{}&quot;</p>"#,
                    escape(&comment.response)
                );
            }
        }
    }

    let _ = writeln!(output, "</div>");
}

fn write_recommendations(output: &mut String, data: &ReportData) {
    let (strengths, development) = aggregate::split_recommendations(&data.categories);

    let _ = writeln!(output, r#"<div class="section category">"#);
    let _ = writeln!(output, r#"<div class="section-header">Development Recommendations</div>"#);

    let _ = writeln!(output, "<h3>Key Strengths</h3>");
    let _ = writeln!(output, "<p>Build on these areas of strength:</p>");
    let _ = writeln!(output, "<ul>");
    for category in strengths {
        let _ = writeln!(
            output,
            "<li>{}: {} - {}</li>",
            escape(&category.category),
            format_score(category.overall),
            interpretation(category.overall)
        );
    }
    let _ = writeln!(output, "</ul>");

    let _ = writeln!(output, "<h3>Development Priorities</h3>");
    let _ = writeln!(output, "<p>Focus development efforts on these areas:</p>");
    let _ = writeln!(output, "<ul>");
    for category in development {
        let _ = writeln!(
            output,
            "<li>{}: {} - {}</li>",
            escape(&category.category),
            format_score(category.overall),
            interpretation(category.overall)
        );
    }
    let _ = writeln!(output, "</ul>");

    let _ = writeln!(output, "<h3>Next Steps</h3>");
    let _ = writeln!(output, "<ol>");
    for step in NEXT_STEPS {
        let _ = writeln!(output, "<li>{step}</li>");
    }
    let _ = writeln!(output, "</ol>");
    let _ = writeln!(output, "</div>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::sample_report;

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing {needle:?}"))
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let html = render(&sample_report());

        let order = [
            "360° LEADERSHIP FEEDBACK REPORT",
            "Rating Scale:",
            "Participation Summary",
            "Overall Results Summary",
            "Communication - Detailed Question Results",
            "Delegation - Detailed Question Results",
            "Development Recommendations",
            "CONFIDENTIAL",
        ];
        let positions: Vec<usize> = order.iter().map(|needle| position(&html, needle)).collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn renders_scores_labels_and_rates() {
        let html = render(&sample_report());

        assert!(html.contains("4.75"));
        assert!(html.contains("Exceptional Performance"));
        assert!(html.contains("Needs Attention"));
        assert!(html.contains("67%"));
        assert!(html.contains("color: #FF9800;\">67%"));
        assert!(html.contains("<td>Manager (2 responses)</td>"));
        assert!(html.contains("<td class=\"center\">4,5</td>"));
    }

    #[test]
    fn escapes_user_text() {
        let html = render(&sample_report());

        assert!(html.contains("Explains decisions &amp; context clearly"));
        assert!(html.contains("Always shares &lt;context&gt; early"));
        assert!(!html.contains("<context>"));
    }

    #[test]
    fn recommendations_list_strengths_before_priorities() {
        let html = render(&sample_report());

        let strengths = position(&html, "Key Strengths");
        let priorities = position(&html, "Development Priorities");
        let communication = position(&html, "<li>Communication: 4.75 - Exceptional Performance</li>");
        let delegation = position(&html, "<li>Delegation: 2.50 - Needs Attention</li>");
        assert!(strengths < communication && communication < priorities && priorities < delegation);
    }
}

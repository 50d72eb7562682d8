use std::io::{Cursor, Write};

use anyhow::Context;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::scale::{
    format_score, interpretation, rate_color, score_color, visual_scale, RATING_SCALE,
};
use super::{
    escape, format_date, ReportData, CONFIDENTIAL_NOTICE, INTRODUCTION, NEXT_STEPS, REPORT_TITLE,
};
use crate::aggregate;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault></w:docDefaults>
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:color w:val="1976D2"/><w:sz w:val="36"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:color w:val="1976D2"/><w:sz w:val="28"/></w:rPr></w:style>
<w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:keepNext/><w:outlineLvl w:val="2"/></w:pPr><w:rPr><w:b/><w:color w:val="37474F"/><w:sz w:val="24"/></w:rPr></w:style>
</w:styles>"#;

// twips, 1in margins
const TEXT_WIDTH: u32 = 9360;

#[derive(Debug, Clone, Default)]
struct Run {
    text: String,
    bold: bool,
    italic: bool,
    // half-points
    size: Option<u32>,
    color: Option<&'static str>,
    font: Option<&'static str>,
}

impl Run {
    fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    fn size(mut self, half_points: u32) -> Self {
        self.size = Some(half_points);
        self
    }

    fn color(mut self, color: &'static str) -> Self {
        self.color = Some(color);
        self
    }

    fn mono(mut self) -> Self {
        self.font = Some("Consolas");
        self
    }

    fn xml(&self) -> String {
        let mut props = String::new();
        if let Some(font) = self.font {
            props.push_str(&format!(r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}"/>"#));
        }
        if self.bold {
            props.push_str("<w:b/>");
        }
        if self.italic {
            props.push_str("<w:i/>");
        }
        if let Some(color) = self.color {
            props.push_str(&format!(r#"<w:color w:val="{color}"/>"#));
        }
        if let Some(size) = self.size {
            props.push_str(&format!(r#"<w:sz w:val="{size}"/>"#));
        }
        format!(
            r#"<w:r><w:rPr>{props}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape(&self.text)
        )
    }
}

struct Cell {
    runs: Vec<Run>,
    centered: bool,
}

impl Cell {
    fn left(runs: Vec<Run>) -> Self {
        Self {
            runs,
            centered: false,
        }
    }

    fn center(runs: Vec<Run>) -> Self {
        Self {
            runs,
            centered: true,
        }
    }
}

#[derive(Default)]
struct Body {
    xml: String,
}

impl Body {
    fn paragraph(&mut self, style: Option<&str>, page_break: bool, centered: bool, runs: &[Run]) {
        let mut props = String::new();
        if let Some(style) = style {
            props.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
        }
        if page_break {
            props.push_str("<w:pageBreakBefore/>");
        }
        props.push_str(r#"<w:spacing w:after="150"/>"#);
        if centered {
            props.push_str(r#"<w:jc w:val="center"/>"#);
        }
        self.xml.push_str("<w:p><w:pPr>");
        self.xml.push_str(&props);
        self.xml.push_str("</w:pPr>");
        for run in runs {
            self.xml.push_str(&run.xml());
        }
        self.xml.push_str("</w:p>");
    }

    fn heading(&mut self, level: u8, text: &str, page_break: bool) {
        let style = format!("Heading{level}");
        self.paragraph(Some(&style), page_break, false, &[Run::new(text)]);
    }

    fn text(&mut self, runs: &[Run]) {
        self.paragraph(None, false, false, runs);
    }

    fn centered(&mut self, runs: &[Run]) {
        self.paragraph(None, false, true, runs);
    }

    fn spacer(&mut self) {
        self.paragraph(None, false, false, &[]);
    }

    fn table(&mut self, accent: &str, headers: &[&str], rows: Vec<Vec<Cell>>) {
        let columns = headers.len().max(1) as u32;
        let column_width = TEXT_WIDTH / columns;

        self.xml.push_str("<w:tbl><w:tblPr>");
        self.xml.push_str(r#"<w:tblW w:w="5000" w:type="pct"/>"#);
        self.xml.push_str("<w:tblBorders>");
        for edge in ["top", "left", "bottom", "right"] {
            self.xml.push_str(&format!(
                r#"<w:{edge} w:val="single" w:sz="8" w:space="0" w:color="{accent}"/>"#
            ));
        }
        for inside in ["insideH", "insideV"] {
            self.xml.push_str(&format!(
                r#"<w:{inside} w:val="single" w:sz="4" w:space="0" w:color="CCCCCC"/>"#
            ));
        }
        self.xml.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
        for _ in headers {
            self.xml
                .push_str(&format!(r#"<w:gridCol w:w="{column_width}"/>"#));
        }
        self.xml.push_str("</w:tblGrid>");

        self.xml.push_str("<w:tr>");
        for header in headers {
            self.cell(
                column_width,
                Some(accent),
                &Cell::left(vec![Run::new(*header).bold().color("FFFFFF")]),
            );
        }
        self.xml.push_str("</w:tr>");

        for row in rows {
            self.xml.push_str("<w:tr>");
            for cell in &row {
                self.cell(column_width, None, cell);
            }
            self.xml.push_str("</w:tr>");
        }
        self.xml.push_str("</w:tbl>");
    }

    fn cell(&mut self, width: u32, fill: Option<&str>, cell: &Cell) {
        self.xml.push_str("<w:tc><w:tcPr>");
        self.xml
            .push_str(&format!(r#"<w:tcW w:w="{width}" w:type="dxa"/>"#));
        if let Some(fill) = fill {
            self.xml.push_str(&format!(
                r#"<w:shd w:val="clear" w:color="auto" w:fill="{fill}"/>"#
            ));
        }
        self.xml.push_str("</w:tcPr><w:p><w:pPr>");
        if cell.centered {
            self.xml.push_str(r#"<w:jc w:val="center"/>"#);
        }
        self.xml.push_str("</w:pPr>");
        for run in &cell.runs {
            self.xml.push_str(&run.xml());
        }
        self.xml.push_str("</w:p></w:tc>");
    }

    fn into_document(self) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                "<w:body>{}",
                r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/>"#,
                r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>"#,
                "</w:sectPr></w:body></w:document>"
            ),
            self.xml
        )
    }
}

fn score_cell(score: f64, size: u32) -> Cell {
    Cell::center(vec![Run::new(format_score(score))
        .bold()
        .size(size)
        .color(score_color(score))])
}

fn scale_cell(score: f64, size: u32) -> Cell {
    Cell::center(vec![Run::new(visual_scale(score))
        .mono()
        .size(size)
        .color(score_color(score))])
}

fn build_body(data: &ReportData) -> Body {
    let mut body = Body::default();

    body.heading(1, REPORT_TITLE, false);
    body.spacer();
    body.text(&[Run::new(format!("Participant: {}", data.subject.name)).bold().size(28)]);
    body.text(&[Run::new(format!("Position: {}", data.subject.role)).size(24)]);
    body.text(&[Run::new(format!("Organization: {}", data.subject.company_name)).size(24)]);
    body.spacer();
    body.text(&[Run::new(format!("Survey: {}", data.survey.title)).size(22)]);
    body.text(&[Run::new(format!("Assessment Period: {}", data.assessment_period())).size(22)]);
    body.text(&[Run::new(format!(
        "Report Generated: {}",
        format_date(Some(data.generated_on))
    ))
    .size(22)]);
    body.spacer();
    body.centered(&[Run::new("CONFIDENTIAL").bold().size(20)]);
    body.centered(&[Run::new(CONFIDENTIAL_NOTICE).italic().size(18)]);

    body.heading(1, "Introduction & Overview", true);
    body.text(&[Run::new(INTRODUCTION)]);
    body.spacer();
    body.text(&[Run::new("Rating Scale:").bold()]);
    body.text(&[Run::new("This report uses a 5-point scale where:")]);
    for (value, meaning) in RATING_SCALE {
        body.text(&[Run::new(format!("• {value} = {meaning}"))]);
    }
    body.spacer();

    body.heading(2, "Participation Summary", false);
    let participation = data
        .participation
        .iter()
        .map(|stat| {
            let rate = aggregate::response_rate(stat);
            vec![
                Cell::left(vec![Run::new(stat.feedback_type.label()).bold()]),
                Cell::center(vec![Run::new(stat.invited.to_string()).size(22)]),
                Cell::center(vec![Run::new(stat.responded.to_string()).bold().size(22)]),
                Cell::center(vec![Run::new(format!("{rate}%"))
                    .bold()
                    .size(22)
                    .color(rate_color(rate))]),
            ]
        })
        .collect();
    body.table(
        "1976D2",
        &["Feedback Source", "Invited", "Responded", "Response Rate"],
        participation,
    );
    body.spacer();

    body.heading(2, "Overall Results Summary", false);
    let summary = data
        .categories
        .iter()
        .map(|category| {
            vec![
                Cell::left(vec![Run::new(category.category.as_str()).bold()]),
                score_cell(category.overall, 24),
                scale_cell(category.overall, 18),
                Cell::center(vec![Run::new(interpretation(category.overall)).size(20)]),
            ]
        })
        .collect();
    body.table(
        "2E7D32",
        &["Leadership Area", "Overall Score", "Visual Scale", "Performance Level"],
        summary,
    );
    body.spacer();

    body.heading(1, "Detailed Results by Leadership Area", true);
    for category in &data.categories {
        body.heading(2, &category.category, false);
        body.text(&[Run::new(format!(
            "Overall Category Score: {} - {}",
            format_score(category.overall),
            interpretation(category.overall)
        ))
        .bold()]);
        body.spacer();

        let by_type = category
            .types
            .iter()
            .map(|(feedback_type, average)| {
                vec![
                    Cell::left(vec![Run::new(feedback_type.label()).bold()]),
                    score_cell(average.average, 22),
                    scale_cell(average.average, 16),
                    Cell::center(vec![Run::new(average.count.to_string()).size(20)]),
                ]
            })
            .collect();
        body.table(
            "424242",
            &["Feedback Source", "Average Score", "Visual Scale", "# Questions"],
            by_type,
        );
        body.spacer();

        let groups = data.question_groups(&category.category);
        if !groups.is_empty() {
            body.heading(3, "Question-Level Results", false);
        }
        for group in groups {
            let rows = group
                .scores
                .iter()
                .map(|score| {
                    let individual = score
                        .individual_scores
                        .iter()
                        .map(i32::to_string)
                        .collect::<Vec<_>>()
                        .join(",");
                    vec![
                        Cell::left(vec![Run::new(format!(
                            "{} ({} responses)",
                            score.feedback_type.label(),
                            score.response_count
                        ))]),
                        Cell::center(vec![
                            Run::new(format_score(score.mean_score))
                                .bold()
                                .size(24)
                                .color(score_color(score.mean_score)),
                            Run::new("  "),
                            Run::new(visual_scale(score.mean_score))
                                .mono()
                                .size(16)
                                .color(score_color(score.mean_score)),
                            Run::new(format!("  ({individual})")).italic().size(16),
                        ]),
                    ]
                })
                .collect();
            body.table("37474F", &[group.question_text, "Score | Visual Scale (1-5)"], rows);
            body.spacer();
        }

        if let Some(verbatims) = data.verbatims_for(&category.category) {
            body.heading(3, "Verbatim Comments", false);
            for (feedback_type, comments) in verbatims {
                if comments.is_empty() {
                    continue;
                }
                body.text(&[Run::new(format!("{} Feedback:", feedback_type.label())).bold()]);
                for comment in comments {
                    body.text(&[Run::new(format!("\"{}\"", comment.response)).italic()]);
                }
                body.spacer();
            }
        }
        body.spacer();
    }

    let (strengths, development) = aggregate::split_recommendations(&data.categories);
    body.heading(1, "Development Recommendations", true);
    body.heading(2, "Key Strengths", false);
    body.text(&[Run::new("Build on these areas of strength:")]);
    for category in strengths {
        body.text(&[Run::new(format!(
            "• {}: {} - {}",
            category.category,
            format_score(category.overall),
            interpretation(category.overall)
        ))]);
    }
    body.spacer();
    body.heading(2, "Development Priorities", false);
    body.text(&[Run::new("Focus development efforts on these areas:")]);
    for category in development {
        body.text(&[Run::new(format!(
            "• {}: {} - {}",
            category.category,
            format_score(category.overall),
            interpretation(category.overall)
        ))]);
    }
    body.spacer();
    body.heading(2, "Next Steps", false);
    for (index, step) in NEXT_STEPS.iter().enumerate() {
        body.text(&[Run::new(format!("{}. {}", index + 1, step))]);
    }

    body
}

pub fn render(data: &ReportData) -> anyhow::Result<Vec<u8>> {
    let document = build_body(data).into_document();
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/styles.xml", STYLES),
        ("word/document.xml", document.as_str()),
    ];
    for (name, contents) in parts {
        writer
            .start_file(name, options)
            .with_context(|| format!("failed to start docx part {name}"))?;
        writer
            .write_all(contents.as_bytes())
            .with_context(|| format!("failed to write docx part {name}"))?;
    }

    let cursor = writer.finish().context("failed to finish docx package")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use zip::ZipArchive;

    use super::*;
    use crate::report::fixtures::sample_report;

    fn document_xml(bytes: Vec<u8>) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
        let mut document = String::new();
        archive
            .by_name("word/document.xml")
            .expect("document part")
            .read_to_string(&mut document)
            .expect("utf-8 document");
        document
    }

    #[test]
    fn package_contains_required_parts() {
        let bytes = render(&sample_report()).expect("docx renders");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("valid zip");

        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/_rels/document.xml.rels",
            "word/styles.xml",
            "word/document.xml",
        ] {
            assert!(archive.by_name(part).is_ok(), "missing {part}");
        }
    }

    #[test]
    fn document_carries_sections_in_order() {
        let document = document_xml(render(&sample_report()).expect("docx renders"));

        let order = [
            "360° LEADERSHIP FEEDBACK REPORT",
            "Rating Scale:",
            "Participation Summary",
            "Overall Results Summary",
            "Detailed Results by Leadership Area",
            "Question-Level Results",
            "Verbatim Comments",
            "Development Recommendations",
            "Next Steps",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|needle| {
                document
                    .find(needle)
                    .unwrap_or_else(|| panic!("missing {needle:?}"))
            })
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn scores_are_colored_and_text_escaped() {
        let document = document_xml(render(&sample_report()).expect("docx renders"));

        let overall = concat!(
            r#"<w:color w:val="2E7D32"/><w:sz w:val="24"/></w:rPr>"#,
            r#"<w:t xml:space="preserve">4.75</w:t>"#
        );
        assert!(document.contains(overall));
        assert!(document.contains("Explains decisions &amp; context clearly"));
        assert!(document.contains("&quot;Always shares &lt;context&gt; early&quot;"));
        assert!(document.contains("• Delegation: 2.50 - Needs Attention"));
    }
}

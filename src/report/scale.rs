pub const MAX_SCALE: u32 = 5;

pub const RATING_SCALE: [(u32, &str); 5] = [
    (5, "Exceptional/Outstanding"),
    (4, "Strong/Highly Effective"),
    (3, "Good/Effective"),
    (2, "Developing/Needs Improvement"),
    (1, "Significant Development Needed"),
];

pub fn interpretation(score: f64) -> &'static str {
    if score >= 4.5 {
        "Exceptional Performance"
    } else if score >= 4.0 {
        "Strong Performance"
    } else if score >= 3.5 {
        "Good Performance"
    } else if score >= 3.0 {
        "Developing Area"
    } else if score >= 2.5 {
        "Needs Attention"
    } else {
        "Priority Development Area"
    }
}

pub fn score_color(score: f64) -> &'static str {
    if score >= 4.5 {
        "2E7D32"
    } else if score >= 4.0 {
        "4CAF50"
    } else if score >= 3.5 {
        "8BC34A"
    } else if score >= 3.0 {
        "CDDC39"
    } else if score >= 2.5 {
        "FFEB3B"
    } else {
        "FF9800"
    }
}

pub fn rate_color(rate: i64) -> &'static str {
    if rate >= 80 {
        "2E7D32"
    } else if rate >= 60 {
        "FF9800"
    } else {
        "D32F2F"
    }
}

pub fn format_score(score: f64) -> String {
    format!("{:.2}", (score * 100.0).round() / 100.0)
}

// 3.4 -> `█ █ █ ▌ ░`
pub fn visual_scale(score: f64) -> String {
    let whole = score.floor();
    let ceiling = score.ceil();
    let fractional = score.fract() != 0.0;

    (1..=MAX_SCALE)
        .map(|cell| {
            let cell = f64::from(cell);
            if cell <= whole {
                "█"
            } else if cell == ceiling && fractional {
                "▌"
            } else {
                "░"
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSegment {
    pub color: &'static str,
    pub opacity: f64,
}

pub fn score_bar(score: f64) -> Vec<BarSegment> {
    let max = f64::from(MAX_SCALE);
    let percentage = score / max * 100.0;

    (1..=MAX_SCALE)
        .map(|segment| {
            let start = f64::from(segment - 1) / max * 100.0;
            let end = f64::from(segment) / max * 100.0;
            if percentage < start {
                return BarSegment {
                    color: "E0E0E0",
                    opacity: 0.3,
                };
            }
            let color = match segment {
                1 | 2 => "FF5722",
                3 => "FFEB3B",
                _ => "4CAF50",
            };
            BarSegment {
                color,
                opacity: if percentage >= end { 1.0 } else { 0.7 },
            }
        })
        .collect()
}

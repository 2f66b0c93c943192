//! Markdown summary of a finished session.

use std::path::Path;

use anyhow::Result;

use practicum_core::model::ResultSource;
use practicum_core::record::SessionRecord;
use practicum_core::session::FinishReason;

/// Escape characters that would break a table cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn format_duration(secs: i64) -> String {
    match (secs / 3600, secs % 3600 / 60, secs % 60) {
        (0, 0, s) => format!("{s}s"),
        (0, m, s) => format!("{m}m {s:02}s"),
        (h, m, s) => format!("{h}h {m:02}m {s:02}s"),
    }
}

/// Render a session record as a Markdown report.
pub fn generate_markdown(record: &SessionRecord) -> String {
    let mut md = String::new();
    let config = &record.config;

    let title = if config.company.trim().is_empty() {
        format!("# Interview practice: {}\n\n", config.role)
    } else {
        format!("# Interview practice: {} at {}\n\n", config.role, config.company)
    };
    md.push_str(&title);

    md.push_str(&format!(
        "**Score:** {}/100 · **Assessed level:** {} · **Target level:** {}\n\n",
        record.result.score, record.result.assessed_proficiency, config.proficiency_level
    ));
    md.push_str(&format!(
        "{} questions · {} answered · {} · {}\n\n",
        record.result.total_questions,
        record.answers.iter().filter(|a| !a.is_blank()).count(),
        format_duration(record.duration_secs()),
        record.started_at.format("%Y-%m-%d %H:%M UTC"),
    ));
    if record.finish_reason == FinishReason::TimeExpired {
        md.push_str("> The session ended when time ran out.\n\n");
    }
    if record.source == ResultSource::Fallback {
        md.push_str("> Scored locally; the assessment service was unavailable.\n\n");
    }

    md.push_str("## Feedback\n\n");
    md.push_str(record.result.feedback.trim());
    md.push_str("\n\n");

    md.push_str("## Scores by category\n\n| Category | Score |\n|---|---:|\n");
    for (category, score) in &record.result.category_scores {
        md.push_str(&format!("| {} | {} |\n", cell(category), score));
    }
    md.push('\n');

    md.push_str("## Scores by question type\n\n| Type | Score |\n|---|---:|\n");
    for (question_type, score) in &record.result.type_scores {
        md.push_str(&format!("| {} | {} |\n", cell(question_type), score));
    }
    md.push('\n');

    md.push_str("## Questions\n\n| # | Question | Type | Time |\n|---:|---|---|---:|\n");
    for (i, question) in record.questions.iter().enumerate() {
        let time = match record.answer_for(&question.id) {
            Some(a) if !a.is_blank() => format_duration(a.time_spent_seconds as i64),
            _ => "-".to_string(),
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            i + 1,
            cell(&question.text),
            cell(&question.question_type),
            time
        ));
    }
    md.push('\n');

    let unanswered: Vec<_> = record.unanswered().collect();
    if !unanswered.is_empty() {
        md.push_str("## Unanswered\n\n");
        for question in unanswered {
            md.push_str(&format!("- {}\n", question.text));
        }
        md.push('\n');
    }

    md.push_str("## Recommendations\n\n");
    for rec in &record.result.recommendations {
        md.push_str(&format!("- {rec}\n"));
    }

    md
}

/// Write a Markdown report to a file.
pub fn write_markdown_report(record: &SessionRecord, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, generate_markdown(record))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::make_test_record;

    #[test]
    fn report_contains_required_sections() {
        let md = generate_markdown(&make_test_record());

        assert!(md.starts_with("# Interview practice: Backend Engineer at Acme"));
        assert!(md.contains("**Score:** 58/100"));
        assert!(md.contains("| Rust | 76 |"));
        assert!(md.contains("| behavioral | 72 |"));
        assert!(md.contains("20m 30s"));
        assert!(md.contains("Scored locally"));
        assert!(!md.contains("time ran out"));
        assert!(md.contains("- Practice indexing questions."));
    }

    #[test]
    fn unanswered_listed_and_pipes_escaped() {
        let md = generate_markdown(&make_test_record());
        assert!(md.contains("## Unanswered\n\n- Design an index for | lookups."));
        assert!(md.contains("| 2 | Design an index for \\| lookups. | technical | - |"));
        assert!(md.contains("| 1 | Explain the borrow checker. | technical | 1m 35s |"));
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(7), "7s");
        assert_eq!(format_duration(65), "1m 05s");
        assert_eq!(format_duration(3_725), "1h 02m 05s");
    }

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("session.md");

        write_markdown_report(&make_test_record(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("## Recommendations"));
    }
}

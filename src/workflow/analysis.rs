//! Parsing of reconciled health reports.

use crate::workflow::types::{AnalysisReport, WorkflowError};

/// Parse the reconciliation model's output into the fixed report shape.
///
/// Models frequently wrap JSON in prose or markdown fences, so parsing starts at
/// the outermost brace pair. Scores must land in `[0, 100]`; anything else is a
/// `MalformedAnalysis` failure, never a silent default.
pub(crate) fn parse_report(raw: &str) -> Result<AnalysisReport, WorkflowError> {
    let body = extract_json_object(raw).ok_or_else(|| {
        WorkflowError::MalformedAnalysis("no JSON object found in reconciliation output".into())
    })?;

    let report: AnalysisReport =
        serde_json::from_str(body).map_err(|error| WorkflowError::MalformedAnalysis(error.to_string()))?;

    for (name, value) in [
        ("overall", report.overall),
        ("readability", report.readability),
        ("structure", report.structure),
        ("clarity", report.clarity),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(WorkflowError::MalformedAnalysis(format!(
                "score {name} out of range: {value}"
            )));
        }
    }

    Ok(report)
}

/// Slice out the outermost `{ ... }` of the raw output, if any.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"{"overall": 82, "readability": 75, "structure": 88, "clarity": 79, "recommendation": ["add a table of contents", "shorten section two"]}"#;

    #[test]
    fn parses_plain_json() {
        let report = parse_report(PLAIN).expect("report");
        assert_eq!(report.overall, 82.0);
        assert_eq!(report.recommendation.len(), 2);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{PLAIN}\n```");
        let report = parse_report(&fenced).expect("report");
        assert_eq!(report.structure, 88.0);
    }

    #[test]
    fn parses_json_with_surrounding_prose() {
        let wrapped = format!("Here is the reconciled report:\n{PLAIN}\nHope that helps.");
        let report = parse_report(&wrapped).expect("report");
        assert_eq!(report.clarity, 79.0);
    }

    #[test]
    fn rejects_out_of_range_scores() {
        let raw = r#"{"overall": 120, "readability": 75, "structure": 88, "clarity": 79}"#;
        let error = parse_report(raw).expect_err("out of range");
        assert!(matches!(error, WorkflowError::MalformedAnalysis(_)));
    }

    #[test]
    fn rejects_output_without_json() {
        let error = parse_report("the document looks fine to me").expect_err("no json");
        assert!(matches!(error, WorkflowError::MalformedAnalysis(_)));
    }

    #[test]
    fn rejects_wrong_shape() {
        let error = parse_report(r#"{"summary": "nice pdf"}"#).expect_err("wrong shape");
        assert!(matches!(error, WorkflowError::MalformedAnalysis(_)));
    }

    #[test]
    fn missing_recommendation_defaults_to_empty() {
        let raw = r#"{"overall": 50, "readability": 50, "structure": 50, "clarity": 50}"#;
        let report = parse_report(raw).expect("report");
        assert!(report.recommendation.is_empty());
    }
}

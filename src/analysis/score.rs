//! Confidence scoring for parsed analysis results.
//!
//! The score is a 0–100 completeness heuristic: how many of the key
//! indicator fields the model actually filled in, with small bonuses for
//! signs of a detailed answer. Pure and deterministic — no I/O.

use crate::database::models::AnalysisResponse;

const NOT_MENTIONED: &str = "not mentioned";

/// Score a parsed analysis response.
///
/// Ten indicator fields are checked; each non-empty field that is not a
/// literal "not mentioned" contributes 10 points. Bonuses (+5 each, applied
/// independently): a summary longer than 50 words, an action sequence that
/// spells out steps, and both key quotes present. Capped at 100.
pub fn confidence_score(response: &AnalysisResponse) -> f64 {
    let indicators = [
        response.issue_classification.primary_category.as_str(),
        response.issue_classification.specific_issue.as_str(),
        response.issue_classification.severity.as_str(),
        response.technical_context.system_portal.as_str(),
        response.technical_context.feature_involved.as_str(),
        response.issue_recreation.action_sequence.as_str(),
        response.issue_recreation.failure_point.as_str(),
        response.issue_recreation.expected_vs_actual.as_str(),
        response.key_quotes.issue_description.as_str(),
        response.issue_summary.as_str(),
    ];

    let filled = indicators.iter().filter(|f| is_filled(f)).count();
    let mut score = (filled as f64 / indicators.len() as f64) * 100.0;

    if response.issue_summary.split_whitespace().count() > 50 {
        score += 5.0;
    }
    if response
        .issue_recreation
        .action_sequence
        .to_lowercase()
        .contains("step")
    {
        score += 5.0;
    }
    if is_filled(&response.key_quotes.issue_description)
        && is_filled(&response.key_quotes.impact_statement)
    {
        score += 5.0;
    }

    score.min(100.0)
}

fn is_filled(field: &str) -> bool {
    !field.is_empty() && !field.eq_ignore_ascii_case(NOT_MENTIONED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{
        IssueClassification, IssueRecreation, KeyQuotes, TechnicalContext,
    };

    fn full_response() -> AnalysisResponse {
        AnalysisResponse {
            issue_classification: IssueClassification {
                primary_category: "Technical Issue".to_string(),
                specific_issue: "OTP delivery failure during withdrawal".to_string(),
                severity: "High".to_string(),
                ..Default::default()
            },
            technical_context: TechnicalContext {
                system_portal: "Mobile App".to_string(),
                feature_involved: "Withdrawal OTP".to_string(),
                ..Default::default()
            },
            issue_recreation: IssueRecreation {
                action_sequence: "1. Log in 2. Request withdrawal 3. Wait for OTP".to_string(),
                failure_point: "OTP never arrives".to_string(),
                expected_vs_actual: "OTP within 30s vs nothing".to_string(),
                ..Default::default()
            },
            key_quotes: KeyQuotes {
                issue_description: "I never get the code".to_string(),
                impact_statement: "I could not withdraw my money".to_string(),
            },
            issue_summary: "The caller could not complete a withdrawal.".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_response_scores_zero() {
        assert_eq!(confidence_score(&AnalysisResponse::default()), 0.0);
    }

    #[test]
    fn test_not_mentioned_counts_as_empty() {
        let mut response = AnalysisResponse::default();
        response.issue_classification.primary_category = "Not mentioned".to_string();
        response.technical_context.system_portal = "not mentioned".to_string();
        assert_eq!(confidence_score(&response), 0.0);
    }

    #[test]
    fn test_all_indicators_filled_with_quote_bonus() {
        // 10/10 indicators = 100, +5 quotes bonus, capped at 100
        let score = confidence_score(&full_response());
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_partial_fill_scores_proportionally() {
        let mut response = AnalysisResponse::default();
        response.issue_classification.primary_category = "Process Issue".to_string();
        response.issue_summary = "Short summary.".to_string();
        // 2/10 indicators, no bonuses
        assert_eq!(confidence_score(&response), 20.0);
    }

    #[test]
    fn test_step_bonus() {
        let mut response = AnalysisResponse::default();
        response.issue_recreation.action_sequence = "Step 1: open the app".to_string();
        // 1 indicator (10.0) + step bonus
        assert_eq!(confidence_score(&response), 15.0);
    }

    #[test]
    fn test_long_summary_bonus() {
        let mut response = AnalysisResponse::default();
        response.issue_summary = "word ".repeat(60).trim_end().to_string();
        assert_eq!(confidence_score(&response), 15.0);
    }

    #[test]
    fn test_quote_bonus_requires_both_quotes() {
        let mut response = AnalysisResponse::default();
        response.key_quotes.issue_description = "only this one".to_string();
        assert_eq!(confidence_score(&response), 10.0);
    }

    #[test]
    fn test_score_never_exceeds_cap() {
        let mut response = full_response();
        response.issue_summary = "word ".repeat(80).trim_end().to_string();
        response.issue_recreation.action_sequence =
            "Step 1 do this, step 2 do that, step 3 verify".to_string();
        assert_eq!(confidence_score(&response), 100.0);
    }

    #[test]
    fn test_determinism() {
        let response = full_response();
        assert_eq!(confidence_score(&response), confidence_score(&response));
    }
}

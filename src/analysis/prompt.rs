//! Prompt construction for the analysis service.
//!
//! Long transcripts are cut at a sentence boundary and only the first
//! segment is sent; the prompt then carries a `[PARTIAL TRANSCRIPT …]`
//! marker so the model knows it is looking at a prefix.

use crate::text;

pub const SYSTEM_PROMPT: &str = "You are an expert call center analyst for financial services \
who returns structured analysis in JSON format.";

/// A prompt ready to send, plus how much of the transcript survived
/// truncation (used to attach a note to the stored result).
pub struct PreparedPrompt {
    pub prompt: String,
    /// `Some((used_chars, total_chars))` when the transcript was truncated.
    pub truncated: Option<(usize, usize)>,
}

pub fn build_analysis_prompt(
    transcript: &str,
    call_id: &str,
    duration_seconds: i64,
    max_chars: usize,
) -> PreparedPrompt {
    let chunks = text::chunk_text(transcript, max_chars);
    let text_to_use = chunks.first().map(String::as_str).unwrap_or("");

    let truncated = if chunks.len() > 1 {
        Some((text_to_use.chars().count(), transcript.chars().count()))
    } else {
        None
    };

    let partial_note = match truncated {
        Some((used, total)) => format!("[PARTIAL TRANSCRIPT - First {} of {} chars] ", used, total),
        None => String::new(),
    };

    let prompt = format!(
        r#"# Call Analysis Task
Perform a forensic analysis of this call center transcript. Extract precise
information about the issue, how to reproduce it, and its impact on the caller.

## Call Data:
- Call ID: {call_id}
- Duration: {duration_seconds} seconds
- Transcript: {partial_note}{text_to_use}

## Extraction Tasks:
1. Issue Classification
* **Primary Issue Category**: one of: Process Issue, Technical Issue, Communication Gap, Knowledge Gap (closest fit if none apply)
* **Specific Issue**: the exact issue including WHERE in the process flow it occurs
* **Process Stage**: the workflow stage where the issue occurs
* **Issue Status**: Resolved During Call, Workaround Provided, Escalated, or Unresolved
* **Severity**: Critical, High, Medium, or Low

2. Caller Information
* **Caller Type**: End Customer (New/Existing), Affiliate Partner, Financial Advisor, Internal Staff, or Other
* **Experience Level**: New User, Intermediate, Experienced, or Expert
* **Intent**: the business objective the caller was trying to accomplish

3. Technical Context
* **System/Portal**: the exact system mentioned (mobile app, web portal, partner dashboard, ...)
* **Device Information**: browser, OS, device model if mentioned
* **Error Messages**: exact error text in quotes
* **Feature Involved**: the specific feature affected

4. Issue Recreation Path
* **Preconditions**: state, permissions, or data needed to encounter the issue
* **Action Sequence**: numbered steps (1, 2, 3...) in the exact order that led to the issue
* **Workflow Stage**: which process workflow and sub-step is affected
* **Failure Point**: the precise step where the process broke down
* **Expected vs. Actual Outcome**: what should have happened vs. what occurred
* **Frequency**: First Occurrence, Intermittent, or Recurring

5. Resolution Path
* **Attempted Solutions**: what was tried before or during the call
* **Resolution Steps**: steps that resolved the issue or recommended next actions
* **Knowledge Gap Identified**: training or documentation needs revealed

6. Key Quotes
* **Issue Description Quote**: the most descriptive quote where the caller explains the issue
* **Impact Statement Quote**: an exact quote showing business impact

7. Issue Summary
* A detailed paragraph (at least 5 sentences) covering the issue and its
  symptoms, where it occurs, recreation steps, business impact, and a
  recommended solution or investigation path.

## Analysis Guidelines:
- If information is not explicitly in the transcript, write "Not mentioned" rather than guessing
- Use exact quotes from the transcript for error messages and key quotes
- Be specific about each step in action sequences

## Output Format:
Return a valid JSON object with this structure:
{{
  "issue_classification": {{
    "primary_category": "",
    "specific_issue": "",
    "process_stage": "",
    "issue_status": "",
    "severity": ""
  }},
  "caller_information": {{
    "caller_type": "",
    "experience_level": "",
    "intent": ""
  }},
  "technical_context": {{
    "system_portal": "",
    "device_information": "",
    "error_messages": "",
    "feature_involved": ""
  }},
  "issue_recreation": {{
    "preconditions": "",
    "action_sequence": "",
    "workflow_stage": "",
    "failure_point": "",
    "expected_vs_actual": "",
    "frequency": ""
  }},
  "resolution_path": {{
    "attempted_solutions": "",
    "resolution_steps": "",
    "knowledge_gap_identified": ""
  }},
  "key_quotes": {{
    "issue_description": "",
    "impact_statement": ""
  }},
  "issue_summary": ""
}}"#
    );

    PreparedPrompt { prompt, truncated }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_transcript_has_no_partial_marker() {
        let prepared = build_analysis_prompt("Hello. Goodbye.", "c1", 30, 8000);
        assert!(prepared.truncated.is_none());
        assert!(!prepared.prompt.contains("PARTIAL TRANSCRIPT"));
        assert!(prepared.prompt.contains("Call ID: c1"));
        assert!(prepared.prompt.contains("Hello. Goodbye."));
    }

    #[test]
    fn test_long_transcript_is_truncated_with_marker() {
        let sentence = "The caller described the problem in detail. ";
        let transcript = sentence.repeat(300);
        let prepared = build_analysis_prompt(&transcript, "c2", 600, 2000);

        let (used, total) = prepared.truncated.unwrap();
        assert!(used <= 2000);
        assert!(total > used);
        assert!(prepared.prompt.contains("[PARTIAL TRANSCRIPT"));
    }
}

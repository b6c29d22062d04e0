//! Prompt templates for the chat, summary, and health pipelines.
//!
//! Templates are rendered by plain functions so a request can never carry an
//! unrendered placeholder. The chat prompt pins the out-of-context contract:
//! when nothing relevant was retrieved, the model must reply with
//! [`OUT_OF_CONTEXT_REPLY`] verbatim.

/// Exact reply required when the retrieved context cannot answer the question.
pub const OUT_OF_CONTEXT_REPLY: &str = "Sorry — out of context.";

/// Summary type applied when a single-document request does not specify one.
pub const DEFAULT_SUMMARY_TYPE: &str = "Detailed Analysis";

/// Summary type applied to every member of a batch request.
pub const BATCH_SUMMARY_TYPE: &str = "Executive Summary";

/// Render the retrieval-augmented chat prompt.
///
/// `context` is the serialized retrieved chunks (possibly empty); `question` is the
/// user's query. Both are always substituted.
pub fn render_chat_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a retrieval-augmented assistant answering user questions strictly from the provided PDF context.

RULES YOU MUST FOLLOW:
1. Use ONLY the provided PDF context. If the information is not present, reply exactly: "{OUT_OF_CONTEXT_REPLY}" No assumptions, no external facts.
2. Think step by step: understand the question, scan all context chunks, extract only relevant facts, then form the cleanest possible answer.
3. Start directly with the answer. Use bullet points, tables, or short paragraphs as the question demands. Be concise for factual questions and detailed for explanations.
4. Never mention the PDF, chunks, retrieval, or this process, and never invent facts.

PDF CONTEXT:
{context}

USER QUESTION:
{question}

YOUR ANSWER (direct, clean, based only on the PDF context):"#
    )
}

/// Render the summarization prompt for the requested summary type.
pub fn render_summary_prompt(content: &str, summary_type: &str) -> String {
    format!(
        r#"SYSTEM RULES:
- You are a powerful AI PDF summarizer.
- Always follow the summary type strictly.
- Make output structured, clear, and helpful.

User selected summary type: **{summary_type}**

Summarize the PDF content below:

--------------------
{content}
--------------------

Generate the summary according to type: {summary_type}"#
    )
}

/// Render the per-provider health analysis prompt.
///
/// The required JSON shape is spelled out literally so every contributing analysis
/// is parseable by the reconciliation step.
pub fn render_health_prompt(content: &str) -> String {
    format!(
        r#"You are a PDF health analyst.

Analyze the following PDF content and provide:
- Overall health score (0-100)
- Readability (0-100)
- Structure (0-100)
- Clarity (0-100)
- Recommendations (bullet points)

Content:
----------------
{content}
----------------

Return output as JSON strictly in this format:
{{
  "overall": 0,
  "readability": 0,
  "structure": 0,
  "clarity": 0,
  "recommendation": []
}}"#
    )
}

/// Render the reconciliation prompt that merges independent health analyses.
///
/// Accepts any number of contributing analyses (at least one); numeric fields are
/// averaged and recommendations merged by the reconciling model, not computed here.
pub fn render_reconciliation_prompt(analyses: &[String]) -> String {
    let mut combined = String::new();
    for (index, analysis) in analyses.iter().enumerate() {
        combined.push_str(&format!("Analysis {}:\n{}\n\n", index + 1, analysis));
    }

    format!(
        r#"You are a PDF health analyst.

Below are {count} independent health analyses of the same PDF from different AI models:

{combined}
Combine and reconcile the analyses into a single JSON health report.
Keep the format strictly:
{{
  "overall": 0,
  "readability": 0,
  "structure": 0,
  "clarity": 0,
  "recommendation": []
}}
Provide numeric scores as averages and merge recommendations intelligently."#,
        count = analyses.len(),
    )
}

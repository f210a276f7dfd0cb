//! Prompts sent to the reviewer model.
//!
//! The response format below is the contract [`crate::pipeline::reply`]
//! parses. Change both together.
//!
//! Callers can replace the system prompt via
//! [`crate::config::PipelineConfig::system_prompt`]; the instructions that
//! carry the job context are always built by [`prepare_instructions`].

/// Default system prompt framing the reviewer role.
pub const SYSTEM_PROMPT: &str = "You are an expert in ATS (Applicant Tracking System) and resume analysis. \
You receive an image of the first page of a resume and the job it is being submitted for. \
Be thorough and honest: if the resume is weak, say so and give low scores. \
Reply with a single JSON object and nothing else.";

/// JSON shape the reviewer must return.
pub const RESPONSE_FORMAT: &str = r#"{
  "overallScore": number,          // 0-100, overall fit for the job
  "summary": string,               // 2-4 sentence executive summary
  "ATS": {
    "score": number,               // 0-100, how well an ATS would parse and rank this resume
    "tips": [
      { "type": "good" | "warn", "tip": string }
    ]                              // 3-6 tips, most important first
  },
  "strengths": [string],           // concrete strengths relative to the job
  "weaknesses": [string],          // concrete gaps or problems
  "details": string                // optional longer notes
}"#;

/// Build the per-run instructions from the job context.
///
/// Blank fields are replaced with an explicit "not provided" marker so the
/// model does not invent a job.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    let title = non_blank(job_title);
    let description = non_blank(job_description);
    format!(
        "Please analyze and rate this resume and suggest how to improve it.\n\
The rating can be low if the resume is bad.\n\
If provided, take the job description into consideration.\n\
The job title is: {title}\n\
The job description is: {description}\n\
Provide the feedback using the following format:\n\
{RESPONSE_FORMAT}\n\
Return the analysis as a JSON object, without any other text and without the backticks.\n\
Do not include any other text or comments."
    )
}

fn non_blank(s: &str) -> &str {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        "(not provided)"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_carry_job_context() {
        let text = prepare_instructions("Staff Engineer", "Own the storage layer");
        assert!(text.contains("The job title is: Staff Engineer"));
        assert!(text.contains("Own the storage layer"));
        assert!(text.contains("\"ATS\""));
    }

    #[test]
    fn blank_context_is_marked() {
        let text = prepare_instructions("  ", "");
        assert!(text.contains("The job title is: (not provided)"));
        assert!(text.contains("The job description is: (not provided)"));
    }
}

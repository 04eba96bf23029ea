//! Scoring prompt.

/// Prompt asking for the four-field JSON verdict on one posting.
pub fn build_prompt(profile: &str, job_description: &str, resume_text: &str) -> String {
    format!(
        r#"
You are a job matching assistant.

Compare the following job description with the candidate's profile and resume. Evaluate two things:

1. match_score (out of 100): How well this job aligns with the candidate's skills and preferences.
2. likelihood_score (out of 100): How likely the candidate is to actually land this job based on their qualifications.
3. match_reason: A short explanation for why you gave the match score.
4. likelihood_reason: A short explanation for your likelihood score.

Respond in valid JSON format only, like this, don't give any other text beside the JSON:

{{
  "match_score": 85,
  "likelihood_score": 90,
  "match_reason": "reason",
  "likelihood_reason": "reason"
}}

---

Profile:
{profile}

Job Description:
{job_description}

Resume:
{resume_text}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_inputs_in_order() {
        let prompt = build_prompt("Backend developer, remote only", "We need Rust", "10 years of C");
        let profile = prompt.find("Profile:\nBackend developer, remote only").unwrap();
        let job = prompt.find("Job Description:\nWe need Rust").unwrap();
        let resume = prompt.find("Resume:\n10 years of C").unwrap();
        assert!(profile < job && job < resume);
    }

    #[test]
    fn test_prompt_shows_literal_json_example() {
        let prompt = build_prompt("p", "d", "r");
        assert!(prompt.contains("{\n  \"match_score\": 85,"));
        assert!(prompt.contains("\"likelihood_reason\": \"reason\"\n}"));
    }
}

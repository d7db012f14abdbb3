// Prompt constants for the stage agents and the candidate advisor.
// System prompts get the JSON-only instruction appended via
// llm_client::prompts::with_json_only. Templates use `{placeholder}`
// markers filled with `.replace()` before sending.

// ── Extraction ──────────────────────────────────────────────────────────────

pub const EXTRACTOR_ROLE: &str = "You are an expert resume parser. \
    Extract structured information from raw resume text. \
    Preserve the candidate's own wording; do not invent facts.";

pub const EXTRACTOR_PROMPT_TEMPLATE: &str = r#"Structure the following resume text.

Return a JSON object with these sections:
{
  "Personal Info": {"Name": "", "Email": "", "Phone": "", "Location": ""},
  "Skills": ["skill"],
  "Experience": [{"title": "", "company": "", "duration": "", "highlights": [""]}],
  "Education": [{"degree": "", "institution": "", "year": ""}]
}

Omit fields the resume does not mention.

RESUME TEXT:
{resume_text}"#;

// ── Enhancement ─────────────────────────────────────────────────────────────

pub const ENHANCER_ROLE: &str = "You are a professional profile optimizer. \
    Polish extracted resume data into a coherent, professional summary. \
    Fix grammatical errors, standardize job titles and skill names, \
    and summarize key strengths.";

pub const ENHANCER_PROMPT_TEMPLATE: &str = r#"Enhance and standardize this candidate data:

{structured_data}

Return a JSON object with this EXACT schema:
{
  "enhanced_summary": "polished professional summary",
  "standardized_skills": ["Skill 1", "Skill 2"],
  "total_years_exp": 0
}"#;

// ── Analysis ────────────────────────────────────────────────────────────────

pub const ANALYZER_ROLE: &str = "You are a senior technical recruiter. \
    Analyze candidate profiles in depth: technical skills and proficiency, \
    years of experience and career progression, education, and notable \
    achievements.";

pub const ANALYZER_PROMPT_TEMPLATE: &str = r#"Analyze this candidate profile:

{profile}

Return a JSON object with this EXACT schema:
{
  "technical_skills": ["skill"],
  "years_of_experience": 0,
  "education": {"level": "Bachelors|Masters|PhD|Other", "field": "field of study"},
  "experience_level": "Junior|Mid-level|Senior",
  "key_achievements": ["achievement"],
  "domain_expertise": ["domain"]
}"#;

// ── Matching ────────────────────────────────────────────────────────────────

pub const MATCHER_ROLE: &str = "You match candidate profiles with open job positions. \
    Consider skills match, experience level and location. \
    Only match against the jobs you are given.";

pub const MATCHER_PROMPT_TEMPLATE: &str = r#"Match this candidate against the available jobs.

CANDIDATE ANALYSIS:
{analysis}

AVAILABLE JOBS:
{jobs}

Return a JSON object with this EXACT schema:
{
  "matched_jobs": [
    {"title": "job title", "match_score": 85, "location": "job location"}
  ],
  "number_of_matches": 1
}"#;

// ── Screening ───────────────────────────────────────────────────────────────

pub const SCREENER_ROLE: &str = "You screen candidates for a hiring team. \
    Assess qualification alignment, experience relevance, skill match \
    and any red flags or concerns.";

pub const SCREENER_PROMPT_TEMPLATE: &str = r#"Conduct a comprehensive screening of this candidate.

CONTEXT:
{context}

Evaluate:
1. Qualification alignment
2. Experience relevance
3. Potential red flags

Return a JSON object with this EXACT schema:
{
  "screening_report": "detailed textual report",
  "screening_score": 0,
  "red_flags": ["flag"]
}

screening_score is a number from 0 to 100."#;

// ── Recommendation ──────────────────────────────────────────────────────────

pub const RECOMMENDER_ROLE: &str = "You make the final hiring recommendation. \
    Weigh the extracted profile, skills analysis, job matches and screening \
    results, and give clear next steps.";

pub const RECOMMENDER_PROMPT_TEMPLATE: &str = r#"Produce the final recommendation for this candidate.

CONTEXT:
{context}

Return a JSON object with this EXACT schema:
{
  "recommendation": "Hire|Interview|Hold|Reject",
  "final_recommendation": "one paragraph explaining the decision",
  "next_steps": ["step"],
  "confidence_level": "low|medium|high"
}"#;

// ── Candidate advice ────────────────────────────────────────────────────────

pub const ADVISOR_ROLE: &str = "You are a career advisor. \
    Give candidates actionable, constructive feedback: gaps against typical \
    market requirements for their role, specific improvements, and a \
    motivating summary.";

pub const ADVISOR_PROMPT_TEMPLATE: &str = r#"Analyze this candidate profile and write a career advice report:

{profile}

Return a JSON object with this EXACT schema:
{
  "strengths": ["asset"],
  "improvement_areas": ["gap"],
  "actionable_tips": ["specific step"],
  "career_advice": "long-term strategic summary"
}"#;

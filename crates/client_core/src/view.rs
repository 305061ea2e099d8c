//! Display model for a finished analysis. Every field the service may omit
//! falls back to a placeholder so rendering never fails.

use serde::Serialize;
use serde_json::{Map, Value};
use shared::{
    domain::ScoreTier,
    protocol::{number_field, string_list, text_field, AnalysisResult},
};

pub const NOT_DETECTED: &str = "Not detected";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub score: u8,
    pub tier: ScoreTier,
    pub score_before: Option<u8>,
    pub score_improvement: Option<f64>,
    pub candidate: CandidateView,
    pub skills: SkillsView,
    pub experience: ExperienceView,
    pub education: EducationView,
    pub recommendations: Vec<String>,
    pub report_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateView {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillsView {
    pub score: u8,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExperienceView {
    pub score: u8,
    pub years: String,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EducationView {
    pub score: u8,
    pub degree: String,
    pub institution: String,
}

impl ResultsView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let score = result.raw_score().map(clamp_score).unwrap_or(0);
        let resume = result.resume_analysis();

        Self {
            score,
            tier: ScoreTier::from_score(score),
            score_before: result.score_before().map(clamp_score),
            score_improvement: result.score_improvement(),
            candidate: CandidateView::from_section(resume),
            skills: SkillsView::from_section(result.breakdown_section("skills_analysis")),
            experience: ExperienceView::from_section(
                result.breakdown_section("experience_analysis"),
                resume,
            ),
            education: EducationView::from_section(
                result.breakdown_section("education_analysis"),
                resume,
            ),
            recommendations: result.recommendations(),
            report_url: result.report_url(),
        }
    }
}

impl CandidateView {
    fn from_section(resume: Option<&Map<String, Value>>) -> Self {
        Self {
            name: display_text(resume, &["name", "full_name", "candidate_name"]),
            email: display_text(resume, &["email"]),
            phone: display_text(resume, &["phone", "phone_number"]),
        }
    }
}

impl SkillsView {
    fn from_section(section: Option<&Map<String, Value>>) -> Self {
        let Some(section) = section else {
            return Self {
                score: 0,
                matched: Vec::new(),
                missing: Vec::new(),
            };
        };

        Self {
            score: section_score(section),
            matched: string_list(
                section,
                &["matched_skills", "found_skills", "skills_found", "skills"],
            ),
            missing: string_list(section, &["missing_skills", "skills_missing"]),
        }
    }
}

impl ExperienceView {
    fn from_section(
        section: Option<&Map<String, Value>>,
        resume: Option<&Map<String, Value>>,
    ) -> Self {
        let years_keys = ["years_of_experience", "experience_years", "total_years"];
        let years = section
            .and_then(|section| text_field(section, &years_keys))
            .or_else(|| resume.and_then(|resume| text_field(resume, &years_keys)));

        Self {
            score: section.map(section_score).unwrap_or(0),
            years: years.unwrap_or_else(|| NOT_DETECTED.to_string()),
            level: display_text(section, &["experience_level", "level", "seniority"]),
        }
    }
}

impl EducationView {
    fn from_section(
        section: Option<&Map<String, Value>>,
        resume: Option<&Map<String, Value>>,
    ) -> Self {
        let degree_keys = ["highest_degree", "degree", "education_level"];
        let degree = section
            .and_then(|section| text_field(section, &degree_keys))
            .or_else(|| resume.and_then(|resume| text_field(resume, &degree_keys)));

        Self {
            score: section.map(section_score).unwrap_or(0),
            degree: degree.unwrap_or_else(|| NOT_DETECTED.to_string()),
            institution: display_text(section, &["institution", "university", "school"]),
        }
    }
}

fn section_score(section: &Map<String, Value>) -> u8 {
    number_field(section, &["score", "match_score", "percentage"])
        .map(clamp_score)
        .unwrap_or(0)
}

fn display_text(map: Option<&Map<String, Value>>, keys: &[&str]) -> String {
    map.and_then(|map| text_field(map, keys))
        .unwrap_or_else(|| NOT_DETECTED.to_string())
}

fn clamp_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;

//! Terminal rendering of the form, progress indicator and results view.

use std::fmt::Write as _;

use client_core::view::ResultsView;

const BAR_WIDTH: usize = 30;

pub fn progress_line(progress: u8) -> String {
    let progress = progress.min(100);
    let filled = usize::from(progress) * BAR_WIDTH / 100;
    format!(
        "Analyzing resume [{}{}] {progress:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled)
    )
}

pub fn error(message: &str) -> String {
    format!("Error: {message}")
}

pub fn results(view: &ResultsView) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "ATS score: {}/100 ({}) [{}]",
        view.score,
        view.tier.label(),
        view.tier.style_class()
    );
    if let (Some(before), Some(improvement)) = (view.score_before, view.score_improvement) {
        let _ = writeln!(out, "  before optimization: {before}/100 ({improvement:+.1})");
    }

    let _ = writeln!(out, "\nCandidate");
    let _ = writeln!(out, "  name:  {}", view.candidate.name);
    let _ = writeln!(out, "  email: {}", view.candidate.email);
    let _ = writeln!(out, "  phone: {}", view.candidate.phone);

    let _ = writeln!(out, "\nSkills ({}/100)", view.skills.score);
    write_list(&mut out, "matched", &view.skills.matched);
    write_list(&mut out, "missing", &view.skills.missing);

    let _ = writeln!(out, "\nExperience ({}/100)", view.experience.score);
    let _ = writeln!(out, "  years: {}", view.experience.years);
    let _ = writeln!(out, "  level: {}", view.experience.level);

    let _ = writeln!(out, "\nEducation ({}/100)", view.education.score);
    let _ = writeln!(out, "  degree:      {}", view.education.degree);
    let _ = writeln!(out, "  institution: {}", view.education.institution);

    if !view.recommendations.is_empty() {
        let _ = writeln!(out, "\nRecommendations");
        for (index, line) in view.recommendations.iter().enumerate() {
            let _ = writeln!(out, "  {}. {line}", index + 1);
        }
    }

    if let Some(url) = &view.report_url {
        let _ = writeln!(out, "\nReport: {url}");
    }

    out
}

fn write_list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(out, "  {label}: none");
    } else {
        let _ = writeln!(out, "  {label}: {}", items.join(", "));
    }
}

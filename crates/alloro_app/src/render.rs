//! Text rendering of the view model for the terminal front-end.

use alloro_core::{
    format_score, AppViewModel, JobKind, JobRowView, NoticeLevel, OnboardingState, RankingResult,
    ResultView, Route,
};

const BAR_WIDTH: usize = 20;
pub const RETRY_PROMPT: &str = "Press Enter to try again, or q then Enter to quit.";

pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    for row in &view.jobs {
        render_job(row, &mut lines);
    }

    match &view.onboarding {
        OnboardingState::Idle => {}
        OnboardingState::Completing => lines.push("Finishing onboarding...".to_string()),
        OnboardingState::Completed => lines.push("Onboarding complete".to_string()),
        OnboardingState::Failed(message) => {
            lines.push(format!("Onboarding failed: {message}"));
            lines.push(RETRY_PROMPT.to_string());
        }
    }
    if let Some(Route::Dashboard) = view.navigation {
        lines.push("Opening dashboard".to_string());
    }
    if let Some(notice) = &view.notice {
        let prefix = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        lines.push(format!("{prefix}: {}", notice.text));
    }
    lines
}

fn render_job(row: &JobRowView, lines: &mut Vec<String>) {
    let label = match row.kind {
        JobKind::Ranking => "Ranking",
        JobKind::Billing => "Billing",
    };
    lines.push(format!(
        "[{label} {}] {:<10} {} {:>3}%  {}",
        row.job_id,
        row.badge,
        progress_bar(row.progress_percent, BAR_WIDTH),
        row.progress_percent,
        row.message
    ));
    if !row.steps_completed.is_empty() {
        lines.push(format!("    steps: {}", row.steps_completed.join(", ")));
    }
    if let Some(score) = &row.score_line {
        lines.push(format!("    {score}"));
    }
    match &row.result {
        ResultView::NotRequested => {}
        ResultView::Loading => lines.push("    Loading results...".to_string()),
        ResultView::Ready(result) => render_result(result, lines),
        ResultView::Unavailable(message) => {
            lines.push(format!("    Results unavailable: {message}"));
            lines.push(format!("    {RETRY_PROMPT}"));
        }
    }
    if row.can_retry {
        lines.push(format!("    {RETRY_PROMPT}"));
    }
}

fn render_result(result: &RankingResult, lines: &mut Vec<String>) {
    let place = match &result.location {
        Some(location) => format!("{} ({location})", result.practice_name),
        None => result.practice_name.clone(),
    };
    lines.push(format!("    Results for {place}"));
    for (index, competitor) in result.competitors.iter().enumerate() {
        let position = competitor.position.map_or(index + 1, |p| p as usize);
        let mut line = format!("      {position:>2}. {}", competitor.name);
        if let Some(score) = competitor.score {
            line.push_str(&format!("  score {}", format_score(score)));
        }
        if let Some(reviews) = competitor.review_count {
            line.push_str(&format!("  {reviews} reviews"));
        }
        if let Some(rating) = competitor.rating {
            line.push_str(&format!("  rating {rating:.1}"));
        }
        lines.push(line);
    }
    if let Some(analysis) = &result.analysis {
        lines.push(format!("    Analysis: {analysis}"));
    }
}

pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = usize::from(percent.min(100)) * width / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Remembers the previous frame so only changed lines are printed.
#[derive(Debug, Default)]
pub struct Renderer {
    last: Vec<String>,
}

impl Renderer {
    pub fn frame(&mut self, view: &AppViewModel) -> Vec<String> {
        let lines = render(view);
        let fresh = lines
            .iter()
            .filter(|line| !self.last.contains(line))
            .cloned()
            .collect();
        self.last = lines;
        fresh
    }
}

// Text rendering of combo and level state for the terminal front end.

use crate::core::input::note_name;
use crate::game::combo::{ComboSnapshot, PROGRESS_MAX};
use crate::game::leveling::{LevelInfo, level_title};
use crate::game::profile::Profile;
use crate::game::session::SessionSummary;

const BAR_WIDTH: usize = 20;

/// `[#####-----]` with `fraction` in 0..=1.
pub fn bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = ((fraction * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[inline(always)]
fn badge(multiplier: u32) -> String {
    format!("x{multiplier}")
}

pub fn combo_line(combo: &ComboSnapshot, level: &LevelInfo, show_bar: bool) -> String {
    let mut line = format!("Combo {:>6} {:>3}", combo.score, badge(combo.multiplier));
    if show_bar {
        line.push(' ');
        line.push_str(&bar(f64::from(combo.progress / PROGRESS_MAX), BAR_WIDTH));
    }
    line.push_str(&format!(
        "  Lv {} {:>3.0}%",
        level.level,
        level.progress * 100.0
    ));
    line
}

pub fn profile_lines(profile: &Profile) -> Vec<String> {
    let level = profile.level_info();
    let mut lines = vec![
        format!(
            "{}: Lv {} {}",
            profile.display_name,
            level.level,
            level_title(level.level)
        ),
        format!(
            "XP {} {} {}/{}",
            profile.total_xp,
            bar(level.progress, BAR_WIDTH),
            level.xp_into_level,
            level.xp_for_next
        ),
        format!(
            "Sessions {}  Notes {}  Best {}  Best combo {}",
            profile.sessions_completed,
            profile.notes_played,
            badge(profile.best_multiplier),
            profile.best_combo_score
        ),
    ];
    if let Some(last) = &profile.last_played {
        lines.push(format!("Last played {}", last.format("%Y-%m-%d %H:%M")));
    }
    lines
}

pub fn summary_lines(summary: &SessionSummary) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Session {} ({:.0}s): {} notes",
            summary.started_at.format("%Y-%m-%d %H:%M"),
            summary.duration_secs,
            summary.notes_played
        ),
        format!(
            "+{} XP ({} bonus)  Best {}  Peak combo {}",
            summary.xp_earned,
            summary.bonus_xp,
            badge(summary.best_multiplier),
            summary.peak_combo_score
        ),
    ];
    if let Some(note) = summary.most_played_note {
        lines.push(format!("Favourite note {}", note_name(note)));
    }
    if summary.leveled_up() {
        lines.push(format!(
            "Level up! {} -> {} ({})",
            summary.level_before,
            summary.level_after,
            level_title(summary.level_after)
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::leveling::level_info;

    #[test]
    fn bar_fills_proportionally_and_clamps() {
        assert_eq!(bar(0.0, 4), "[----]");
        assert_eq!(bar(0.5, 4), "[##--]");
        assert_eq!(bar(1.0, 4), "[####]");
        assert_eq!(bar(3.0, 4), "[####]");
        assert_eq!(bar(-1.0, 4), "[----]");
        assert_eq!(bar(f64::NAN, 4), "[----]");
    }

    #[test]
    fn combo_line_shows_badge_bar_and_level() {
        let combo = ComboSnapshot {
            score: 530,
            multiplier: 2,
            progress: 50.0,
            ..ComboSnapshot::default()
        };
        let line = combo_line(&combo, &level_info(170.0), true);
        assert!(line.contains("530"), "{line}");
        assert!(line.contains("x2"), "{line}");
        assert!(line.contains("[##########----------]"), "{line}");
        assert!(line.contains("Lv 2"), "{line}");
        assert!(line.contains("50%"), "{line}");

        let bare = combo_line(&combo, &level_info(0.0), false);
        assert!(!bare.contains('['), "{bare}");
    }

    #[test]
    fn profile_lines_include_title() {
        let profile = Profile {
            total_xp: 240,
            ..Profile::default()
        };
        let lines = profile_lines(&profile);
        assert_eq!(lines[0], "Player: Lv 3 Apprentice");
        assert_eq!(lines.len(), 3, "no last-played line for a fresh profile");
    }
}

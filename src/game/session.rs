use crate::core::input::NoteEvent;
use crate::game::combo::ComboSnapshot;
use crate::game::leveling::{self, XP_PER_NOTE, XP_SESSION_BONUS};
use chrono::{DateTime, Local};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

/// End-of-session report, also the line format of the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Local>,
    pub duration_secs: f64,
    pub notes_played: u64,
    /// Note XP plus the completion bonus.
    pub xp_earned: u64,
    pub bonus_xp: u64,
    pub best_multiplier: u32,
    pub peak_combo_score: u64,
    pub most_played_note: Option<u8>,
    pub level_before: u32,
    pub level_after: u32,
    // Part of xp_earned not yet flushed to the profile.
    #[serde(skip)]
    pub xp_pending: u64,
}

impl SessionSummary {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// One recording session: counts notes and accrues XP against the profile
/// total it started from.
#[derive(Debug)]
pub struct Session {
    started_at: DateTime<Local>,
    started: Instant,
    starting_total_xp: u64,
    notes_played: u64,
    note_counts: BTreeMap<u8, u64>,
    xp_flushed: u64,
}

impl Session {
    pub fn start(starting_total_xp: u64) -> Self {
        Self {
            started_at: Local::now(),
            started: Instant::now(),
            starting_total_xp,
            notes_played: 0,
            note_counts: BTreeMap::new(),
            xp_flushed: 0,
        }
    }

    pub fn record_note(&mut self, event: NoteEvent) {
        self.notes_played += 1;
        *self.note_counts.entry(event.note).or_default() += 1;
    }

    pub fn notes_played(&self) -> u64 {
        self.notes_played
    }

    /// XP from notes so far. The completion bonus is only added by `finish`.
    pub fn note_xp(&self) -> u64 {
        self.notes_played.saturating_mul(XP_PER_NOTE)
    }

    /// Profile total as it stands mid-session, for live level display.
    pub fn live_total_xp(&self) -> u64 {
        self.starting_total_xp.saturating_add(self.note_xp())
    }

    /// XP earned since the last flush; marks it as flushed.
    pub fn take_unflushed_xp(&mut self) -> u64 {
        let pending = self.note_xp().saturating_sub(self.xp_flushed);
        self.xp_flushed += pending;
        pending
    }

    fn most_played_note(&self) -> Option<u8> {
        // Ties go to the lower note.
        self.note_counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(&note, _)| note)
    }

    /// Closes the session. Empty sessions earn no completion bonus.
    pub fn finish(&self, combo: ComboSnapshot) -> SessionSummary {
        let bonus_xp = if self.notes_played > 0 {
            XP_SESSION_BONUS
        } else {
            0
        };
        let xp_earned = self.note_xp().saturating_add(bonus_xp);
        let final_total = self.starting_total_xp.saturating_add(xp_earned);

        let summary = SessionSummary {
            started_at: self.started_at,
            duration_secs: self.started.elapsed().as_secs_f64(),
            notes_played: self.notes_played,
            xp_earned,
            bonus_xp,
            best_multiplier: combo.max_multiplier,
            peak_combo_score: combo.peak_score,
            most_played_note: self.most_played_note(),
            level_before: leveling::level_from_xp(self.starting_total_xp as f64),
            level_after: leveling::level_from_xp(final_total as f64),
            xp_pending: xp_earned.saturating_sub(self.xp_flushed),
        };
        info!(
            "Session finished: {} notes, +{} XP, best x{}.",
            summary.notes_played, summary.xp_earned, summary.best_multiplier
        );
        summary
    }
}

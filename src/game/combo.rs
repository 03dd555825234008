use log::debug;
use serde::{Deserialize, Serialize};

// Energy gained per note hit and lost per decay tick, in percent of the bar.
pub const PROGRESS_PER_HIT: f32 = 15.0;
pub const PROGRESS_DECAY_PER_TICK: f32 = 2.5;
pub const PROGRESS_MAX: f32 = 100.0;

pub const POINTS_PER_HIT: u64 = 10;

pub const DECAY_TICK_MS: u64 = 100;
// A streak with no hits for this long is dropped even if energy is left.
pub const INACTIVITY_RESET_MS: u64 = 30_000;

// (score strictly above, multiplier), highest first.
const TIERS: [(u64, u32); 3] = [(5000, 8), (2000, 4), (500, 2)];

/// Multiplier tier for a combo score. Always one of 1, 2, 4, 8.
#[inline(always)]
pub fn tier_for(score: u64) -> u32 {
    TIERS
        .iter()
        .find(|&&(threshold, _)| score > threshold)
        .map_or(1, |&(_, multiplier)| multiplier)
}

/// Read-only view of the combo for the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComboSnapshot {
    pub score: u64,
    pub multiplier: u32,
    /// Remaining energy, 0..=100.
    pub progress: f32,
    pub max_multiplier: u32,
    pub peak_score: u64,
}

impl Default for ComboSnapshot {
    fn default() -> Self {
        Self {
            score: 0,
            multiplier: 1,
            progress: 0.0,
            max_multiplier: 1,
            peak_score: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to decay.
    Idle,
    Decayed,
    /// Energy ran out and the streak collapsed.
    Depleted,
    /// No hits for longer than INACTIVITY_RESET_MS.
    TimedOut,
}

/// Combo streak state machine.
///
/// Time is passed in explicitly as monotonic milliseconds so the owner decides
/// which clock drives both the decay tick and the inactivity check.
#[derive(Debug, Clone)]
pub struct ComboEngine {
    score: u64,
    multiplier: u32,
    progress: f32,
    last_action_ms: u64,
    max_multiplier: u32,
    peak_score: u64,
}

impl ComboEngine {
    pub fn new(now_ms: u64) -> Self {
        Self {
            score: 0,
            multiplier: 1,
            progress: 0.0,
            last_action_ms: now_ms,
            max_multiplier: 1,
            peak_score: 0,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn max_multiplier(&self) -> u32 {
        self.max_multiplier
    }

    pub fn snapshot(&self) -> ComboSnapshot {
        ComboSnapshot {
            score: self.score,
            multiplier: self.multiplier,
            progress: self.progress,
            max_multiplier: self.max_multiplier,
            peak_score: self.peak_score,
        }
    }

    /// One note was played at `now_ms`.
    ///
    /// Points use the multiplier in effect before the hit; the tier is
    /// recomputed afterwards and applies from the next hit on.
    pub fn process_note_hit(&mut self, now_ms: u64) {
        self.last_action_ms = now_ms;
        self.progress = (self.progress + PROGRESS_PER_HIT).min(PROGRESS_MAX);
        self.score = self
            .score
            .saturating_add(POINTS_PER_HIT * u64::from(self.multiplier));
        self.peak_score = self.peak_score.max(self.score);

        let tier = tier_for(self.score);
        if tier != self.multiplier {
            debug!("Combo tier x{} -> x{} at score {}", self.multiplier, tier, self.score);
        }
        self.multiplier = tier;
        self.max_multiplier = self.max_multiplier.max(tier);
    }

    /// Periodic decay, expected every DECAY_TICK_MS.
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        let had_energy = self.progress > 0.0;
        self.progress = (self.progress - PROGRESS_DECAY_PER_TICK).max(0.0);

        let mut outcome = if had_energy {
            TickOutcome::Decayed
        } else {
            TickOutcome::Idle
        };

        if self.progress <= 0.0 && (self.multiplier > 1 || self.score > 0) {
            debug!("Combo depleted at score {} (x{})", self.score, self.multiplier);
            self.collapse();
            outcome = TickOutcome::Depleted;
        }

        if self.score > 0 && now_ms.saturating_sub(self.last_action_ms) > INACTIVITY_RESET_MS {
            debug!(
                "Combo timed out after {}ms idle at score {}",
                now_ms.saturating_sub(self.last_action_ms),
                self.score
            );
            self.collapse();
            outcome = TickOutcome::TimedOut;
        }

        outcome
    }

    /// Clears the streak and the session high-water marks.
    pub fn reset_combo(&mut self) {
        self.collapse();
        self.max_multiplier = 1;
        self.peak_score = 0;
    }

    // Back to the zero state. High-water marks survive.
    fn collapse(&mut self) {
        self.score = 0;
        self.multiplier = 1;
        self.progress = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(engine: &mut ComboEngine, n: usize, now_ms: u64) {
        for _ in 0..n {
            engine.process_note_hit(now_ms);
        }
    }

    #[test]
    fn tiers_are_strictly_greater_than() {
        assert_eq!(tier_for(0), 1);
        assert_eq!(tier_for(500), 1);
        assert_eq!(tier_for(501), 2);
        assert_eq!(tier_for(2000), 2);
        assert_eq!(tier_for(2001), 4);
        assert_eq!(tier_for(5000), 4);
        assert_eq!(tier_for(5001), 8);
        assert_eq!(tier_for(u64::MAX), 8);
    }

    #[test]
    fn tier_mapping_is_monotonic() {
        let mut prev = 1;
        for score in (0..7000).step_by(5) {
            let tier = tier_for(score);
            assert!([1, 2, 4, 8].contains(&tier));
            assert!(tier >= prev, "tier dropped at score {score}");
            prev = tier;
        }
    }

    #[test]
    fn first_hit_from_zero_state() {
        let mut engine = ComboEngine::new(0);
        engine.process_note_hit(10);
        let s = engine.snapshot();
        assert_eq!(s.score, 10);
        assert_eq!(s.multiplier, 1);
        assert_eq!(s.progress, 15.0);
        assert_eq!(s.max_multiplier, 1);
    }

    #[test]
    fn hit_uses_multiplier_in_effect_before_the_hit() {
        let mut engine = ComboEngine::new(0);
        hits(&mut engine, 50, 0);
        assert_eq!(engine.score(), 500);
        assert_eq!(engine.multiplier(), 1, "500 is not above the x2 threshold");

        engine.process_note_hit(0);
        assert_eq!(engine.score(), 510);
        assert_eq!(engine.multiplier(), 2, "51st hit promotes after scoring");

        engine.process_note_hit(0);
        assert_eq!(engine.score(), 530, "next hit scores 10 * 2");
    }

    #[test]
    fn hit_adds_ten_times_multiplier() {
        let mut engine = ComboEngine::new(0);
        for _ in 0..800 {
            let before = engine.snapshot();
            engine.process_note_hit(0);
            assert_eq!(
                engine.score() - before.score,
                10 * u64::from(before.multiplier),
                "at score {}",
                before.score
            );
        }
        assert_eq!(engine.multiplier(), 8);
    }

    #[test]
    fn progress_clamps_to_bounds() {
        let mut engine = ComboEngine::new(0);
        hits(&mut engine, 20, 0);
        assert_eq!(engine.progress(), PROGRESS_MAX);
        for step in 0..100 {
            engine.tick(step * DECAY_TICK_MS);
            let p = engine.progress();
            assert!((0.0..=PROGRESS_MAX).contains(&p), "progress {p} out of range");
        }
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn depletion_collapses_in_the_same_tick() {
        let mut engine = ComboEngine::new(0);
        engine.process_note_hit(0);
        assert_eq!(engine.progress(), 15.0);
        // 15 / 2.5 = 6 ticks to empty.
        for step in 1..6 {
            assert_eq!(engine.tick(step * DECAY_TICK_MS), TickOutcome::Decayed);
            assert_eq!(engine.score(), 10);
        }
        assert_eq!(engine.tick(600), TickOutcome::Depleted);
        let s = engine.snapshot();
        assert_eq!((s.score, s.multiplier, s.progress), (0, 1, 0.0));
    }

    #[test]
    fn small_remaining_energy_floors_and_collapses() {
        let mut engine = ComboEngine::new(0);
        hits(&mut engine, 5, 0);
        engine.progress = 2.0;
        engine.score = 50;
        assert_eq!(engine.tick(100), TickOutcome::Depleted);
        let s = engine.snapshot();
        assert_eq!((s.score, s.multiplier, s.progress), (0, 1, 0.0));
    }

    #[test]
    fn inactivity_overrides_banked_energy() {
        let mut engine = ComboEngine::new(0);
        hits(&mut engine, 7, 1_000);
        assert_eq!(engine.progress(), PROGRESS_MAX);

        engine.tick(1_000 + INACTIVITY_RESET_MS);
        assert!(engine.score() > 0, "exactly 30s idle is not yet a timeout");

        let outcome = engine.tick(1_000 + INACTIVITY_RESET_MS + 1);
        assert_eq!(outcome, TickOutcome::TimedOut);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.multiplier(), 1);
        assert_eq!(engine.progress(), 0.0);
    }

    #[test]
    fn max_multiplier_survives_decay_but_not_reset() {
        let mut engine = ComboEngine::new(0);
        hits(&mut engine, 60, 0);
        assert_eq!(engine.multiplier(), 2);
        while engine.score() > 0 {
            engine.tick(0);
        }
        assert_eq!(engine.multiplier(), 1);
        assert_eq!(engine.max_multiplier(), 2);
        assert!(engine.snapshot().peak_score > 500);

        engine.reset_combo();
        assert_eq!(engine.max_multiplier(), 1);
        assert_eq!(engine.snapshot(), ComboSnapshot::default());
    }

    #[test]
    fn decay_always_reaches_zero_state() {
        let mut engine = ComboEngine::new(0);
        hits(&mut engine, 300, 0);
        let mut ticks = 0;
        while engine.progress() > 0.0 {
            engine.tick(0);
            ticks += 1;
            assert!(ticks <= 40, "100 energy drains in 40 ticks");
        }
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.multiplier(), 1);
    }

    #[test]
    fn ticking_an_empty_combo_is_harmless() {
        let mut engine = ComboEngine::new(0);
        assert_eq!(engine.tick(INACTIVITY_RESET_MS * 3), TickOutcome::Idle);
        assert_eq!(engine.snapshot(), ComboSnapshot::default());
        engine.reset_combo();
        engine.reset_combo();
        assert_eq!(engine.snapshot(), ComboSnapshot::default());
    }
}

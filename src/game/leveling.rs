// Player progression: cumulative XP -> level on an exponential cost curve.
//
// Level 1 is free. Advancing from level N to N+1 costs
// floor(BASE_XP * GROWTH_FACTOR^(N-1)), so 1->2 costs 100, 2->3 costs 140,
// 3->4 costs 196, and every step costs 40% more than the last.

use serde::{Deserialize, Serialize};

pub const BASE_XP: u64 = 100;
pub const GROWTH_FACTOR: f64 = 1.4;

// GROWTH_FACTOR as an exact fraction. 1.4 has no exact binary form and
// 1.4f64.powi(2) * 100.0 floors to 195, so small levels use integer math.
const GROWTH_NUM: u128 = 7;
const GROWTH_DEN: u128 = 5;

/// XP granted for every note played.
pub const XP_PER_NOTE: u64 = 1;
/// Flat XP granted once per completed session.
pub const XP_SESSION_BONUS: u64 = 25;

/// XP needed to reach `level` from `level - 1`: the cost of the step that
/// ends on `level`, so `xp_to_reach(2)` is the 100 XP paid to leave level 1.
///
/// Levels at or below 1 return 0 (nothing is required to be level 1). The
/// result saturates at `u64::MAX` for absurdly high levels.
pub fn xp_to_reach(level: u32) -> u64 {
    step_cost(level).map_or(u64::MAX, |cost| u64::try_from(cost).unwrap_or(u64::MAX))
}

/// Same contract as [`xp_to_reach`]; the name players know from the profile
/// page.
#[inline(always)]
pub fn xp_for_level(level: u32) -> u64 {
    xp_to_reach(level)
}

// Integer step cost, or None once it no longer fits in a u128.
fn step_cost(level: u32) -> Option<u128> {
    if level <= 1 {
        return Some(0);
    }
    let steps = level - 2;
    exact_requirement(steps).or_else(|| {
        let cost = float_requirement(steps);
        (cost < u128::MAX as f64).then_some(cost as u128)
    })
}

fn exact_requirement(steps: u32) -> Option<u128> {
    let num = GROWTH_NUM
        .checked_pow(steps)?
        .checked_mul(u128::from(BASE_XP))?;
    let den = GROWTH_DEN.checked_pow(steps)?;
    Some(num / den)
}

// Past the integer range the cost grows to +inf, so the float walk stops on
// its own.
fn float_requirement(steps: u32) -> f64 {
    (BASE_XP as f64 * GROWTH_FACTOR.powf(f64::from(steps))).floor()
}

fn next_step_cost(level: u32) -> f64 {
    let next = level.saturating_add(1);
    step_cost(next).map_or_else(|| float_requirement(next - 2), |cost| cost as f64)
}

#[inline(always)]
fn sanitize_xp(total_xp: f64) -> f64 {
    if total_xp.is_finite() && total_xp > 0.0 {
        total_xp
    } else {
        0.0
    }
}

/// Total XP spent to go from level 1 up to `level`. Saturates at
/// `u128::MAX`.
pub fn cumulative_xp_through(level: u32) -> u128 {
    (2..=level.max(1)).fold(0u128, |acc, l| {
        acc.saturating_add(step_cost(l).unwrap_or(u128::MAX))
    })
}

// Walks the curve once and returns (level, cumulative XP at that level).
//
// Sums are kept in integers so every boundary lands exactly where
// `cumulative_xp_through` puts it; a threshold is compared after the same
// u128 -> f64 rounding the caller's XP went through.
fn walk(total_xp: f64) -> (u32, f64) {
    let total_xp = sanitize_xp(total_xp);
    let mut level: u32 = 1;
    let mut cumulative: u128 = 0;
    while level < u32::MAX {
        let Some(reached) = step_cost(level + 1).and_then(|cost| cumulative.checked_add(cost))
        else {
            break;
        };
        if reached as f64 > total_xp {
            return (level, cumulative as f64);
        }
        cumulative = reached;
        level += 1;
    }

    let mut cumulative = cumulative as f64;
    loop {
        if level == u32::MAX {
            return (level, cumulative);
        }
        let next = float_requirement(level - 1);
        if cumulative + next > total_xp {
            return (level, cumulative);
        }
        cumulative += next;
        level += 1;
    }
}

/// Highest level whose cumulative cost does not exceed `total_xp`.
///
/// Negative, NaN and infinite inputs are treated as 0 XP.
pub fn level_from_xp(total_xp: f64) -> u32 {
    walk(total_xp).0
}

/// Fraction in [0, 1] of the way from the current level to the next one.
///
/// Landing exactly on a level boundary reports the new level at 0.
pub fn level_progress(total_xp: f64) -> f64 {
    let total_xp = sanitize_xp(total_xp);
    let (level, cumulative) = walk(total_xp);
    let next = next_step_cost(level);
    if next <= 0.0 {
        return 1.0;
    }
    ((total_xp - cumulative) / next).clamp(0.0, 1.0)
}

/// Everything a profile or summary screen needs to draw an XP bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub level: u32,
    pub progress: f64,
    pub xp_into_level: u64,
    pub xp_for_next: u64,
}

pub fn level_info(total_xp: f64) -> LevelInfo {
    let total_xp = sanitize_xp(total_xp);
    let (level, cumulative) = walk(total_xp);
    LevelInfo {
        level,
        progress: level_progress(total_xp),
        xp_into_level: (total_xp - cumulative).max(0.0) as u64,
        xp_for_next: xp_to_reach(level.saturating_add(1)),
    }
}

pub fn level_title(level: u32) -> &'static str {
    match level {
        0..=2 => "Novice",
        3..=5 => "Apprentice",
        6..=9 => "Performer",
        10..=14 => "Soloist",
        15..=19 => "Maestro",
        _ => "Virtuoso",
    }
}

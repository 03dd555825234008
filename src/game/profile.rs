use crate::config::SimpleIni;
use crate::game::leveling::{self, LevelInfo};
use crate::game::session::SessionSummary;
use chrono::{DateTime, Local};
use log::{info, warn};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

const PROFILE_INI: &str = "profile.ini";
const SESSION_HISTORY: &str = "sessions.jsonl";

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub display_name: String,
    pub total_xp: u64,
    pub sessions_completed: u32,
    pub notes_played: u64,
    pub best_multiplier: u32,
    pub best_combo_score: u64,
    pub last_played: Option<DateTime<Local>>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            display_name: "Player".to_string(),
            total_xp: 0,
            sessions_completed: 0,
            notes_played: 0,
            best_multiplier: 1,
            best_combo_score: 0,
            last_played: None,
        }
    }
}

impl Profile {
    pub fn level_info(&self) -> LevelInfo {
        leveling::level_info(self.total_xp as f64)
    }

    fn from_ini(ini: &SimpleIni) -> Self {
        let default = Self::default();
        Self {
            display_name: ini
                .get("userprofile", "DisplayName")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(default.display_name),
            total_xp: ini
                .get("Stats", "TotalXp")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(default.total_xp),
            sessions_completed: ini
                .get("Stats", "SessionsCompleted")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(default.sessions_completed),
            notes_played: ini
                .get("Stats", "NotesPlayed")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(default.notes_played),
            best_multiplier: ini
                .get("Stats", "BestMultiplier")
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|m| [1, 2, 4, 8].contains(m))
                .unwrap_or(default.best_multiplier),
            best_combo_score: ini
                .get("Stats", "BestComboScore")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(default.best_combo_score),
            last_played: ini
                .get("Stats", "LastPlayed")
                .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
                .map(|dt| dt.with_timezone(&Local)),
        }
    }

    fn to_ini(&self) -> String {
        let mut content = String::new();

        content.push_str("[userprofile]\n");
        content.push_str(&format!("DisplayName={}\n", self.display_name));
        content.push('\n');

        content.push_str("[Stats]\n");
        content.push_str(&format!("BestComboScore={}\n", self.best_combo_score));
        content.push_str(&format!("BestMultiplier={}\n", self.best_multiplier));
        match &self.last_played {
            Some(dt) => content.push_str(&format!("LastPlayed={}\n", dt.to_rfc3339())),
            None => content.push_str("LastPlayed=\n"),
        }
        content.push_str(&format!("NotesPlayed={}\n", self.notes_played));
        content.push_str(&format!("SessionsCompleted={}\n", self.sessions_completed));
        content.push_str(&format!("TotalXp={}\n", self.total_xp));
        content.push('\n');

        content
    }
}

/// A local profile on disk: `<root>/<id>/profile.ini` plus a JSON-lines
/// session history next to it.
#[derive(Debug)]
pub struct ProfileStore {
    dir: PathBuf,
    profile: Profile,
}

impl ProfileStore {
    /// Loads the profile, creating it with defaults if it does not exist yet.
    /// Unreadable files are logged and replaced by defaults in memory.
    pub fn open(root: &Path, id: &str) -> Self {
        let dir = root.join(id);
        let ini_path = dir.join(PROFILE_INI);

        let profile = if ini_path.is_file() {
            let mut ini = SimpleIni::new();
            match ini.load(&ini_path) {
                Ok(()) => Profile::from_ini(&ini),
                Err(e) => {
                    warn!("Failed to read {}: {e}", ini_path.display());
                    Profile::default()
                }
            }
        } else {
            info!("Creating new profile '{id}' in {}", dir.display());
            Profile::default()
        };

        let store = Self { dir, profile };
        if !ini_path.is_file()
            && let Err(e) = store.save()
        {
            warn!("Failed to create {}: {e}", ini_path.display());
        }
        info!(
            "Loaded profile '{}' (level {}, {} XP).",
            store.profile.display_name,
            store.profile.level_info().level,
            store.profile.total_xp
        );
        store
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(PROFILE_INI), self.profile.to_ini())
    }

    fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            warn!("Failed to save {}: {e}", self.dir.join(PROFILE_INI).display());
        }
    }

    /// Mid-session flush of note XP.
    pub fn add_xp(&mut self, xp: u64) {
        if xp == 0 {
            return;
        }
        self.profile.total_xp = self.profile.total_xp.saturating_add(xp);
        self.save_or_warn();
    }

    /// Folds a finished session into the profile and appends it to the
    /// history. Sessions without notes are not counted.
    pub fn record_session(&mut self, summary: &SessionSummary) {
        if summary.notes_played == 0 {
            info!("Skipping empty session.");
            return;
        }

        let p = &mut self.profile;
        p.total_xp = p.total_xp.saturating_add(summary.xp_pending);
        p.sessions_completed = p.sessions_completed.saturating_add(1);
        p.notes_played = p.notes_played.saturating_add(summary.notes_played);
        p.best_multiplier = p.best_multiplier.max(summary.best_multiplier);
        p.best_combo_score = p.best_combo_score.max(summary.peak_combo_score);
        p.last_played = Some(Local::now());
        self.save_or_warn();

        if let Err(e) = self.append_history(summary) {
            warn!("Failed to append session history: {e}");
        }
    }

    fn append_history(&self, summary: &SessionSummary) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.dir)?;
        let line = serde_json::to_string(summary).map_err(std::io::Error::other)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(SESSION_HISTORY))?;
        writeln!(file, "{line}")
    }

    /// Up to `limit` most recent sessions, newest first. Corrupt lines are skipped.
    pub fn recent_sessions(&self, limit: usize) -> Vec<SessionSummary> {
        let path = self.dir.join(SESSION_HISTORY);
        let Ok(file) = fs::File::open(&path) else {
            return Vec::new();
        };

        let mut sessions: Vec<SessionSummary> = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(&line) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!("Skipping bad history line in {}: {e}", path.display());
                    None
                }
            })
            .collect();
        sessions.reverse();
        sessions.truncate(limit);
        sessions
    }
}

use crate::core::input::{DEFAULT_BASE_NOTE, DEFAULT_NOTE_KEYS};
use log::{LevelFilter, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "keystreak.ini";
const FALLBACK_SAVE_DIR: &str = "save/profiles";
pub const DEFAULT_PROFILE_ID: &str = "00000000";

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content);
        Ok(())
    }

    pub fn load_str(&mut self, content: &str) {
        self.sections.clear();

        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some(eq_idx) = line.find('=') {
                let (key_raw, value_raw) = line.split_at(eq_idx);
                let key = key_raw.trim();
                if key.is_empty() {
                    continue;
                }
                let value = value_raw[1..].trim().to_string();
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(&self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: LogLevel,
    /// Seconds between mid-session XP flushes to the profile. 0 = only at
    /// session end.
    pub autosave_seconds: u32,
    pub show_combo_bar: bool,
    /// Profile root. Empty = platform data dir.
    pub save_dir: String,
    pub active_profile: String,
    /// Characters mapped to consecutive semitones.
    pub note_keys: String,
    pub base_note: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Warn,
            autosave_seconds: 30,
            show_combo_bar: true,
            save_dir: String::new(),
            active_profile: DEFAULT_PROFILE_ID.to_string(),
            note_keys: DEFAULT_NOTE_KEYS.to_string(),
            base_note: DEFAULT_BASE_NOTE,
        }
    }
}

impl Config {
    /// Where profiles live: `SaveDir` if set, else the platform data
    /// directory, else `save/profiles` next to the binary's working dir.
    pub fn profile_root(&self) -> PathBuf {
        let configured = self.save_dir.trim();
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
        directories::ProjectDirs::from("", "", "keystreak").map_or_else(
            || PathBuf::from(FALLBACK_SAVE_DIR),
            |dirs| dirs.data_dir().join("profiles"),
        )
    }
}

// Global, mutable configuration instance.
static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- File I/O ---

fn render(cfg: &Config) -> String {
    let mut content = String::new();

    // [Options] section - keys in alphabetical order
    content.push_str("[Options]\n");
    content.push_str(&format!("ActiveProfile={}\n", cfg.active_profile));
    content.push_str(&format!("AutosaveSeconds={}\n", cfg.autosave_seconds));
    content.push_str(&format!("LogLevel={}\n", cfg.log_level.as_str()));
    content.push_str(&format!("SaveDir={}\n", cfg.save_dir));
    content.push_str(&format!(
        "ShowComboBar={}\n",
        if cfg.show_combo_bar { "1" } else { "0" }
    ));
    content.push('\n');

    content.push_str("[Keymaps]\n");
    content.push_str(&format!("BaseNote={}\n", cfg.base_note));
    content.push_str(&format!("Notes={}\n", cfg.note_keys));
    content.push('\n');

    content
}

fn create_default_config_file() -> Result<(), std::io::Error> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    std::fs::write(CONFIG_PATH, render(&Config::default()))
}

/// Builds a config from parsed ini, using defaults for missing or malformed keys.
pub fn from_ini(conf: &SimpleIni) -> Config {
    let default = Config::default();
    Config {
        log_level: conf
            .get("Options", "LogLevel")
            .and_then(|v| LogLevel::from_str(&v).ok())
            .unwrap_or(default.log_level),
        autosave_seconds: conf
            .get("Options", "AutosaveSeconds")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(default.autosave_seconds),
        show_combo_bar: conf
            .get("Options", "ShowComboBar")
            .and_then(|v| v.parse::<u8>().ok())
            .map_or(default.show_combo_bar, |v| v != 0),
        save_dir: conf.get("Options", "SaveDir").unwrap_or(default.save_dir),
        active_profile: conf
            .get("Options", "ActiveProfile")
            .filter(|v| !v.is_empty())
            .unwrap_or(default.active_profile),
        note_keys: conf
            .get("Keymaps", "Notes")
            .filter(|v| !v.is_empty())
            .unwrap_or(default.note_keys),
        base_note: conf
            .get("Keymaps", "BaseNote")
            .and_then(|v| v.parse::<u8>().ok())
            .filter(|&n| n <= 127)
            .unwrap_or(default.base_note),
    }
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(CONFIG_PATH) {
        Ok(()) => {
            *CONFIG.lock().unwrap() = from_ini(&conf);
            info!("Configuration loaded from '{CONFIG_PATH}'.");
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values.");
        }
    }
}

pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}

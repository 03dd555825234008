use crate::config::{self, Config};
use crate::core::clock::SystemClock;
use crate::core::combo_driver::{ComboDriver, DECAY_TICK};
use crate::core::input::Keymap;
use crate::game::leveling;
use crate::game::profile::ProfileStore;
use crate::game::session::Session;
use crate::ui::status;
use log::{debug, info};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RECENT_SESSIONS_SHOWN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Play(String),
    NewSession,
    Stats,
    History,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Command {
    match line.trim() {
        ":q" | ":quit" => Command::Quit,
        ":new" => Command::NewSession,
        ":stats" => Command::Stats,
        ":history" => Command::History,
        ":help" | ":h" => Command::Help,
        _ => Command::Play(line.to_string()),
    }
}

fn print_lines(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

/// Owns the live recording session: combo driver, session counters and the
/// profile they flush into.
struct App {
    cfg: Config,
    keymap: Keymap,
    store: ProfileStore,
    driver: ComboDriver,
    session: Session,
    autosave_every: Option<Duration>,
    last_autosave: Instant,
}

impl App {
    fn new(cfg: Config) -> Self {
        let keymap = Keymap::new(&cfg.note_keys, cfg.base_note);
        let store = ProfileStore::open(&cfg.profile_root(), &cfg.active_profile);
        let driver = ComboDriver::spawn(Arc::new(SystemClock::new()), Some(DECAY_TICK));
        let session = Self::begin_session(&store);
        let autosave_every =
            (cfg.autosave_seconds > 0).then(|| Duration::from_secs(u64::from(cfg.autosave_seconds)));
        info!("{} keys mapped to notes.", keymap.len());
        Self {
            cfg,
            keymap,
            store,
            driver,
            session,
            autosave_every,
            last_autosave: Instant::now(),
        }
    }

    fn play(&mut self, line: &str) {
        for event in self.keymap.notes_in(line) {
            self.driver.note_hit();
            self.session.record_note(event);
        }
        debug!("{} notes this session.", self.session.notes_played());
    }

    fn maybe_autosave(&mut self) {
        let Some(every) = self.autosave_every else {
            return;
        };
        if self.last_autosave.elapsed() < every {
            return;
        }
        let xp = self.session.take_unflushed_xp();
        debug!("Autosave: flushing {xp} XP.");
        self.store.add_xp(xp);
        self.last_autosave = Instant::now();
    }

    fn status_line(&self) -> String {
        let level = leveling::level_info(self.session.live_total_xp() as f64);
        status::combo_line(&self.driver.snapshot(), &level, self.cfg.show_combo_bar)
    }

    fn begin_session(store: &ProfileStore) -> Session {
        let total = store.profile().total_xp;
        info!(
            "Session started at level {} ({total} XP).",
            leveling::level_from_xp(total as f64)
        );
        Session::start(total)
    }

    /// Closes the current session into the profile and starts a new one with
    /// a cleared combo.
    fn finish_session(&mut self, out: &mut impl Write) -> io::Result<()> {
        let combo = self.driver.snapshot();
        let summary = self.session.finish(combo);
        self.store.record_session(&summary);
        print_lines(out, &status::summary_lines(&summary))?;

        // Start from the post-bonus total.
        self.session = Self::begin_session(&self.store);
        self.driver.reset();
        self.last_autosave = Instant::now();
        Ok(())
    }

    fn shutdown(self, out: &mut impl Write) -> io::Result<()> {
        let combo = self.driver.stop();
        let summary = self.session.finish(combo);
        let mut store = self.store;
        store.record_session(&summary);
        print_lines(out, &status::summary_lines(&summary))?;
        print_lines(out, &status::profile_lines(store.profile()))
    }
}

fn print_help(out: &mut impl Write, keys: &str) -> io::Result<()> {
    writeln!(out, "Type piano keys ({keys}) and press Enter to play them.")?;
    writeln!(out, ":new  finish this session and start another")?;
    writeln!(out, ":stats  profile stats   :history  recent sessions")?;
    writeln!(out, ":q  finish and quit")
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cfg = config::get();
    let keys = cfg.note_keys.clone();
    let mut app = App::new(cfg);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    print_lines(&mut out, &status::profile_lines(app.store.profile()))?;
    print_help(&mut out, &keys)?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match parse_command(&line) {
            Command::Quit => break,
            Command::NewSession => app.finish_session(&mut out)?,
            Command::Stats => print_lines(&mut out, &status::profile_lines(app.store.profile()))?,
            Command::History => {
                for summary in app.store.recent_sessions(RECENT_SESSIONS_SHOWN) {
                    print_lines(&mut out, &status::summary_lines(&summary))?;
                }
            }
            Command::Help => print_help(&mut out, &keys)?,
            Command::Play(notes) => app.play(&notes),
        }
        app.maybe_autosave();
        writeln!(out, "{}", app.status_line())?;
        out.flush()?;
    }

    app.shutdown(&mut out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_recognised_and_everything_else_is_played() {
        assert_eq!(parse_command(":q"), Command::Quit);
        assert_eq!(parse_command("  :new "), Command::NewSession);
        assert_eq!(parse_command(":stats"), Command::Stats);
        assert_eq!(parse_command(":history"), Command::History);
        assert_eq!(parse_command(":h"), Command::Help);
        assert_eq!(parse_command("asdf"), Command::Play("asdf".to_string()));
        assert_eq!(parse_command(":unknown"), Command::Play(":unknown".to_string()));
    }

    #[test]
    fn new_session_starts_from_the_post_bonus_total() {
        let root = std::env::temp_dir().join(format!("keystreak-app-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let cfg = Config {
            save_dir: root.display().to_string(),
            autosave_seconds: 0,
            ..Config::default()
        };
        let mut app = App::new(cfg);
        app.play("asdf");
        assert_eq!(app.session.notes_played(), 4);

        let mut out = Vec::new();
        app.finish_session(&mut out).expect("writing to a Vec cannot fail");
        let earned = 4 + leveling::XP_SESSION_BONUS;
        assert_eq!(app.store.profile().total_xp, earned);
        assert_eq!(app.session.notes_played(), 0);
        assert_eq!(app.session.live_total_xp(), earned);
        assert_eq!(app.store.recent_sessions(RECENT_SESSIONS_SHOWN).len(), 1);
        assert_eq!(app.driver.snapshot().score, 0);

        // The fresh session has no notes, so quitting records nothing more.
        app.shutdown(&mut out).expect("writing to a Vec cannot fail");
        let store = ProfileStore::open(&root, crate::config::DEFAULT_PROFILE_ID);
        assert_eq!(store.profile().total_xp, earned);
        assert_eq!(store.recent_sessions(RECENT_SESSIONS_SHOWN).len(), 1);
        let _ = std::fs::remove_dir_all(&root);
    }
}

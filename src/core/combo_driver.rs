use crate::core::clock::Clock;
use crate::game::combo::{ComboEngine, ComboSnapshot, DECAY_TICK_MS, TickOutcome};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Duration;

pub const DECAY_TICK: Duration = Duration::from_millis(DECAY_TICK_MS);

/* ============================== Public API ============================== */

// Everything that mutates the combo goes through this queue, so a hit can
// never interleave with a half-applied decay. Hits and ticks carry the clock
// reading taken when they were sent, not when the engine gets to them.
enum ComboCommand {
    Hit(u64),
    Tick(u64),
    Reset,
    Snapshot(Sender<ComboSnapshot>),
    Shutdown,
}

/// Owns a `ComboEngine` on its own thread and, optionally, a timer thread
/// feeding it decay ticks.
///
/// Dropping the driver stops both threads; ticks that race the shutdown are
/// dropped on the floor.
pub struct ComboDriver {
    clock: Arc<dyn Clock>,
    command_sender: Sender<ComboCommand>,
    engine_thread: Option<thread::JoinHandle<ComboSnapshot>>,
    timer_thread: Option<thread::JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
}

impl ComboDriver {
    /// Starts the engine thread. With `tick_every` set, a timer thread sends
    /// a decay tick at that period; with `None` ticks come only from
    /// [`ComboDriver::tick`].
    pub fn spawn(clock: Arc<dyn Clock>, tick_every: Option<Duration>) -> Self {
        let (command_sender, command_receiver) = channel();
        let stop_signal = Arc::new(AtomicBool::new(false));

        let started_ms = clock.now_ms();
        let engine_thread = thread::spawn(move || combo_thread(command_receiver, started_ms));

        let timer_thread = tick_every.map(|period| {
            let sender = command_sender.clone();
            let stop = stop_signal.clone();
            let clock = clock.clone();
            thread::spawn(move || timer_thread_loop(sender, stop, clock, period))
        });

        info!(
            "Combo engine started (decay every {}).",
            tick_every.map_or_else(|| "manual".to_string(), |p| format!("{}ms", p.as_millis()))
        );
        Self {
            clock,
            command_sender,
            engine_thread: Some(engine_thread),
            timer_thread,
            stop_signal,
        }
    }

    pub fn note_hit(&self) {
        let _ = self.command_sender.send(ComboCommand::Hit(self.clock.now_ms()));
    }

    pub fn tick(&self) {
        let _ = self.command_sender.send(ComboCommand::Tick(self.clock.now_ms()));
    }

    /// Starts a fresh session: clears the streak and the high-water marks.
    pub fn reset(&self) {
        let _ = self.command_sender.send(ComboCommand::Reset);
    }

    /// State after every command queued so far has been applied.
    pub fn snapshot(&self) -> ComboSnapshot {
        let (reply_sender, reply_receiver) = channel();
        if self
            .command_sender
            .send(ComboCommand::Snapshot(reply_sender))
            .is_err()
        {
            return ComboSnapshot::default();
        }
        reply_receiver.recv().unwrap_or_default()
    }

    /// Tears the engine down and returns its final state.
    pub fn stop(mut self) -> ComboSnapshot {
        self.shutdown()
    }

    fn shutdown(&mut self) -> ComboSnapshot {
        self.stop_signal.store(true, Ordering::Relaxed);
        let _ = self.command_sender.send(ComboCommand::Shutdown);

        let final_state = match self.engine_thread.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                warn!("Combo engine thread panicked; reporting an empty combo.");
                ComboSnapshot::default()
            }),
            None => ComboSnapshot::default(),
        };
        if let Some(handle) = self.timer_thread.take() {
            let _ = handle.join();
        }
        final_state
    }
}

impl Drop for ComboDriver {
    fn drop(&mut self) {
        if self.engine_thread.is_some() {
            self.shutdown();
        }
    }
}

/* ============================ Engine internals ============================ */

fn combo_thread(command_receiver: Receiver<ComboCommand>, started_ms: u64) -> ComboSnapshot {
    let mut engine = ComboEngine::new(started_ms);

    // A closed channel means the driver is gone; same as Shutdown.
    while let Ok(command) = command_receiver.recv() {
        match command {
            ComboCommand::Hit(at_ms) => engine.process_note_hit(at_ms),
            ComboCommand::Tick(at_ms) => match engine.tick(at_ms) {
                TickOutcome::Depleted => debug!("Combo ran out of energy."),
                TickOutcome::TimedOut => debug!("Combo dropped after inactivity."),
                TickOutcome::Decayed | TickOutcome::Idle => {}
            },
            ComboCommand::Reset => engine.reset_combo(),
            ComboCommand::Snapshot(reply) => {
                let _ = reply.send(engine.snapshot());
            }
            ComboCommand::Shutdown => break,
        }
    }

    info!("Combo engine stopped.");
    engine.snapshot()
}

fn timer_thread_loop(
    sender: Sender<ComboCommand>,
    stop: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
    period: Duration,
) {
    loop {
        thread::sleep(period);
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if sender.send(ComboCommand::Tick(clock.now_ms())).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::game::combo::INACTIVITY_RESET_MS;

    fn manual_driver() -> (ComboDriver, ManualClock) {
        let clock = ManualClock::new(0);
        let driver = ComboDriver::spawn(Arc::new(clock.clone()), None);
        (driver, clock)
    }

    #[test]
    fn hits_and_ticks_apply_in_order() {
        let (driver, _clock) = manual_driver();
        driver.note_hit();
        driver.note_hit();
        driver.tick();
        let s = driver.snapshot();
        assert_eq!(s.score, 20);
        assert_eq!(s.progress, 27.5);
        assert_eq!(s.multiplier, 1);
    }

    #[test]
    fn inactivity_uses_the_injected_clock() {
        let (driver, clock) = manual_driver();
        for _ in 0..7 {
            driver.note_hit();
        }
        clock.advance(INACTIVITY_RESET_MS + 1);
        driver.tick();
        let s = driver.snapshot();
        assert_eq!(s.score, 0, "idle streak should be dropped");
        assert_eq!(s.max_multiplier, 1);
    }

    #[test]
    fn hits_keep_the_time_they_were_played() {
        let (driver, clock) = manual_driver();
        clock.set(1_000);
        driver.note_hit();
        // A backlog drained later must not push the inactivity window out.
        clock.set(1_000 + INACTIVITY_RESET_MS);
        assert_eq!(driver.snapshot().score, 10);
        clock.advance(1);
        driver.tick();
        assert_eq!(driver.snapshot().score, 0, "30001 ms after the hit");
    }

    #[test]
    fn reset_clears_high_water_mark() {
        let (driver, _clock) = manual_driver();
        for _ in 0..60 {
            driver.note_hit();
        }
        assert_eq!(driver.snapshot().max_multiplier, 2);
        driver.reset();
        assert_eq!(driver.snapshot(), ComboSnapshot::default());
    }

    #[test]
    fn stop_returns_final_state() {
        let (driver, _clock) = manual_driver();
        driver.note_hit();
        let last = driver.stop();
        assert_eq!(last.score, 10);
        assert_eq!(last.peak_score, 10);
    }

    #[test]
    fn timer_thread_decays_and_stops_on_drop() {
        let clock = ManualClock::new(0);
        let driver = ComboDriver::spawn(Arc::new(clock), Some(Duration::from_millis(5)));
        driver.note_hit();
        let mut drained = false;
        for _ in 0..400 {
            thread::sleep(Duration::from_millis(5));
            if driver.snapshot().score == 0 {
                drained = true;
                break;
            }
        }
        assert!(drained, "timer ticks should drain a single hit's energy");
        drop(driver);
    }
}

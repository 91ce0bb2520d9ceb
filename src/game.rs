use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::error::{GameError, PollError};
use crate::logger::{ResultRecord, SessionLogger};
use crate::poller::{CompletedRound, GameEvent, PollerHandle};
use crate::runtime::AppEvent;
use crate::serial::FrameSource;
use crate::session::Session;
use crate::tier::Tier;
use crate::timer::Stopwatch;
use crate::words::WordPicker;

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Playing,
    Mismatch,
    Completed { duration: Duration, tier: Tier },
    /// The glove source was lost and no round can start
    NoInput,
}

impl Status {
    pub fn message(&self) -> String {
        match self {
            Status::Idle => "Press Start to Play!".to_string(),
            Status::Playing => "Type the word using your glove keys!".to_string(),
            Status::Mismatch => "Incorrect word. Try again!".to_string(),
            Status::Completed { duration, tier } => format!(
                "Correct! Time: {:.2} sec\n{}",
                duration.as_secs_f64(),
                tier.level_label()
            ),
            Status::NoInput => "Glove input is gone. Restart to reconnect.".to_string(),
        }
    }
}

/// The round currently on screen and the plumbing that feeds it
pub struct Game {
    picker: WordPicker,
    logger: SessionLogger,
    events: Sender<AppEvent>,
    source: Option<Box<dyn FrameSource>>,
    poller: Option<PollerHandle>,
    round: u64,
    pub word: Option<String>,
    pub typed: String,
    pub stopwatch: Stopwatch,
    pub status: Status,
    pub last_result: Option<ResultRecord>,
    pub save_error: Option<String>,
    pub poll_error: Option<PollError>,
}

impl Game {
    pub fn new(
        source: Box<dyn FrameSource>,
        events: Sender<AppEvent>,
        picker: WordPicker,
        logger: SessionLogger,
    ) -> Self {
        Self {
            picker,
            logger,
            events,
            source: Some(source),
            poller: None,
            round: 0,
            word: None,
            typed: String::new(),
            stopwatch: Stopwatch::Idle,
            status: Status::Idle,
            last_result: None,
            save_error: None,
            poll_error: None,
        }
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn is_playing(&self) -> bool {
        self.poller.is_some() && self.stopwatch.is_running()
    }

    /// Stop the current poller, if any, and take its source back.
    fn reclaim_source(&mut self) {
        if let Some(poller) = self.poller.take() {
            match poller.stop() {
                Some(source) => self.source = Some(source),
                None => tracing::error!(round = self.round, "poller thread panicked"),
            }
        }
    }

    /// The start trigger: pick a word and hand a fresh session to a new poller.
    pub fn start(&mut self) -> Result<(), GameError> {
        self.reclaim_source();

        let Some(source) = self.source.take() else {
            self.status = Status::NoInput;
            return Ok(());
        };

        let word = self.picker.pick();
        let session = match Session::start(&word) {
            Ok(session) => session,
            Err(e) => {
                self.source = Some(source);
                return Err(e);
            }
        };

        self.round += 1;
        tracing::info!(round = self.round, word = %word, "round started");

        self.stopwatch = Stopwatch::start_at(session.started());
        self.word = Some(word);
        self.typed.clear();
        self.status = Status::Playing;
        self.save_error = None;
        self.poll_error = None;
        self.poller = Some(PollerHandle::spawn(
            self.round,
            source,
            session,
            self.events.clone(),
        ));
        Ok(())
    }

    pub fn on_game_event(&mut self, round: u64, event: GameEvent) {
        if round != self.round {
            match event {
                // finished before the restart was handled; still goes to the logs
                GameEvent::Completed(completed) => {
                    tracing::info!(
                        round,
                        current = self.round,
                        "saving a round finished before restart"
                    );
                    self.save(&completed.result(), &completed);
                }
                _ => tracing::debug!(round, current = self.round, "dropping event from an old round"),
            }
            return;
        }

        match event {
            GameEvent::Typed(typed) => {
                self.typed = typed;
                self.status = Status::Playing;
            }
            GameEvent::Mismatch => {
                self.typed.clear();
                self.status = Status::Mismatch;
            }
            GameEvent::Completed(round) => self.complete(*round),
            GameEvent::Error(e) => self.poll_error = Some(e),
        }
    }

    fn complete(&mut self, round: CompletedRound) {
        if let Some(poller) = self.poller.take() {
            match poller.join() {
                Some(source) => self.source = Some(source),
                None => tracing::error!(round = self.round, "poller thread panicked"),
            }
        }

        self.stopwatch.freeze(round.duration);
        self.typed = round.session.typed();

        let result = round.result();
        tracing::info!(
            word = %result.word,
            duration_secs = round.duration.as_secs_f64(),
            tier = %result.tier,
            "round completed"
        );

        self.save(&result, &round);

        self.status = Status::Completed {
            duration: round.duration,
            tier: result.tier,
        };
        self.last_result = Some(result);
    }

    fn save(&mut self, result: &ResultRecord, round: &CompletedRound) {
        if let Err(e) = self.logger.persist(result, &round.telemetry) {
            tracing::error!(error = %e, "could not save round logs");
            self.save_error = Some(format!("Could not save results: {}", e));
        }
    }

    /// Stop polling for good, e.g. on quit.
    pub fn shutdown(&mut self) {
        self.reclaim_source();
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.shutdown();
    }
}

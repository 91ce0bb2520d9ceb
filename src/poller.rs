//! Background polling of the glove
//!
//! The poll thread owns the running [`Session`] and the round's telemetry.
//! The UI never touches either while a round is live; it only sees
//! [`GameEvent`]s, and gets the session back inside [`CompletedRound`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::decoder::{Decoder, Symbol};
use crate::error::PollError;
use crate::logger::{ResultRecord, TelemetryRecord};
use crate::runtime::AppEvent;
use crate::serial::FrameSource;
use crate::session::{Applied, Session};

const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Everything the UI needs once a word was typed correctly
#[derive(Debug, Clone)]
pub struct CompletedRound {
    pub session: Session,
    pub duration: Duration,
    pub telemetry: Vec<TelemetryRecord>,
}

impl CompletedRound {
    pub fn result(&self) -> ResultRecord {
        ResultRecord::from_session(&self.session, self.duration)
    }
}

#[derive(Debug, Clone)]
pub enum GameEvent {
    /// Typed buffer after a keypad symbol changed it
    Typed(String),
    Mismatch,
    Completed(Box<CompletedRound>),
    Error(PollError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Finished,
    Disconnected,
}

/// Decode state for one round, driven frame by frame
struct PollLoop {
    round: u64,
    decoder: Decoder,
    session: Session,
    telemetry: Vec<TelemetryRecord>,
    events: Sender<AppEvent>,
    last_error: Option<PollError>,
}

impl PollLoop {
    fn emit(&self, event: GameEvent) -> Flow {
        let round = self.round;
        match self.events.send(AppEvent::Game { round, event }) {
            Ok(()) => Flow::Continue,
            Err(_) => Flow::Disconnected,
        }
    }

    fn report(&mut self, error: PollError) -> Flow {
        if self.last_error.as_ref() == Some(&error) {
            return Flow::Continue;
        }
        match &error {
            PollError::Io(msg) => tracing::warn!(error = %msg, "glove read failed"),
            PollError::Decode(msg) => tracing::debug!(error = %msg, "dropping undecodable bytes"),
        }
        self.last_error = Some(error.clone());
        self.emit(GameEvent::Error(error))
    }

    fn handle_frame(&mut self, frame: &[u8]) -> Flow {
        let line = match std::str::from_utf8(frame) {
            Ok(line) => line.to_string(),
            Err(e) => {
                if self.report(PollError::Decode(e.to_string())) == Flow::Disconnected {
                    return Flow::Disconnected;
                }
                String::from_utf8_lossy(frame)
                    .chars()
                    .filter(|c| *c != char::REPLACEMENT_CHARACTER)
                    .collect()
            }
        };

        let symbols: Vec<Symbol> = self.decoder.decode_line(&line).collect();
        for symbol in symbols {
            if let Symbol::Telemetry(value) = symbol {
                self.telemetry.push(TelemetryRecord::new(value));
                continue;
            }

            let flow = match self.session.apply(&symbol) {
                Applied::Typed => self.emit(GameEvent::Typed(self.session.typed())),
                Applied::Ignored => Flow::Continue,
                Applied::Mismatch => {
                    tracing::debug!(word = self.session.word(), "wrong word entered");
                    self.emit(GameEvent::Mismatch)
                }
                Applied::Completed(duration) => {
                    let round = CompletedRound {
                        session: self.session.clone(),
                        duration,
                        telemetry: std::mem::take(&mut self.telemetry),
                    };
                    self.emit(GameEvent::Completed(Box::new(round)));
                    return Flow::Finished;
                }
            };
            if flow != Flow::Continue {
                return flow;
            }
        }
        Flow::Continue
    }

    fn run(
        mut self,
        mut source: Box<dyn FrameSource>,
        stop: Arc<AtomicBool>,
    ) -> Box<dyn FrameSource> {
        tracing::debug!(word = self.session.word(), "poller started");

        while !stop.load(Ordering::Acquire) {
            let flow = match source.next_frame() {
                Ok(None) => {
                    self.last_error = None;
                    Flow::Continue
                }
                Ok(Some(frame)) => {
                    self.last_error = None;
                    self.handle_frame(&frame)
                }
                Err(e) => {
                    let flow = self.report(PollError::from(e));
                    thread::sleep(ERROR_BACKOFF);
                    flow
                }
            };

            if flow != Flow::Continue {
                break;
            }
        }

        tracing::debug!(word = self.session.word(), "poller stopped");
        source
    }
}

/// A running poll thread for one round
pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<Box<dyn FrameSource>>,
}

impl PollerHandle {
    /// Start polling for round `round`; every event it sends is tagged with it.
    pub fn spawn(
        round: u64,
        source: Box<dyn FrameSource>,
        session: Session,
        events: Sender<AppEvent>,
    ) -> Self {
        Self::spawn_with_decoder(round, source, session, events, Decoder::new())
    }

    pub fn spawn_with_decoder(
        round: u64,
        source: Box<dyn FrameSource>,
        session: Session,
        events: Sender<AppEvent>,
        decoder: Decoder,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let poll = PollLoop {
            round,
            decoder,
            session,
            telemetry: Vec::new(),
            events,
            last_error: None,
        };

        let thread_stop = Arc::clone(&stop);
        let thread = thread::spawn(move || poll.run(source, thread_stop));

        Self { stop, thread }
    }

    /// Ask the thread to stop and wait for it. Waits at most one read timeout.
    /// Gives back the frame source for the next round.
    pub fn stop(self) -> Option<Box<dyn FrameSource>> {
        self.stop.store(true, Ordering::Release);
        self.join()
    }

    /// Wait for a thread that is finishing on its own (after completion).
    pub fn join(self) -> Option<Box<dyn FrameSource>> {
        self.thread.join().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::ChannelSource;
    use assert_matches::assert_matches;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::mpsc::{self, Receiver};

    fn poll_loop(word: &str) -> (PollLoop, Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let poll = PollLoop {
            round: 7,
            decoder: Decoder::new(),
            session: Session::start(word).unwrap(),
            telemetry: Vec::new(),
            events: tx,
            last_error: None,
        };
        (poll, rx)
    }

    fn game_events(rx: &Receiver<AppEvent>) -> Vec<GameEvent> {
        rx.try_iter()
            .filter_map(|e| match e {
                AppEvent::Game { round, event } => {
                    assert_eq!(round, 7);
                    Some(event)
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_frame_types_letters_and_reports_buffer() {
        let (mut poll, rx) = poll_loop("TAR");
        assert_eq!(poll.handle_frame(b"A,C"), Flow::Continue);

        let typed: Vec<String> = game_events(&rx)
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::Typed(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(typed, vec!["T".to_string(), "TA".to_string()]);
    }

    #[test]
    fn test_telemetry_is_buffered_not_typed() {
        let (mut poll, rx) = poll_loop("TAR");
        poll.handle_frame(b"F1,12.3,X,0.5");
        assert_eq!(poll.telemetry.len(), 2);
        assert_eq!(poll.session.typed(), "");
        assert!(game_events(&rx).is_empty());
    }

    #[test]
    fn test_completion_hands_back_session_and_telemetry() {
        let (mut poll, rx) = poll_loop("TAR");
        assert_eq!(poll.handle_frame(b"F2,A,C,Y"), Flow::Continue);
        assert_eq!(poll.handle_frame(b"B,I,A"), Flow::Finished);

        let events = game_events(&rx);
        let round = events
            .iter()
            .find_map(|e| match e {
                GameEvent::Completed(round) => Some(round.clone()),
                _ => None,
            })
            .expect("completed event");
        assert_eq!(round.session.typed(), "TAR");
        assert!(!round.session.is_running());
        let values: Vec<&str> = round.telemetry.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["F2", "Y"]);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::Completed(_)))
                .count(),
            1
        );
    }

    #[test]
    fn test_mismatch_event() {
        let (mut poll, rx) = poll_loop("TAR");
        poll.handle_frame(b"B,C,A,I");
        assert_matches!(game_events(&rx).last(), Some(GameEvent::Mismatch));
        assert!(poll.session.is_running());
        assert_eq!(poll.session.typed(), "");
    }

    #[test]
    fn test_invalid_utf8_is_reported_and_rest_decoded() {
        let (mut poll, rx) = poll_loop("TAR");
        poll.handle_frame(b"A,\xff\xfe,C");
        let events = game_events(&rx);
        assert_matches!(events.first(), Some(GameEvent::Error(PollError::Decode(_))));
        assert_eq!(poll.session.typed(), "TA");
    }

    #[test]
    fn test_repeated_errors_are_reported_once() {
        let (mut poll, rx) = poll_loop("TAR");
        poll.report(PollError::Io("unplugged".into()));
        poll.report(PollError::Io("unplugged".into()));
        assert_eq!(game_events(&rx).len(), 1);
    }

    /// Plays back a fixed list of reads, then raises the stop flag
    struct Reads {
        reads: VecDeque<io::Result<Option<Vec<u8>>>>,
        stop: Arc<AtomicBool>,
    }

    impl FrameSource for Reads {
        fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
            self.reads.pop_front().unwrap_or_else(|| {
                self.stop.store(true, Ordering::Release);
                Ok(None)
            })
        }
    }

    #[test]
    fn test_error_after_quiet_gap_is_reported_again() {
        let (poll, rx) = poll_loop("TAR");
        let stop = Arc::new(AtomicBool::new(false));
        let unplugged = || Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
        let source = Reads {
            reads: VecDeque::from(vec![unplugged(), unplugged(), Ok(None), unplugged()]),
            stop: Arc::clone(&stop),
        };

        poll.run(Box::new(source), stop);

        let errors = game_events(&rx)
            .into_iter()
            .filter(|e| matches!(e, GameEvent::Error(PollError::Io(_))))
            .count();
        assert_eq!(errors, 2);
    }

    #[test]
    fn test_dropped_receiver_stops_the_loop() {
        let (mut poll, rx) = poll_loop("TAR");
        drop(rx);
        assert_eq!(poll.handle_frame(b"A"), Flow::Disconnected);
    }

    #[test]
    fn test_stop_returns_source() {
        let (_frames_tx, frames_rx) = mpsc::channel();
        let source = ChannelSource::new(frames_rx, Duration::from_millis(5));
        let (tx, _rx) = mpsc::channel();

        let handle = PollerHandle::spawn(1, Box::new(source), Session::start("TAR").unwrap(), tx);
        assert!(handle.stop().is_some());
    }
}

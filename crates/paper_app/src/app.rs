use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use paper_core::{update, JobId, Msg, Phase, SectionKey, TrackerConfig, TrackerState};
use paper_logging::{paper_info, paper_warn};

use crate::effects::EffectRunner;
use crate::render::render;

const TICK: Duration = Duration::from_millis(75);

/// Line-oriented user commands read from stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Msg(Msg),
    /// Resume polling after a sync halt.
    Retry,
    Quit,
    /// stdin reached end of file.
    Closed,
}

/// How a tracking session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Quit,
    Failed,
    /// Not found or contract violation.
    Rejected,
    /// Sync halted and nobody is left to ask for a retry.
    Halted,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Completed | Outcome::Quit => 0,
            Outcome::Failed => 1,
            Outcome::Rejected => 2,
            Outcome::Halted => 3,
        }
    }
}

pub fn parse_command(line: &str) -> Option<Input> {
    let line = line.trim();
    match line {
        "a" | "A" => Some(Input::Msg(Msg::ExpandAll)),
        "c" | "C" => Some(Input::Msg(Msg::CollapseAll)),
        "r" | "R" => Some(Input::Retry),
        "q" | "Q" => Some(Input::Quit),
        _ => line
            .parse::<usize>()
            .ok()
            .and_then(SectionKey::from_ordinal)
            .map(|key| Input::Msg(Msg::SectionToggled(key))),
    }
}

pub fn spawn_stdin_reader(tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(input) => {
                    if tx.send(input).is_err() {
                        return;
                    }
                }
                None if line.trim().is_empty() => {}
                None => paper_warn!("unknown command {:?}", line),
            }
        }
        let _ = tx.send(Input::Closed);
    });
}

pub struct TrackerApp<W: Write> {
    state: TrackerState,
    runner: EffectRunner,
    out: W,
    synced_at: Option<DateTime<Local>>,
    clear_screen: bool,
}

impl TrackerApp<io::Stdout> {
    pub fn with_stdout(config: TrackerConfig, runner: EffectRunner) -> Self {
        let out = io::stdout();
        let clear_screen = out.is_terminal();
        Self::new(config, runner, out, clear_screen)
    }
}

impl<W: Write> TrackerApp<W> {
    pub fn new(config: TrackerConfig, runner: EffectRunner, out: W, clear_screen: bool) -> Self {
        Self {
            state: TrackerState::with_config(config),
            runner,
            out,
            synced_at: None,
            clear_screen,
        }
    }

    /// Tracks `job_id` until it settles or the user quits.
    pub fn run(&mut self, job_id: JobId, inputs: mpsc::Receiver<Input>) -> io::Result<Outcome> {
        paper_info!(job: job_id; "tracking");
        self.dispatch(Msg::TrackJob {
            job_id,
            initial: None,
        });
        let mut input_open = true;

        let outcome = loop {
            for msg in self.runner.pending_msgs() {
                self.dispatch(msg);
            }
            self.flush_render()?;

            if let Some(outcome) = settled(&self.state, input_open) {
                break outcome;
            }

            if !input_open {
                thread::sleep(TICK);
                continue;
            }
            match inputs.recv_timeout(TICK) {
                Ok(Input::Msg(msg)) => self.dispatch(msg),
                Ok(Input::Retry) => {
                    if let Some(job_id) = self.state.job_id().cloned() {
                        self.dispatch(Msg::TrackJob {
                            job_id,
                            initial: None,
                        });
                    }
                }
                Ok(Input::Quit) => break Outcome::Quit,
                Ok(Input::Closed) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                    input_open = false;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => self.dispatch(Msg::Tick),
            }
        };

        self.dispatch(Msg::StopTracking);
        self.runner.shutdown();
        paper_info!("tracking finished: {:?}", outcome);
        Ok(outcome)
    }

    fn dispatch(&mut self, msg: Msg) {
        if let Msg::SnapshotFetched { generation, .. } = &msg {
            if *generation == self.state.generation() {
                self.synced_at = Some(Local::now());
            }
        }
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
    }

    fn flush_render(&mut self) -> io::Result<()> {
        if !self.state.consume_dirty() {
            return Ok(());
        }
        let text = render(&self.state.view(), self.synced_at);
        if self.clear_screen {
            write!(self.out, "\x1b[2J\x1b[H")?;
        } else {
            writeln!(self.out, "----")?;
        }
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}

/// A session is over once it can no longer change, or once it is completed
/// and no more input can arrive.
fn settled(state: &TrackerState, input_open: bool) -> Option<Outcome> {
    match state.phase()? {
        Phase::JobFailed => Some(Outcome::Failed),
        Phase::NotFound | Phase::ContractViolation(_) => Some(Outcome::Rejected),
        Phase::Completed if !input_open => Some(Outcome::Completed),
        Phase::Completed => None,
        Phase::AwaitingSnapshot | Phase::Active(_) => {
            let halted = !state.is_polling()
                && state
                    .view()
                    .sync_banner
                    .is_some_and(|banner| banner.halted);
            (halted && !input_open).then_some(Outcome::Halted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_core::{AnalysisResult, JobSnapshot, JobStatus};
    use pretty_assertions::assert_eq;

    fn tracked(status: Option<JobStatus>) -> TrackerState {
        let job_id = JobId::from("42");
        let initial = status.map(|status| JobSnapshot {
            job_id: job_id.clone(),
            source_name: "a.pdf".into(),
            status,
            result: (status == JobStatus::Completed).then(|| {
                AnalysisResult::new(
                    "T",
                    SectionKey::ALL.iter().map(|key| (*key, "body".to_string())),
                )
                .unwrap()
            }),
        });
        let (state, _) = update(TrackerState::new(), Msg::TrackJob { job_id, initial });
        state
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_command(" 3 "),
            Some(Input::Msg(Msg::SectionToggled(SectionKey::Methods)))
        );
        assert_eq!(parse_command("a"), Some(Input::Msg(Msg::ExpandAll)));
        assert_eq!(parse_command("C"), Some(Input::Msg(Msg::CollapseAll)));
        assert_eq!(parse_command("q"), Some(Input::Quit));
        assert_eq!(parse_command("r"), Some(Input::Retry));
        assert_eq!(parse_command("0"), None);
        assert_eq!(parse_command("7"), None);
        assert_eq!(parse_command("expand"), None);
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Completed.exit_code(), 0);
        assert_eq!(Outcome::Quit.exit_code(), 0);
        assert_eq!(Outcome::Failed.exit_code(), 1);
        assert_eq!(Outcome::Rejected.exit_code(), 2);
        assert_eq!(Outcome::Halted.exit_code(), 3);
    }

    #[test]
    fn failed_job_settles_immediately() {
        assert_eq!(
            settled(&tracked(Some(JobStatus::Failed)), true),
            Some(Outcome::Failed)
        );
    }

    #[test]
    fn completed_job_waits_for_input_to_close() {
        let state = tracked(Some(JobStatus::Completed));
        assert_eq!(settled(&state, true), None);
        assert_eq!(settled(&state, false), Some(Outcome::Completed));
    }

    #[test]
    fn active_job_never_settles() {
        assert_eq!(settled(&tracked(Some(JobStatus::Processing)), false), None);
        assert_eq!(settled(&tracked(None), false), None);
    }
}

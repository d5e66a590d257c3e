//! Stack-based phase timer used while handling one request.

use std::time::Instant;

use shared::{PhaseTiming, TimingBreakdown};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimingError {
    #[error("snapshot taken with open phase(s): {}", open.join(" > "))]
    UnclosedPhase { open: Vec<String> },
    #[error("stop({0:?}) without a matching start")]
    StopWithoutStart(String),
    #[error("stop({got:?}) while {open:?} is the innermost open phase")]
    InterleavedStop { open: String, got: String },
}

struct OpenPhase {
    name: String,
    started: Instant,
    children: Vec<PhaseTiming>,
}

/// Records named, nested phase durations for a single request.
///
/// Phases nest but never interleave: a child must stop before its parent.
/// A phase that reuses the name of an already recorded sibling replaces that
/// sibling's measurement in place.
pub struct TimingAccumulator {
    created: Instant,
    open: Vec<OpenPhase>,
    closed: Vec<PhaseTiming>,
}

impl Default for TimingAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingAccumulator {
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            open: Vec::new(),
            closed: Vec::new(),
        }
    }

    pub fn start(&mut self, label: &str) {
        self.open.push(OpenPhase {
            name: label.to_string(),
            started: Instant::now(),
            children: Vec::new(),
        });
    }

    /// Closes the innermost phase, which must be `label`. Returns its duration in ms.
    pub fn stop(&mut self, label: &str) -> Result<f64, TimingError> {
        let Some(top) = self.open.last().map(|p| p.name.clone()) else {
            return Err(TimingError::StopWithoutStart(label.to_string()));
        };
        if top != label {
            return if self.open.iter().any(|p| p.name == label) {
                Err(TimingError::InterleavedStop {
                    open: top,
                    got: label.to_string(),
                })
            } else {
                Err(TimingError::StopWithoutStart(label.to_string()))
            };
        }
        Ok(self.close_innermost())
    }

    /// Runs `f` inside phase `label`. The phase is closed however `f` returns,
    /// so an `Err` coming out of `f` still leaves the timer balanced.
    pub fn time<T>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.start(label);
        let depth = self.open.len();
        let out = f(self);
        while self.open.len() > depth {
            log::warn!(
                "phase {:?} left open inside {:?}; closing it",
                self.open.last().map(|p| p.name.as_str()).unwrap_or_default(),
                label
            );
            self.close_innermost();
        }
        if self.open.len() == depth {
            self.close_innermost();
        }
        out
    }

    pub fn is_idle(&self) -> bool {
        self.open.is_empty()
    }

    /// The recorded tree plus elapsed time since the accumulator was created.
    pub fn snapshot(&self) -> Result<TimingBreakdown, TimingError> {
        if !self.open.is_empty() {
            return Err(TimingError::UnclosedPhase {
                open: self.open.iter().map(|p| p.name.clone()).collect(),
            });
        }
        Ok(TimingBreakdown::new(
            elapsed_ms(self.created),
            self.closed.clone(),
        ))
    }

    fn close_innermost(&mut self) -> f64 {
        let Some(phase) = self.open.pop() else {
            return 0.0;
        };
        let duration_ms = elapsed_ms(phase.started);
        let timing = PhaseTiming::with_children(phase.name, duration_ms, phase.children);
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.closed,
        };
        match siblings.iter_mut().find(|p| p.name == timing.name) {
            Some(existing) => {
                log::warn!(
                    "phase {:?} recorded twice; replacing {:.3} ms with {:.3} ms",
                    timing.name,
                    existing.duration_ms,
                    timing.duration_ms
                );
                *existing = timing;
            }
            None => siblings.push(timing),
        }
        duration_ms
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

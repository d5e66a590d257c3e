//! Repeated sequential invocations for latency measurement.

use std::time::Duration;

use log::{debug, error};
use shared::{DetectionBody, DetectionRequest, TimingBreakdown};
use tokio::time::Instant;

use crate::aggregate::{AggregateError, AggregateReport, aggregate};
use crate::error::ClientError;
use crate::invoke::Invoker;
use crate::overhead::Overhead;
use crate::transport::Transport;

pub const DEFAULT_RUNS: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRecord {
    /// 1-based position in the run.
    pub run: usize,
    pub round_trip_ms: f64,
    pub overhead: Overhead,
    pub server: TimingBreakdown,
    /// Always the first run of a measurement, whatever its latency.
    pub is_cold_start: bool,
}

pub enum Progress<'a> {
    Completed {
        planned: usize,
        record: &'a InvocationRecord,
    },
    Failed {
        run: usize,
        planned: usize,
        error: &'a ClientError,
    },
}

#[derive(Debug)]
pub struct RunFailure {
    pub run: usize,
    pub error: ClientError,
}

#[derive(Debug)]
pub struct MeasurementOutcome {
    pub planned_runs: usize,
    pub records: Vec<InvocationRecord>,
    /// Set when a failed invocation aborted the remaining runs.
    pub failure: Option<RunFailure>,
    /// Wall clock for the whole run, including client-side work between requests.
    pub elapsed: Duration,
    /// Body of the last successful invocation.
    pub last_body: Option<DetectionBody>,
}

impl MeasurementOutcome {
    pub fn is_partial(&self) -> bool {
        self.failure.is_some()
    }

    /// Aggregates the non-cold records. A partial run is flagged as such.
    pub fn report(&self) -> Result<AggregateReport, AggregateError> {
        let mut report = aggregate(&self.records)?;
        report.partial = self.is_partial();
        Ok(report)
    }
}

/// Performs `runs` invocations one after another, stopping at the first failure.
pub async fn run_measurements<T: Transport>(
    invoker: &Invoker<T>,
    request: &DetectionRequest,
    runs: usize,
    mut on_progress: impl FnMut(Progress<'_>),
) -> MeasurementOutcome {
    let started = Instant::now();
    let mut records = Vec::with_capacity(runs);
    let mut failure = None;
    let mut last_body = None;

    for run in 1..=runs {
        match invoker.invoke(request).await {
            Ok(outcome) => {
                let record = InvocationRecord {
                    run,
                    round_trip_ms: outcome.round_trip_ms,
                    overhead: outcome.overhead,
                    server: outcome.body.timings.clone(),
                    is_cold_start: run == 1,
                };
                debug!(
                    "run {}/{}: {:.2} ms round trip",
                    run, runs, record.round_trip_ms
                );
                on_progress(Progress::Completed {
                    planned: runs,
                    record: &record,
                });
                records.push(record);
                last_body = Some(outcome.body);
            }
            Err(error) => {
                error!("run {}/{} failed, aborting: {}", run, runs, error);
                on_progress(Progress::Failed {
                    run,
                    planned: runs,
                    error: &error,
                });
                failure = Some(RunFailure { run, error });
                break;
            }
        }
    }

    MeasurementOutcome {
        planned_runs: runs,
        records,
        failure,
        elapsed: started.elapsed(),
        last_body,
    }
}

//! Plain-text rendering of invocation and measurement results.

use std::io::{self, Write};
use std::time::Duration;

use shared::{DetectionResult, DetectionSummary, TimingBreakdown};

use crate::aggregate::{AggregateError, AggregateReport};
use crate::error::ClientError;
use crate::invoke::InvocationOutcome;
use crate::measure::{MeasurementOutcome, Progress};
use crate::overhead::Overhead;

const LABEL_WIDTH: usize = 28;

/// One line per phase, children indented one level under their parent.
pub fn render_breakdown(out: &mut impl Write, breakdown: &TimingBreakdown) -> io::Result<()> {
    let mut result = Ok(());
    breakdown.walk(|depth, phase| {
        if result.is_ok() {
            result = timing_line(out, depth + 1, &phase.name, phase.duration_ms);
        }
    });
    result
}

fn timing_line(out: &mut impl Write, depth: usize, label: &str, ms: f64) -> io::Result<()> {
    let indent = depth * 2;
    let width = LABEL_WIDTH.saturating_sub(indent);
    writeln!(out, "{:indent$}{:<width$} {:>10.2} ms", "", label, ms)
}

pub fn render_detections(out: &mut impl Write, detections: &[DetectionResult]) -> io::Result<()> {
    writeln!(out, "Detections:")?;
    if detections.is_empty() {
        return writeln!(out, "  (none)");
    }
    for (i, d) in detections.iter().enumerate() {
        writeln!(
            out,
            "  {:>3}. {:<16} confidence {:.3}  bbox [{:.1}, {:.1}, {:.1}, {:.1}]",
            i + 1,
            d.class_name,
            d.confidence,
            d.bbox[0],
            d.bbox[1],
            d.bbox[2],
            d.bbox[3]
        )?;
    }
    Ok(())
}

pub fn render_summary(out: &mut impl Write, summary: &DetectionSummary) -> io::Result<()> {
    writeln!(out, "Summary:")?;
    writeln!(out, "  total detections: {}", summary.total_detections)?;
    if summary.classes_detected.is_empty() {
        writeln!(out, "  classes: (none)")
    } else {
        writeln!(out, "  classes: {}", summary.classes_detected.join(", "))
    }
}

fn overhead_line(out: &mut impl Write, overhead: &Overhead) -> io::Result<()> {
    timing_line(out, 1, "other overhead", overhead.ms)?;
    if overhead.clamped() {
        writeln!(
            out,
            "    (raw remainder {:.2} ms is negative, likely clock skew; reported as 0)",
            overhead.raw_ms
        )?;
    }
    Ok(())
}

pub fn render_invocation(out: &mut impl Write, outcome: &InvocationOutcome) -> io::Result<()> {
    let timings = &outcome.body.timings;
    writeln!(out, "Server-side timings:")?;
    render_breakdown(out, timings)?;
    timing_line(out, 1, "measured total", timings.measured_total_ms())?;
    timing_line(out, 1, "handler total", timings.total_ms)?;
    writeln!(out)?;
    writeln!(out, "Client-side:")?;
    timing_line(out, 1, "round trip", outcome.round_trip_ms)?;
    overhead_line(out, &outcome.overhead)?;
    writeln!(out)?;
    render_detections(out, &outcome.body.detections)?;
    writeln!(out)?;
    render_summary(out, &outcome.body.summary)
}

/// Prints the function's `type` tag and message for a failed request.
pub fn render_failure(out: &mut impl Write, error: &ClientError) -> io::Result<()> {
    writeln!(out, "Error type: {}", error.kind())?;
    writeln!(out, "Error: {}", error.message())
}

pub fn render_progress(out: &mut impl Write, progress: &Progress<'_>) -> io::Result<()> {
    match progress {
        Progress::Completed { planned, record } => {
            let width = planned.to_string().len();
            write!(
                out,
                "[{:>width$}/{}] round trip {:>9.2} ms  server {:>9.2} ms",
                record.run, planned, record.round_trip_ms, record.server.total_ms
            )?;
            if record.is_cold_start {
                write!(out, "  (cold start, excluded)")?;
            }
            writeln!(out)
        }
        Progress::Failed {
            run,
            planned,
            error,
        } => writeln!(
            out,
            "[{}/{}] failed ({}): {}",
            run,
            planned,
            error.kind(),
            error.message()
        ),
    }
}

/// Best-effort progress output: a failed write is logged and the run goes on.
/// Returns whether the line was written.
pub fn emit_progress(out: &mut impl Write, progress: &Progress<'_>) -> bool {
    match render_progress(out, progress).and_then(|_| out.flush()) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("failed to print progress: {}", e);
            false
        }
    }
}

pub fn render_aggregate(
    out: &mut impl Write,
    report: &AggregateReport,
    elapsed: Duration,
) -> io::Result<()> {
    if report.partial {
        writeln!(out, "PARTIAL RESULTS: the run was aborted early")?;
    }
    writeln!(
        out,
        "Averages over {} warm sample(s), cold start excluded:",
        report.sample_count
    )?;
    render_breakdown(out, &report.breakdown)?;
    timing_line(out, 1, "measured total", report.breakdown.measured_total_ms())?;
    timing_line(out, 1, "handler total", report.breakdown.total_ms)?;
    timing_line(out, 1, "round trip", report.round_trip_ms)?;
    timing_line(out, 1, "other overhead", report.overhead_ms)?;
    if report.clamped_samples > 0 {
        writeln!(
            out,
            "    ({} sample(s) had a negative remainder, counted as 0)",
            report.clamped_samples
        )?;
    }
    if let Some(cold) = report.cold_start_ms {
        timing_line(out, 1, "cold start round trip", cold)?;
    }
    writeln!(out)?;
    writeln!(out, "Total elapsed: {:.2} s", elapsed.as_secs_f64())
}

/// Final report of a measurement run. Returns `false` when the run aborted
/// or its samples could not be aggregated.
pub fn render_measurement(out: &mut impl Write, outcome: &MeasurementOutcome) -> io::Result<bool> {
    let usable = match outcome.report() {
        Ok(aggregate) => {
            render_aggregate(out, &aggregate, outcome.elapsed)?;
            true
        }
        Err(AggregateError::NoSamples) => {
            writeln!(out, "No warm samples completed; nothing to average.")?;
            writeln!(out, "Total elapsed: {:.2} s", outcome.elapsed.as_secs_f64())?;
            true
        }
        Err(e @ AggregateError::InconsistentSampleShape { .. }) => {
            writeln!(out, "Results are unusable: {}", e)?;
            false
        }
    };

    if let Some(failure) = &outcome.failure {
        writeln!(out)?;
        writeln!(
            out,
            "Aborted at run {} of {}:",
            failure.run, outcome.planned_runs
        )?;
        render_failure(out, &failure.error)?;
        return Ok(false);
    }
    Ok(usable)
}

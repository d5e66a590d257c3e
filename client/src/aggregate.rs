//! Per-phase means over the warm samples of a measurement run.

use shared::{PhaseTiming, TimingBreakdown};

use crate::measure::InvocationRecord;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    #[error("no warm samples to aggregate")]
    NoSamples,
    #[error("run {run} has a different timing tree shape at {path}")]
    InconsistentSampleShape { run: usize, path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    /// Number of warm samples averaged.
    pub sample_count: usize,
    pub cold_start_ms: Option<f64>,
    pub round_trip_ms: f64,
    /// Mean of the per-sample clamped overheads.
    pub overhead_ms: f64,
    pub clamped_samples: usize,
    /// Same shape as every sample, each duration replaced by its mean.
    pub breakdown: TimingBreakdown,
    pub partial: bool,
}

/// Averages every record except the cold start.
///
/// Every warm sample must have the same phase names in the same order at
/// every level.
pub fn aggregate(records: &[InvocationRecord]) -> Result<AggregateReport, AggregateError> {
    let samples: Vec<&InvocationRecord> = records.iter().filter(|r| !r.is_cold_start).collect();
    let Some(first) = samples.first() else {
        return Err(AggregateError::NoSamples);
    };

    for sample in &samples[1..] {
        check_shape(&first.server.phases, &sample.server.phases, "").map_err(|path| {
            AggregateError::InconsistentSampleShape {
                run: sample.run,
                path,
            }
        })?;
    }

    let trees: Vec<&[PhaseTiming]> = samples.iter().map(|s| s.server.phases.as_slice()).collect();
    let breakdown = TimingBreakdown::new(
        mean(samples.iter().map(|s| s.server.total_ms)),
        mean_phases(&trees),
    );

    Ok(AggregateReport {
        sample_count: samples.len(),
        cold_start_ms: records
            .iter()
            .find(|r| r.is_cold_start)
            .map(|r| r.round_trip_ms),
        round_trip_ms: mean(samples.iter().map(|s| s.round_trip_ms)),
        overhead_ms: mean(samples.iter().map(|s| s.overhead.ms)),
        clamped_samples: samples.iter().filter(|s| s.overhead.clamped()).count(),
        breakdown,
        partial: false,
    })
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    values.sum::<f64>() / n as f64
}

/// Returns the slash-separated path of the first mismatch.
fn check_shape(expected: &[PhaseTiming], actual: &[PhaseTiming], parent: &str) -> Result<(), String> {
    let join = |name: &str| {
        if parent.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", parent, name)
        }
    };

    for (i, want) in expected.iter().enumerate() {
        match actual.get(i) {
            Some(got) if got.name == want.name => {
                check_shape(&want.children, &got.children, &join(&want.name))?
            }
            _ => return Err(join(&want.name)),
        }
    }
    if let Some(extra) = actual.get(expected.len()) {
        return Err(join(&extra.name));
    }
    Ok(())
}

// Shapes are already checked, so index `i` exists in every tree.
fn mean_phases(trees: &[&[PhaseTiming]]) -> Vec<PhaseTiming> {
    let Some(first) = trees.first() else {
        return Vec::new();
    };
    first
        .iter()
        .enumerate()
        .map(|(i, phase)| {
            let children: Vec<&[PhaseTiming]> =
                trees.iter().map(|t| t[i].children.as_slice()).collect();
            PhaseTiming::with_children(
                phase.name.clone(),
                mean(trees.iter().map(|t| t[i].duration_ms)),
                mean_phases(&children),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overhead::other_overhead;

    fn tree(decode: f64, inference: f64, draw: f64) -> TimingBreakdown {
        TimingBreakdown::new(
            decode + inference + draw + 1.0,
            vec![
                PhaseTiming::leaf("base64_decode", decode),
                PhaseTiming::with_children(
                    "yolo_total",
                    inference + draw,
                    vec![
                        PhaseTiming::leaf("inference", inference),
                        PhaseTiming::leaf("draw_results", draw),
                    ],
                ),
            ],
        )
    }

    fn record(run: usize, round_trip_ms: f64, server: TimingBreakdown) -> InvocationRecord {
        InvocationRecord {
            run,
            round_trip_ms,
            overhead: other_overhead(round_trip_ms, server.total_ms),
            server,
            is_cold_start: run == 1,
        }
    }

    #[test]
    fn cold_start_is_excluded_even_when_fastest() {
        let records = vec![
            record(1, 10.0, tree(1.0, 1.0, 1.0)),
            record(2, 300.0, tree(4.0, 100.0, 20.0)),
            record(3, 500.0, tree(6.0, 200.0, 30.0)),
        ];
        let report = aggregate(&records).unwrap();

        assert_eq!(report.sample_count, 2);
        assert_eq!(report.cold_start_ms, Some(10.0));
        assert_eq!(report.round_trip_ms, 400.0);
        assert_eq!(report.breakdown.find(&["base64_decode"]).unwrap().duration_ms, 5.0);
        assert_eq!(
            report.breakdown.find(&["yolo_total", "inference"]).unwrap().duration_ms,
            150.0
        );
        assert_eq!(report.breakdown.find(&["yolo_total"]).unwrap().duration_ms, 175.0);
        assert_eq!(report.breakdown.total_ms, 181.0);
    }

    #[test]
    fn overhead_is_the_mean_of_clamped_samples() {
        let records = vec![
            record(1, 900.0, tree(1.0, 1.0, 1.0)),
            // Server total 131 > round trip 120: clamped to 0.
            record(2, 120.0, tree(10.0, 100.0, 20.0)),
            record(3, 231.0, tree(10.0, 100.0, 20.0)),
        ];
        let report = aggregate(&records).unwrap();
        assert_eq!(report.overhead_ms, 50.0);
        assert_eq!(report.clamped_samples, 1);
    }

    #[test]
    fn only_a_cold_start_is_not_enough() {
        let records = vec![record(1, 10.0, tree(1.0, 1.0, 1.0))];
        assert_eq!(aggregate(&records), Err(AggregateError::NoSamples));
        assert_eq!(aggregate(&[]), Err(AggregateError::NoSamples));
    }

    #[test]
    fn missing_nested_phase_is_an_inconsistent_shape() {
        let mut odd = tree(1.0, 2.0, 3.0);
        odd.phases[1].children.pop();
        let records = vec![
            record(1, 10.0, tree(1.0, 1.0, 1.0)),
            record(2, 20.0, tree(1.0, 2.0, 3.0)),
            record(3, 20.0, odd),
        ];
        assert_eq!(
            aggregate(&records),
            Err(AggregateError::InconsistentSampleShape {
                run: 3,
                path: "yolo_total/draw_results".into()
            })
        );
    }

    #[test]
    fn reordered_or_extra_phases_are_inconsistent() {
        let mut reordered = tree(1.0, 2.0, 3.0);
        reordered.phases.swap(0, 1);
        let records = vec![
            record(2, 20.0, tree(1.0, 2.0, 3.0)),
            record(3, 20.0, reordered),
        ];
        assert!(matches!(
            aggregate(&records),
            Err(AggregateError::InconsistentSampleShape { run: 3, .. })
        ));

        let mut extra = tree(1.0, 2.0, 3.0);
        extra.phases.push(PhaseTiming::leaf("build_summary", 0.1));
        let records = vec![
            record(2, 20.0, tree(1.0, 2.0, 3.0)),
            record(3, 20.0, extra),
        ];
        assert_eq!(
            aggregate(&records),
            Err(AggregateError::InconsistentSampleShape {
                run: 3,
                path: "build_summary".into()
            })
        );
    }
}

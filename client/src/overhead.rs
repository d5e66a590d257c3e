use log::warn;

/// Round-trip time not accounted for by the handler's own total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overhead {
    /// Reported value, never negative.
    pub ms: f64,
    /// Unclamped difference, kept so anomalies can be shown.
    pub raw_ms: f64,
}

impl Overhead {
    /// True when the handler claimed more time than the round trip took.
    pub fn clamped(&self) -> bool {
        self.ms != self.raw_ms
    }
}

pub fn other_overhead(round_trip_ms: f64, server_total_ms: f64) -> Overhead {
    let raw_ms = round_trip_ms - server_total_ms;
    if raw_ms.is_nan() || raw_ms < 0.0 {
        warn!(
            "server total {:.2} ms exceeds round trip {:.2} ms; reporting zero overhead",
            server_total_ms, round_trip_ms
        );
        return Overhead { ms: 0.0, raw_ms };
    }
    Overhead { ms: raw_ms, raw_ms }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overhead_is_the_remainder() {
        let o = other_overhead(250.0, 180.5);
        assert_eq!(o.ms, 69.5);
        assert!(!o.clamped());
    }

    #[test]
    fn negative_remainder_is_clamped_to_zero() {
        let o = other_overhead(100.0, 104.0);
        assert_eq!(o.ms, 0.0);
        assert_eq!(o.raw_ms, -4.0);
        assert!(o.clamped());
    }

    #[test]
    fn exact_match_is_zero_without_clamping() {
        let o = other_overhead(42.0, 42.0);
        assert_eq!(o.ms, 0.0);
        assert!(!o.clamped());
    }
}

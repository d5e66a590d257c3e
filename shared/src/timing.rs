//! Hierarchical phase timings reported by the detection function.
//!
//! On the wire a breakdown looks like
//!
//! ```json
//! {
//!   "total_ms": 152.4,
//!   "phases": {
//!     "base64_decode": 3.1,
//!     "yolo_total": {
//!       "duration_ms": 140.2,
//!       "phases": { "inference": 121.0, "draw_results": 17.9, "build_detection_list": 0.2 }
//!     },
//!     "base64_encode": 8.6,
//!     "build_summary": 0.01
//!   }
//! }
//! ```
//!
//! A phase without children is a bare number, a phase with children is an
//! object. Key order is recording order and survives a decode/encode cycle.

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTiming {
    pub name: String,
    pub duration_ms: f64,
    /// Sub-phases in recording order. They need not sum to `duration_ms`.
    pub children: Vec<PhaseTiming>,
}

impl PhaseTiming {
    pub fn leaf(name: impl Into<String>, duration_ms: f64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            children: Vec::new(),
        }
    }

    pub fn with_children(
        name: impl Into<String>,
        duration_ms: f64,
        children: Vec<PhaseTiming>,
    ) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&PhaseTiming> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Phase tree for one request plus the handler's own in-process total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub phases: Vec<PhaseTiming>,
}

impl TimingBreakdown {
    pub fn new(total_ms: f64, phases: Vec<PhaseTiming>) -> Self {
        Self { total_ms, phases }
    }

    /// Looks up a phase by its name path, e.g. `["yolo_total", "inference"]`.
    pub fn find(&self, path: &[&str]) -> Option<&PhaseTiming> {
        let (first, rest) = path.split_first()?;
        let mut current = self.phases.iter().find(|p| p.name == *first)?;
        for name in rest {
            current = current.child(name)?;
        }
        Some(current)
    }

    /// Sum of the top-level phases.
    pub fn measured_total_ms(&self) -> f64 {
        self.phases.iter().map(|p| p.duration_ms).sum()
    }

    /// Depth-first walk in recording order; top-level phases have depth 0.
    pub fn walk(&self, mut visit: impl FnMut(usize, &PhaseTiming)) {
        fn go(phases: &[PhaseTiming], depth: usize, visit: &mut impl FnMut(usize, &PhaseTiming)) {
            for phase in phases {
                visit(depth, phase);
                go(&phase.children, depth + 1, visit);
            }
        }
        go(&self.phases, 0, &mut visit);
    }
}

impl Serialize for TimingBreakdown {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("TimingBreakdown", 2)?;
        state.serialize_field("total_ms", &self.total_ms)?;
        state.serialize_field("phases", &PhaseList(&self.phases))?;
        state.end()
    }
}

struct PhaseList<'a>(&'a [PhaseTiming]);

impl Serialize for PhaseList<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for phase in self.0 {
            if phase.is_leaf() {
                map.serialize_entry(&phase.name, &phase.duration_ms)?;
            } else {
                map.serialize_entry(&phase.name, &PhaseNode(phase))?;
            }
        }
        map.end()
    }
}

struct PhaseNode<'a>(&'a PhaseTiming);

impl Serialize for PhaseNode<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Phase", 2)?;
        state.serialize_field("duration_ms", &self.0.duration_ms)?;
        state.serialize_field("phases", &PhaseList(&self.0.children))?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for TimingBreakdown {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawBreakdown {
            total_ms: f64,
            #[serde(default)]
            phases: OrderedPhases,
        }

        let raw = RawBreakdown::deserialize(deserializer)?;
        check_duration::<D::Error>("total_ms", raw.total_ms)?;
        Ok(Self {
            total_ms: raw.total_ms,
            phases: raw.phases.0,
        })
    }
}

#[derive(Default)]
struct OrderedPhases(Vec<PhaseTiming>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PhaseValue {
    Leaf(f64),
    Node {
        duration_ms: f64,
        #[serde(default)]
        phases: OrderedPhases,
    },
}

impl<'de> Deserialize<'de> for OrderedPhases {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(PhasesVisitor)
    }
}

struct PhasesVisitor;

impl<'de> Visitor<'de> for PhasesVisitor {
    type Value = OrderedPhases;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of phase names to durations or nested phases")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut phases: Vec<PhaseTiming> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, value)) = map.next_entry::<String, PhaseValue>()? {
            if phases.iter().any(|p| p.name == name) {
                return Err(de::Error::custom(format_args!("duplicate phase `{name}`")));
            }
            let phase = match value {
                PhaseValue::Leaf(duration_ms) => PhaseTiming::leaf(name, duration_ms),
                PhaseValue::Node {
                    duration_ms,
                    phases: children,
                } => PhaseTiming::with_children(name, duration_ms, children.0),
            };
            check_duration::<A::Error>(&phase.name, phase.duration_ms)?;
            phases.push(phase);
        }
        Ok(OrderedPhases(phases))
    }
}

fn check_duration<E: de::Error>(name: &str, duration_ms: f64) -> Result<(), E> {
    if duration_ms.is_finite() && duration_ms >= 0.0 {
        Ok(())
    } else {
        Err(E::custom(format_args!(
            "phase `{name}` has invalid duration {duration_ms}"
        )))
    }
}

pub mod detection;
pub mod timing;
pub mod wire;

pub use detection::{DetectionResult, DetectionSummary};
pub use timing::{PhaseTiming, TimingBreakdown};
pub use wire::{
    DetectionBody, DetectionRequest, DetectionResponse, Envelope, ErrorBody, ErrorKind,
    ResponseBody, ResponseError,
};

pub mod config;
pub mod detector;
pub mod error;
pub mod handler;
pub mod imaging;
pub mod runtime;
pub mod server;
pub mod timing;

pub use config::{FunctionConfig, Thresholds};
pub use detector::{Detector, SharedDetector};
pub use handler::{DetectionHandler, HandlerSettings};
pub use timing::TimingAccumulator;

pub mod aggregate;
pub mod cli;
pub mod error;
pub mod invoke;
pub mod measure;
pub mod overhead;
pub mod report;
pub mod transport;

pub use aggregate::{AggregateError, AggregateReport, aggregate};
pub use error::ClientError;
pub use invoke::{InvocationOutcome, Invoker};
pub use measure::{InvocationRecord, MeasurementOutcome, Progress, run_measurements};
pub use overhead::{Overhead, other_overhead};
pub use transport::{AnyTransport, Transport, TransportError};

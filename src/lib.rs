pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod manager;
pub mod registry;
pub mod report;
pub mod state;
pub mod stateless;

pub use coordinator::ReportingLifecycleCoordinator;
pub use error::{ConfigurationError, Error};
pub use manager::{ManagerId, ReportManager};
pub use registry::{ParamType, ParamValue, ReporterDefinition, ReporterRegistry, ReporterResolver};
pub use report::Reporter;
pub use state::{RunStatistics, StatisticsSnapshot};
pub use stateless::{Encoding, IsolationContext, StatelessListenerFactory};

pub mod orchestrator;
pub mod report;
pub mod selection;
pub mod status;

pub use orchestrator::{CoinSnapshot, SearchSnapshot, Session, SessionConfig, SessionLimiters, SessionSnapshot};
pub use report::{CoinReport, Report, ReportTask};
pub use selection::{MAX_SELECTED, Selection};
pub use status::{OperationStatus, ReportStatus, StatusCell};

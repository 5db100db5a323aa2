//! 工具箱：diagnose_risk / find_local_resources / save_report 与分派器

pub mod executor;
pub mod invocation;
pub mod reports;
pub mod resources;
pub mod risk;
pub mod schema;

pub use executor::ToolDispatcher;
pub use invocation::{ToolInvocation, ToolName, ToolOutcome, ToolResult};
pub use reports::{
    save_report, InMemoryReportStore, ReportReceipt, ReportStatus, ReportStore, ReportStoreError,
    StoredReport,
};
pub use resources::{normalize_location, LocalResources, ResourceIndex};
pub use risk::{diagnose_risk, RiskAssessment, RiskLevel};
pub use schema::{
    tool_spec, tool_specs, DiagnoseRiskArgs, FindLocalResourcesArgs, SaveReportArgs, ToolSpec,
};

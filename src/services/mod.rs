pub mod conflicts;
pub mod export;
pub mod import;
pub mod preflight;
pub mod versions;

pub use conflicts::{ConflictReport, ConflictService};
pub use export::{ExportService, ExportStats};
pub use import::{ApplyStats, ImportService, ImportStats};
pub use preflight::PreflightReport;
pub use versions::VersionService;

/// Canonical document names shared by the relational projector, the
/// blob store and the data directory the solving process reads.
pub const ROOMS_FILE: &str = "rooms.csv";
pub const AVAILABILITY_FILE: &str = "lecturer_availability.csv";
pub const COURSES_FILE: &str = "departmental_courses.csv";

/// Artifact produced by the solving process; also the default subject of
/// conflict checks and version snapshots.
pub const SOLVER_RESULTS_FILE: &str = "schedule_results.csv";

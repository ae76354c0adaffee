pub mod grouping;
pub mod projects;
pub mod session;
pub mod types;
mod uuidstem;
pub mod worktrees;

pub use grouping::{group_projects, slugify};
pub use projects::scan_projects;
pub use session::{extract_session_summary, resolve_session_path, scan_sessions};
pub use types::{GroupedProject, ProjectSummary, SessionSummary, WorktreeSummary};
pub use worktrees::scan_worktrees;

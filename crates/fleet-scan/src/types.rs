use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub source: String,
    pub path: String,
    pub session_count: usize,
    pub last_active_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub first_prompt: Option<String>,
    pub model: Option<String>,
    pub started_at: Option<String>,
    pub last_active_at: Option<String>,
    pub cwd: Option<String>,
    pub git_branch: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_input_tokens: u64,
    pub cache_read_input_tokens: u64,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeSummary {
    pub name: String,
    pub path: String,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupedProject {
    pub slug: String,
    pub title: String,
    pub project_dirs: Vec<String>,
    pub matched_dir_ids: Vec<String>,
    pub session_count: usize,
    pub last_active_at: Option<String>,
}

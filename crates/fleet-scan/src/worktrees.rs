//! `scanWorktrees`: directory-scan strategy. Lists
//! `<projectPath>/.claude/.worktrees/*` and reads each entry's `.git` HEAD
//! directly rather than shelling out to `git worktree list`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::WorktreeSummary;

pub fn scan_worktrees(project_path: &Path) -> Vec<WorktreeSummary> {
    let worktrees_dir = project_path.join(".claude").join(".worktrees");
    let Ok(entries) = fs::read_dir(&worktrees_dir) else {
        return Vec::new();
    };

    let mut worktrees: Vec<WorktreeSummary> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            Some(WorktreeSummary {
                path: path.to_string_lossy().to_string(),
                branch: branch_of(&path),
                name,
            })
        })
        .collect();

    worktrees.sort_by(|a, b| a.name.cmp(&b.name));
    worktrees
}

fn branch_of(worktree_path: &Path) -> Option<String> {
    let dot_git = worktree_path.join(".git");
    let head_path = if dot_git.is_dir() {
        dot_git.join("HEAD")
    } else {
        let content = fs::read_to_string(&dot_git).ok()?;
        let gitdir = content.strip_prefix("gitdir:")?.trim();
        let gitdir_path = PathBuf::from(gitdir);
        let gitdir_path = if gitdir_path.is_absolute() {
            gitdir_path
        } else {
            worktree_path.join(gitdir_path)
        };
        gitdir_path.join("HEAD")
    };

    let head = fs::read_to_string(head_path).ok()?;
    head.trim().strip_prefix("ref: refs/heads/").map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_worktrees_dir_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_worktrees(dir.path()).is_empty());
    }

    #[test]
    fn lists_worktree_directories_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let worktrees_dir = dir.path().join(".claude").join(".worktrees");
        fs::create_dir_all(worktrees_dir.join("zeta")).unwrap();
        fs::create_dir_all(worktrees_dir.join("alpha")).unwrap();

        let worktrees = scan_worktrees(dir.path());
        assert_eq!(worktrees.len(), 2);
        assert_eq!(worktrees[0].name, "alpha");
        assert_eq!(worktrees[1].name, "zeta");
    }

    #[test]
    fn reads_branch_from_dot_git_head() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = dir.path().join(".claude").join(".worktrees").join("feature");
        fs::create_dir_all(worktree.join(".git")).unwrap();
        fs::write(worktree.join(".git").join("HEAD"), "ref: refs/heads/feature-x\n").unwrap();

        let worktrees = scan_worktrees(dir.path());
        assert_eq!(worktrees[0].branch.as_deref(), Some("feature-x"));
    }

    #[test]
    fn detached_head_yields_no_branch() {
        let dir = tempfile::tempdir().unwrap();
        let worktree = dir.path().join(".claude").join(".worktrees").join("detached");
        fs::create_dir_all(worktree.join(".git")).unwrap();
        fs::write(worktree.join(".git").join("HEAD"), "abcdef0123456789\n").unwrap();

        let worktrees = scan_worktrees(dir.path());
        assert!(worktrees[0].branch.is_none());
    }
}

//! Collaborators invoked by route handlers.
//!
//! The HTTP core never touches git objects or database rows directly. It talks
//! to a [`RepositoryEngine`] (repositories, branches, commits, trees, blobs)
//! and a [`RecordStore`] (issues and pull requests) through these traits.
//! Both are synchronous: handlers run on the blocking pool, so an
//! implementation is free to do blocking disk or database I/O.

pub mod memory;

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub use memory::{MemoryRecordStore, MemoryRepositoryEngine};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("invalid: {0}")]
    Invalid(String),

    /// Failure inside the backend itself (I/O, lock poisoning, driver error).
    #[error("backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub description: String,
    pub owner: String,
    pub default_branch: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
    /// Id of the newest commit.
    pub head: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub id: String,
    pub parent: Option<String>,
    pub author: String,
    pub message: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    /// Byte size for files, absent for directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub path: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(IssueState::Open),
            "closed" => Some(IssueState::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub id: u64,
    pub repo: String,
    pub title: String,
    pub body: String,
    pub state: IssueState,
    pub author: String,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub author: String,
}

#[derive(Debug, Clone, Default)]
pub struct IssueUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<IssueState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullState {
    Open,
    Closed,
    Merged,
}

impl PullState {
    pub fn as_str(self) -> &'static str {
        match self {
            PullState::Open => "open",
            PullState::Closed => "closed",
            PullState::Merged => "merged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    pub id: u64,
    pub repo: String,
    pub title: String,
    pub body: String,
    /// Branch being merged.
    pub head: String,
    /// Branch merged into.
    pub base: String,
    pub state: PullState,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_commit: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
    pub author: String,
}

#[derive(Debug, Clone, Default)]
pub struct PullUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: Option<PullState>,
    pub merge_commit: Option<String>,
}

/// Repository operations backing the `/api/repos` and `/api/repo/{name}/...` routes.
pub trait RepositoryEngine: Send + Sync {
    fn list_repositories(&self) -> StoreResult<Vec<RepositoryInfo>>;

    /// Creates a repository whose default branch holds one initial commit.
    fn create_repository(
        &self,
        name: &str,
        description: &str,
        owner: &str,
    ) -> StoreResult<RepositoryInfo>;

    fn repository(&self, name: &str) -> StoreResult<RepositoryInfo>;

    fn branches(&self, repo: &str) -> StoreResult<Vec<Branch>>;

    /// Creates `branch` pointing at the current head of `from`.
    fn create_branch(&self, repo: &str, branch: &str, from: &str) -> StoreResult<Branch>;

    fn delete_branch(&self, repo: &str, branch: &str) -> StoreResult<()>;

    /// Commit history of `branch`, newest first.
    fn commits(&self, repo: &str, branch: &str) -> StoreResult<Vec<Commit>>;

    /// Immediate children of directory `path` ("" is the root).
    fn tree(&self, repo: &str, branch: &str, path: &str) -> StoreResult<Vec<TreeEntry>>;

    fn blob(&self, repo: &str, branch: &str, path: &str) -> StoreResult<Blob>;

    /// Merges `head` into `base`, returning the merge commit on `base`.
    fn merge(&self, repo: &str, head: &str, base: &str, author: &str) -> StoreResult<Commit>;
}

/// Issue and pull-request persistence.
pub trait RecordStore: Send + Sync {
    fn issues(&self, repo: &str) -> StoreResult<Vec<Issue>>;
    fn create_issue(&self, repo: &str, issue: NewIssue) -> StoreResult<Issue>;
    fn issue(&self, repo: &str, id: u64) -> StoreResult<Issue>;
    fn update_issue(&self, repo: &str, id: u64, update: IssueUpdate) -> StoreResult<Issue>;

    fn pulls(&self, repo: &str) -> StoreResult<Vec<PullRequest>>;
    fn create_pull(&self, repo: &str, pull: NewPullRequest) -> StoreResult<PullRequest>;
    fn pull(&self, repo: &str, id: u64) -> StoreResult<PullRequest>;
    fn update_pull(&self, repo: &str, id: u64, update: PullUpdate) -> StoreResult<PullRequest>;

    /// Moves a pull request from state `from` to `to` in one step. Fails with
    /// [`StoreError::Invalid`] when the current state is not `from`.
    fn transition_pull(
        &self,
        repo: &str,
        id: u64,
        from: PullState,
        to: PullState,
    ) -> StoreResult<PullRequest>;
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

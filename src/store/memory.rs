//! In-memory collaborators.
//!
//! `MemoryRepositoryEngine` keeps, per branch, a full file snapshot and its
//! commit history. Commit ids are SHA-256 digests over the commit fields and
//! snapshot, truncated to 20 bytes and hex-encoded. `MemoryRecordStore`
//! keeps per-repository issue and pull-request tables with sequential ids.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    Blob, Branch, Commit, EntryKind, Issue, IssueState, IssueUpdate, NewIssue, NewPullRequest,
    PullRequest, PullState, PullUpdate, RecordStore, RepositoryEngine, RepositoryInfo,
    StoreError, StoreResult, TreeEntry, unix_now,
};

const DEFAULT_BRANCH: &str = "main";
const COMMIT_ID_BYTES: usize = 20;

#[derive(Debug, Clone)]
struct BranchState {
    /// Oldest first.
    history: Vec<Commit>,
    files: BTreeMap<String, Vec<u8>>,
}

impl BranchState {
    fn head(&self) -> &str {
        self.history.last().map(|c| c.id.as_str()).unwrap_or_default()
    }

    fn commit(&mut self, author: &str, message: String) -> Commit {
        let parent = self.history.last().map(|c| c.id.clone());
        let timestamp = unix_now();
        let commit = Commit {
            id: commit_id(parent.as_deref(), author, &message, timestamp, &self.files),
            parent,
            author: author.to_string(),
            message,
            timestamp,
        };
        self.history.push(commit.clone());
        commit
    }
}

#[derive(Debug)]
struct RepoState {
    info: RepositoryInfo,
    branches: BTreeMap<String, BranchState>,
}

impl RepoState {
    fn branch(&self, name: &str) -> StoreResult<&BranchState> {
        self.branches
            .get(name)
            .ok_or_else(|| StoreError::NotFound(format!("branch '{name}'")))
    }

    fn branch_mut(&mut self, name: &str) -> StoreResult<&mut BranchState> {
        self.branches
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(format!("branch '{name}'")))
    }

    fn describe(&self, name: &str, state: &BranchState) -> Branch {
        Branch {
            name: name.to_string(),
            head: state.head().to_string(),
            is_default: name == self.info.default_branch,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepositoryEngine {
    repos: RwLock<BTreeMap<String, RepoState>>,
}

impl MemoryRepositoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, RepoState>>> {
        self.repos
            .read()
            .map_err(|_| StoreError::Backend("repository lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, RepoState>>> {
        self.repos
            .write()
            .map_err(|_| StoreError::Backend("repository lock poisoned".to_string()))
    }
}

fn repo_not_found(name: &str) -> StoreError {
    StoreError::NotFound(format!("repository '{name}'"))
}

impl RepositoryEngine for MemoryRepositoryEngine {
    fn list_repositories(&self) -> StoreResult<Vec<RepositoryInfo>> {
        Ok(self.read()?.values().map(|r| r.info.clone()).collect())
    }

    fn create_repository(
        &self,
        name: &str,
        description: &str,
        owner: &str,
    ) -> StoreResult<RepositoryInfo> {
        let mut repos = self.write()?;
        if repos.contains_key(name) {
            return Err(StoreError::AlreadyExists(format!("repository '{name}'")));
        }

        let info = RepositoryInfo {
            name: name.to_string(),
            description: description.to_string(),
            owner: owner.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            created_at: unix_now(),
        };

        let mut readme = format!("# {name}\n");
        if !description.is_empty() {
            readme.push('\n');
            readme.push_str(description);
            readme.push('\n');
        }
        let mut main = BranchState {
            history: Vec::new(),
            files: BTreeMap::from([("README.md".to_string(), readme.into_bytes())]),
        };
        main.commit(owner, "Initial commit".to_string());

        let state = RepoState {
            info: info.clone(),
            branches: BTreeMap::from([(DEFAULT_BRANCH.to_string(), main)]),
        };
        repos.insert(name.to_string(), state);

        tracing::info!(repo = name, owner = owner, "Repository created");
        Ok(info)
    }

    fn repository(&self, name: &str) -> StoreResult<RepositoryInfo> {
        self.read()?
            .get(name)
            .map(|r| r.info.clone())
            .ok_or_else(|| repo_not_found(name))
    }

    fn branches(&self, repo: &str) -> StoreResult<Vec<Branch>> {
        let repos = self.read()?;
        let state = repos.get(repo).ok_or_else(|| repo_not_found(repo))?;
        Ok(state
            .branches
            .iter()
            .map(|(name, branch)| state.describe(name, branch))
            .collect())
    }

    fn create_branch(&self, repo: &str, branch: &str, from: &str) -> StoreResult<Branch> {
        let mut repos = self.write()?;
        let state = repos.get_mut(repo).ok_or_else(|| repo_not_found(repo))?;
        if state.branches.contains_key(branch) {
            return Err(StoreError::AlreadyExists(format!("branch '{branch}'")));
        }

        let source = state.branch(from)?.clone();
        let created = state.describe(branch, &source);
        state.branches.insert(branch.to_string(), source);
        Ok(created)
    }

    fn delete_branch(&self, repo: &str, branch: &str) -> StoreResult<()> {
        let mut repos = self.write()?;
        let state = repos.get_mut(repo).ok_or_else(|| repo_not_found(repo))?;
        if branch == state.info.default_branch {
            return Err(StoreError::Invalid(format!(
                "cannot delete default branch '{branch}'"
            )));
        }
        state
            .branches
            .remove(branch)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("branch '{branch}'")))
    }

    fn commits(&self, repo: &str, branch: &str) -> StoreResult<Vec<Commit>> {
        let repos = self.read()?;
        let state = repos.get(repo).ok_or_else(|| repo_not_found(repo))?;
        Ok(state.branch(branch)?.history.iter().rev().cloned().collect())
    }

    fn tree(&self, repo: &str, branch: &str, path: &str) -> StoreResult<Vec<TreeEntry>> {
        let repos = self.read()?;
        let state = repos.get(repo).ok_or_else(|| repo_not_found(repo))?;
        let files = &state.branch(branch)?.files;

        let dir = path.trim_matches('/');
        if files.contains_key(dir) {
            return Err(StoreError::Invalid(format!("'{dir}' is not a directory")));
        }
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut entries: BTreeMap<String, TreeEntry> = BTreeMap::new();
        for (file, content) in files.range(prefix.clone()..) {
            let Some(rest) = file.strip_prefix(&prefix) else {
                break;
            };
            let entry = match rest.split_once('/') {
                Some((child, _)) => TreeEntry {
                    name: child.to_string(),
                    path: format!("{prefix}{child}"),
                    kind: EntryKind::Dir,
                    size: None,
                },
                None => TreeEntry {
                    name: rest.to_string(),
                    path: file.clone(),
                    kind: EntryKind::File,
                    size: Some(content.len() as u64),
                },
            };
            entries.entry(entry.name.clone()).or_insert(entry);
        }

        if entries.is_empty() && !dir.is_empty() {
            return Err(StoreError::NotFound(format!("path '{dir}'")));
        }
        Ok(entries.into_values().collect())
    }

    fn blob(&self, repo: &str, branch: &str, path: &str) -> StoreResult<Blob> {
        let repos = self.read()?;
        let state = repos.get(repo).ok_or_else(|| repo_not_found(repo))?;
        let path = path.trim_matches('/');
        state
            .branch(branch)?
            .files
            .get(path)
            .map(|content| Blob {
                path: path.to_string(),
                content: content.clone(),
            })
            .ok_or_else(|| StoreError::NotFound(format!("file '{path}'")))
    }

    fn merge(&self, repo: &str, head: &str, base: &str, author: &str) -> StoreResult<Commit> {
        if head == base {
            return Err(StoreError::Invalid("cannot merge a branch into itself".to_string()));
        }

        let mut repos = self.write()?;
        let state = repos.get_mut(repo).ok_or_else(|| repo_not_found(repo))?;
        let incoming = state.branch(head)?.files.clone();
        let target = state.branch_mut(base)?;

        // Incoming side wins on conflicting paths.
        target.files.extend(incoming);
        let commit = target.commit(author, format!("Merge branch '{head}' into {base}"));

        tracing::info!(repo = repo, head = head, base = base, commit = %commit.id, "Branch merged");
        Ok(commit)
    }
}

fn commit_id(
    parent: Option<&str>,
    author: &str,
    message: &str,
    timestamp: u64,
    files: &BTreeMap<String, Vec<u8>>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(parent.unwrap_or_default().as_bytes());
    hasher.update([0u8]);
    hasher.update(author.as_bytes());
    hasher.update([0u8]);
    hasher.update(message.as_bytes());
    hasher.update(timestamp.to_be_bytes());
    for (path, content) in files {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(Sha256::digest(content));
    }
    hex::encode(&hasher.finalize()[..COMMIT_ID_BYTES])
}

#[derive(Debug, Default)]
struct RepoRecords {
    issues: BTreeMap<u64, Issue>,
    pulls: BTreeMap<u64, PullRequest>,
    last_issue: u64,
    last_pull: u64,
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, RepoRecords>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, HashMap<String, RepoRecords>>> {
        self.records
            .lock()
            .map_err(|_| StoreError::Backend("record store lock poisoned".to_string()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn issues(&self, repo: &str) -> StoreResult<Vec<Issue>> {
        Ok(self
            .lock()?
            .get(repo)
            .map(|r| r.issues.values().cloned().collect())
            .unwrap_or_default())
    }

    fn create_issue(&self, repo: &str, issue: NewIssue) -> StoreResult<Issue> {
        let mut records = self.lock()?;
        let table = records.entry(repo.to_string()).or_default();
        table.last_issue += 1;

        let now = unix_now();
        let created = Issue {
            id: table.last_issue,
            repo: repo.to_string(),
            title: issue.title,
            body: issue.body,
            state: IssueState::Open,
            author: issue.author,
            created_at: now,
            updated_at: now,
        };
        table.issues.insert(created.id, created.clone());
        Ok(created)
    }

    fn issue(&self, repo: &str, id: u64) -> StoreResult<Issue> {
        self.lock()?
            .get(repo)
            .and_then(|r| r.issues.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("issue #{id}")))
    }

    fn update_issue(&self, repo: &str, id: u64, update: IssueUpdate) -> StoreResult<Issue> {
        let mut records = self.lock()?;
        let issue = records
            .get_mut(repo)
            .and_then(|r| r.issues.get_mut(&id))
            .ok_or_else(|| StoreError::NotFound(format!("issue #{id}")))?;

        if let Some(title) = update.title {
            issue.title = title;
        }
        if let Some(body) = update.body {
            issue.body = body;
        }
        if let Some(state) = update.state {
            issue.state = state;
        }
        issue.updated_at = unix_now();
        Ok(issue.clone())
    }

    fn pulls(&self, repo: &str) -> StoreResult<Vec<PullRequest>> {
        Ok(self
            .lock()?
            .get(repo)
            .map(|r| r.pulls.values().cloned().collect())
            .unwrap_or_default())
    }

    fn create_pull(&self, repo: &str, pull: NewPullRequest) -> StoreResult<PullRequest> {
        let mut records = self.lock()?;
        let table = records.entry(repo.to_string()).or_default();
        table.last_pull += 1;

        let now = unix_now();
        let created = PullRequest {
            id: table.last_pull,
            repo: repo.to_string(),
            title: pull.title,
            body: pull.body,
            head: pull.head,
            base: pull.base,
            state: PullState::Open,
            author: pull.author,
            merge_commit: None,
            created_at: now,
            updated_at: now,
        };
        table.pulls.insert(created.id, created.clone());
        Ok(created)
    }

    fn pull(&self, repo: &str, id: u64) -> StoreResult<PullRequest> {
        self.lock()?
            .get(repo)
            .and_then(|r| r.pulls.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("pull request #{id}")))
    }

    fn update_pull(&self, repo: &str, id: u64, update: PullUpdate) -> StoreResult<PullRequest> {
        let mut records = self.lock()?;
        let pull = records
            .get_mut(repo)
            .and_then(|r| r.pulls.get_mut(&id))
            .ok_or_else(|| StoreError::NotFound(format!("pull request #{id}")))?;

        if let Some(title) = update.title {
            pull.title = title;
        }
        if let Some(body) = update.body {
            pull.body = body;
        }
        if let Some(state) = update.state {
            pull.state = state;
        }
        if let Some(commit) = update.merge_commit {
            pull.merge_commit = Some(commit);
        }
        pull.updated_at = unix_now();
        Ok(pull.clone())
    }

    fn transition_pull(
        &self,
        repo: &str,
        id: u64,
        from: PullState,
        to: PullState,
    ) -> StoreResult<PullRequest> {
        let mut records = self.lock()?;
        let pull = records
            .get_mut(repo)
            .and_then(|r| r.pulls.get_mut(&id))
            .ok_or_else(|| StoreError::NotFound(format!("pull request #{id}")))?;

        if pull.state != from {
            return Err(StoreError::Invalid(format!(
                "pull request #{id} is {}, not {}",
                pull.state.as_str(),
                from.as_str()
            )));
        }
        pull.state = to;
        pull.updated_at = unix_now();
        Ok(pull.clone())
    }
}

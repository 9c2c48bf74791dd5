use forge::store::{
    EntryKind, IssueState, IssueUpdate, MemoryRecordStore, MemoryRepositoryEngine, NewIssue,
    NewPullRequest, PullState, PullUpdate, RecordStore, RepositoryEngine, StoreError,
};

fn engine_with_repo() -> MemoryRepositoryEngine {
    let engine = MemoryRepositoryEngine::new();
    engine.create_repository("demo", "A demo", "admin").unwrap();
    engine
}

#[test]
fn test_create_repository_seeds_main() {
    let engine = engine_with_repo();

    let info = engine.repository("demo").unwrap();
    assert_eq!(info.owner, "admin");
    assert_eq!(info.default_branch, "main");

    let branches = engine.branches("demo").unwrap();
    assert_eq!(branches.len(), 1);
    assert!(branches[0].is_default);

    let commits = engine.commits("demo", "main").unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "Initial commit");
    assert_eq!(commits[0].parent, None);
    assert_eq!(commits[0].id.len(), 40);
    assert_eq!(branches[0].head, commits[0].id);

    let readme = engine.blob("demo", "main", "README.md").unwrap();
    assert_eq!(readme.content, b"# demo\n\nA demo\n".to_vec());
}

#[test]
fn test_create_repository_twice() {
    let engine = engine_with_repo();
    assert!(matches!(
        engine.create_repository("demo", "", "admin"),
        Err(StoreError::AlreadyExists(_))
    ));
}

#[test]
fn test_unknown_repository() {
    let engine = MemoryRepositoryEngine::new();
    assert!(matches!(engine.repository("nope"), Err(StoreError::NotFound(_))));
    assert!(matches!(engine.branches("nope"), Err(StoreError::NotFound(_))));
    assert!(engine.list_repositories().unwrap().is_empty());
}

#[test]
fn test_branch_lifecycle() {
    let engine = engine_with_repo();

    let feature = engine.create_branch("demo", "feature", "main").unwrap();
    assert!(!feature.is_default);
    assert_eq!(feature.head, engine.commits("demo", "main").unwrap()[0].id);
    // Listed by name.
    let names: Vec<_> = engine
        .branches("demo")
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, ["feature", "main"]);

    assert!(matches!(
        engine.create_branch("demo", "feature", "main"),
        Err(StoreError::AlreadyExists(_))
    ));
    assert!(matches!(
        engine.create_branch("demo", "other", "missing"),
        Err(StoreError::NotFound(_))
    ));

    engine.delete_branch("demo", "feature").unwrap();
    assert_eq!(engine.branches("demo").unwrap().len(), 1);
    assert!(matches!(
        engine.delete_branch("demo", "feature"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_default_branch_cannot_be_deleted() {
    let engine = engine_with_repo();
    assert!(matches!(
        engine.delete_branch("demo", "main"),
        Err(StoreError::Invalid(_))
    ));
}

#[test]
fn test_tree_listing() {
    let engine = engine_with_repo();

    let root = engine.tree("demo", "main", "").unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].name, "README.md");
    assert_eq!(root[0].kind, EntryKind::File);
    assert_eq!(root[0].size, Some(15));

    assert!(matches!(
        engine.tree("demo", "main", "README.md"),
        Err(StoreError::Invalid(_))
    ));
    assert!(matches!(
        engine.tree("demo", "main", "src"),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_merge_adds_commit_to_base() {
    let engine = engine_with_repo();
    engine.create_branch("demo", "feature", "main").unwrap();

    let commit = engine.merge("demo", "feature", "main", "alice").unwrap();
    assert_eq!(commit.message, "Merge branch 'feature' into main");
    assert_eq!(commit.author, "alice");

    let history = engine.commits("demo", "main").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, commit.id);
    assert_eq!(commit.parent.as_deref(), Some(history[1].id.as_str()));

    assert!(matches!(
        engine.merge("demo", "main", "main", "alice"),
        Err(StoreError::Invalid(_))
    ));
}

#[test]
fn test_issue_ids_are_sequential_per_repo() {
    let store = MemoryRecordStore::new();
    let new_issue = |title: &str| NewIssue {
        title: title.to_string(),
        body: String::new(),
        author: "admin".to_string(),
    };

    assert_eq!(store.create_issue("a", new_issue("one")).unwrap().id, 1);
    assert_eq!(store.create_issue("a", new_issue("two")).unwrap().id, 2);
    assert_eq!(store.create_issue("b", new_issue("one")).unwrap().id, 1);

    assert_eq!(store.issues("a").unwrap().len(), 2);
    assert!(store.issues("c").unwrap().is_empty());
}

#[test]
fn test_issue_update() {
    let store = MemoryRecordStore::new();
    let issue = store
        .create_issue(
            "demo",
            NewIssue {
                title: "Bug".to_string(),
                body: "Broken".to_string(),
                author: "admin".to_string(),
            },
        )
        .unwrap();
    assert_eq!(issue.state, IssueState::Open);

    let closed = store
        .update_issue(
            "demo",
            issue.id,
            IssueUpdate {
                state: Some(IssueState::Closed),
                ..IssueUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(closed.state, IssueState::Closed);
    assert_eq!(closed.title, "Bug");
    assert_eq!(store.issue("demo", issue.id).unwrap(), closed);

    assert!(matches!(
        store.update_issue("demo", 99, IssueUpdate::default()),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn test_pull_update_records_merge() {
    let store = MemoryRecordStore::new();
    let pull = store
        .create_pull(
            "demo",
            NewPullRequest {
                title: "Feature".to_string(),
                body: String::new(),
                head: "feature".to_string(),
                base: "main".to_string(),
                author: "admin".to_string(),
            },
        )
        .unwrap();
    assert_eq!(pull.state, PullState::Open);
    assert_eq!(pull.merge_commit, None);

    let merged = store
        .update_pull(
            "demo",
            pull.id,
            PullUpdate {
                state: Some(PullState::Merged),
                merge_commit: Some("abc".to_string()),
                ..PullUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(merged.state, PullState::Merged);
    assert_eq!(merged.merge_commit.as_deref(), Some("abc"));
    assert!(matches!(store.pull("demo", 2), Err(StoreError::NotFound(_))));
}

#[test]
fn test_pull_transition_requires_expected_state() {
    let store = MemoryRecordStore::new();
    let pull = store
        .create_pull(
            "demo",
            NewPullRequest {
                title: "Feature".to_string(),
                body: String::new(),
                head: "feature".to_string(),
                base: "main".to_string(),
                author: "admin".to_string(),
            },
        )
        .unwrap();

    let merged = store
        .transition_pull("demo", pull.id, PullState::Open, PullState::Merged)
        .unwrap();
    assert_eq!(merged.state, PullState::Merged);

    assert!(matches!(
        store.transition_pull("demo", pull.id, PullState::Open, PullState::Closed),
        Err(StoreError::Invalid(_))
    ));
    assert_eq!(store.pull("demo", pull.id).unwrap().state, PullState::Merged);

    let reopened = store
        .transition_pull("demo", pull.id, PullState::Merged, PullState::Open)
        .unwrap();
    assert_eq!(reopened.state, PullState::Open);

    assert!(matches!(
        store.transition_pull("demo", 42, PullState::Open, PullState::Closed),
        Err(StoreError::NotFound(_))
    ));
}

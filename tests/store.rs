//! Version store scenarios: commits, branches, checkout and revert.

mod common;
use common::*;

use scenelog::error::StoreError;
use scenelog::store::{BranchInfo, INITIAL_COMMIT_MESSAGE, Identity, RevertOutcome, VersionStore};
use scenelog::ProjectLayout;

fn write_log(store: &VersionStore, actions: &[&str]) {
    let text = scenelog::actionlog::render_log(actions.iter().copied());
    std::fs::write(store.layout().log_path(), text).unwrap();
}

#[test]
fn init_makes_initial_commit_on_main() {
    let (_dir, store) = new_store();
    let head = store.head().unwrap();
    assert_eq!(head.branch, "main");
    let commits: Vec<_> = store
        .list_commits("main")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, INITIAL_COMMIT_MESSAGE);
    assert_eq!(commits[0].parent, None);
    assert_eq!(commits[0].author, "Artist");
    assert_eq!(commits[0].email, "a@e");
}

#[test]
fn init_twice_is_already_initialized() {
    let (_dir, store) = new_store();
    let layout = store.layout().clone();
    assert!(matches!(
        VersionStore::init(&layout, &identity(), "main"),
        Err(StoreError::AlreadyInitialized { .. })
    ));
}

#[test]
fn init_writes_ignore_marker() {
    let (_dir, store) = new_store();
    let marker = std::fs::read_to_string(store.layout().ignore_path()).unwrap();
    assert!(marker.lines().any(|l| l == ".scenelog/"));
    assert!(marker.lines().any(|l| l == "assets/"));
}

#[test]
fn open_without_repository_is_not_a_repository() {
    let (_dir, root) = project_root();
    std::fs::create_dir_all(&root).unwrap();
    let layout = ProjectLayout::new(&root, "scene", "blend");
    assert!(matches!(
        VersionStore::open(&layout),
        Err(StoreError::NotARepository { .. })
    ));
}

#[test]
fn open_restores_missing_identity_with_defaults() {
    let (_dir, store) = new_store();
    let layout = store.layout().clone();
    drop(store);
    let config = layout.root().join(".git").join("config");
    let text = std::fs::read_to_string(&config).unwrap();
    let stripped: String = text
        .lines()
        .filter(|l| !l.trim_start().starts_with("name") && !l.trim_start().starts_with("email"))
        .map(|l| format!("{l}\n"))
        .collect();
    std::fs::write(&config, stripped).unwrap();

    let mut store = VersionStore::open(&layout).unwrap();
    let identity = store.identity().unwrap();
    assert!(!identity.name.is_empty());
    assert!(!identity.email.is_empty());
    store.commit("after identity repair").unwrap();
}

#[test]
fn n_commits_list_n_plus_one_most_recent_first() {
    let (_dir, mut store) = new_store();
    let mut expected = vec![INITIAL_COMMIT_MESSAGE.to_owned()];
    for n in 1..=5 {
        let actions: Vec<&str> = std::iter::repeat_n(CUBE, n).collect();
        write_log(&store, &actions);
        let message = format!("commit {n}");
        store.commit(&message).unwrap();
        expected.push(message);
    }
    expected.reverse();

    let commits: Vec<_> = store
        .list_commits("main")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let messages: Vec<String> = commits.iter().map(|c| c.message.clone()).collect();
    assert_eq!(messages, expected);
    for pair in commits.windows(2) {
        assert_eq!(pair[0].parent, Some(pair[1].id));
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
}

#[test]
fn identical_tree_still_commits() {
    let (_dir, mut store) = new_store();
    let first = store.head().unwrap().commit.unwrap();
    let second = store.commit("again").unwrap();
    assert_ne!(first, second);
    assert_eq!(
        store.commit_record(first).unwrap().tree,
        store.commit_record(second).unwrap().tree
    );
}

#[test]
fn branch_list_after_init_is_main_active() {
    let (_dir, store) = new_store();
    assert_eq!(
        store.branch_list().unwrap(),
        [BranchInfo {
            name: "main".to_owned(),
            is_active: true
        }]
    );
}

#[test]
fn duplicate_and_invalid_branches_are_rejected() {
    let (_dir, mut store) = new_store();
    store.branch_create("feature").unwrap();
    assert!(matches!(
        store.branch_create("feature"),
        Err(StoreError::DuplicateBranch { .. })
    ));
    assert!(matches!(
        store.branch_create("bad name"),
        Err(StoreError::InvalidBranchName { .. })
    ));
    assert!(matches!(
        store.branch_create("main"),
        Err(StoreError::DuplicateBranch { .. })
    ));
}

#[test]
fn branch_create_does_not_move_head() {
    let (_dir, mut store) = new_store();
    let info = store.branch_create("feature").unwrap();
    assert!(!info.is_active);
    assert_eq!(store.head().unwrap().branch, "main");
    let mut names: Vec<String> = store
        .branch_list()
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    names.sort();
    assert_eq!(names, ["feature", "main"]);
}

#[test]
fn committing_on_feature_leaves_main_unchanged() {
    let (_dir, mut store) = new_store();
    let main_tip = store.head().unwrap().commit.unwrap();
    store.branch_create("feature").unwrap();
    store.checkout("feature").unwrap();
    write_log(&store, &[CUBE]);
    store.commit("cube on feature").unwrap();

    let main: Vec<_> = store
        .list_commits("main")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(main.len(), 1);
    assert_eq!(main[0].id, main_tip);
    assert_eq!(store.list_commits("feature").unwrap().count(), 2);
}

#[test]
fn checkout_materializes_branch_log() {
    let (_dir, mut store) = new_store();
    store.branch_create("feature").unwrap();
    write_log(&store, &[CUBE, CONE]);
    store.commit("two shapes").unwrap();

    store.checkout("feature").unwrap();
    let log = std::fs::read_to_string(store.layout().log_path()).unwrap();
    assert_eq!(log, scenelog::actionlog::empty_log());
    assert_eq!(store.head().unwrap().branch, "feature");

    store.checkout("main").unwrap();
    let log = std::fs::read_to_string(store.layout().log_path()).unwrap();
    assert!(log.contains(CONE));
}

#[test]
fn checkout_removes_tracked_file_absent_from_target() {
    let (_dir, mut store) = new_store();
    store.branch_create("bare").unwrap();
    std::fs::write(store.layout().snapshot_path(), b"{}").unwrap();
    store.commit("snapshot").unwrap();

    store.checkout("bare").unwrap();
    assert!(!store.layout().snapshot_path().exists());
}

#[test]
fn checkout_unknown_branch() {
    let (_dir, mut store) = new_store();
    assert!(matches!(
        store.checkout("nope"),
        Err(StoreError::UnknownBranch { .. })
    ));
    assert!(matches!(
        store.list_commits("nope"),
        Err(StoreError::UnknownBranch { .. })
    ));
}

#[test]
fn resolve_commit_accepts_abbreviations() {
    let (_dir, store) = new_store();
    let head = store.head().unwrap().commit.unwrap();
    let hex = head.to_string();
    assert_eq!(store.resolve_commit(&hex).unwrap(), head);
    assert_eq!(store.resolve_commit(&hex[..7]).unwrap(), head);
    assert_eq!(store.resolve_commit(&hex[..4]).unwrap(), head);
    for bad in [&hex[..3], "zzzz", "main", ""] {
        assert!(
            matches!(store.resolve_commit(bad), Err(StoreError::UnknownCommit { .. })),
            "{bad:?} should not resolve"
        );
    }
}

#[test]
fn revert_is_non_destructive() {
    let (_dir, mut store) = new_store();
    write_log(&store, &[CUBE]);
    let a = store.commit("A").unwrap();
    write_log(&store, &[CUBE, CONE]);
    let b = store.commit("B").unwrap();

    let outcome = store.revert_to(&a.short()).unwrap();
    let RevertOutcome::Reverted {
        commit,
        target,
        previous_head,
    } = outcome
    else {
        panic!("expected a revert commit, got {outcome:?}");
    };
    assert_eq!(target, a);
    assert_eq!(previous_head, b);

    let commits: Vec<_> = store
        .list_commits("main")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let ids: Vec<_> = commits.iter().map(|c| c.id).collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(ids[0], commit);
    assert!(ids.contains(&a) && ids.contains(&b));
    assert_eq!(commits[0].message, format!("Reverted to commit: {}", a.short()));
    assert_eq!(commits[0].parent, Some(b));
    assert_eq!(
        store.commit_record(commit).unwrap().tree,
        store.commit_record(a).unwrap().tree
    );
    assert_eq!(store.read_log_at(commit).unwrap(), store.read_log_at(a).unwrap());
    assert_eq!(
        std::fs::read_to_string(store.layout().log_path()).unwrap(),
        store.read_log_at(a).unwrap()
    );
}

#[test]
fn revert_to_head_is_cancelled() {
    let (_dir, mut store) = new_store();
    let head = store.head().unwrap().commit.unwrap();
    assert_eq!(
        store.revert_to(&head.to_string()).unwrap(),
        RevertOutcome::Cancelled
    );
    assert_eq!(store.list_commits("main").unwrap().count(), 1);
}

#[test]
fn revert_to_unknown_commit() {
    let (_dir, mut store) = new_store();
    assert!(matches!(
        store.revert_to("deadbeef"),
        Err(StoreError::UnknownCommit { .. })
    ));
}

#[test]
fn commit_iterator_is_lazy_and_finite() {
    let (_dir, mut store) = new_store();
    for n in 0..3 {
        store.commit(&format!("c{n}")).unwrap();
    }
    let mut iter = store.list_commits("main").unwrap();
    assert_eq!(iter.next().unwrap().unwrap().message, "c2");
    assert_eq!(iter.by_ref().count(), 3);
    assert!(iter.next().is_none());
}

#[test]
fn identity_must_fit_a_signature_line() {
    assert!(identity().validate().is_ok());
    for (name, email) in [("", "a@e"), ("Ada\tL", "a@e"), ("Ada", "<a@e>"), ("Ada", "a@e\n")] {
        assert!(
            matches!(
                Identity::new(name, email).validate(),
                Err(StoreError::InvalidIdentity { .. })
            ),
            "{name:?} {email:?}"
        );
    }
}

#[test]
fn init_rejects_invalid_identity() {
    let (_dir, root) = project_root();
    let layout = ProjectLayout::new(&root, "scene", "blend");
    assert!(matches!(
        VersionStore::init(&layout, &Identity::new("Ada\nL", "a@e"), "main"),
        Err(StoreError::InvalidIdentity { field: "name", .. })
    ));
    assert!(!root.join(".git").exists());
}

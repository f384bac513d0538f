use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use gitplumb::object::encode;
use gitplumb::{ObjectId, ObjectType};
use tempfile::TempDir;

fn gitplumb(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gitplumb"))
        .args(args)
        .current_dir(dir)
        .env_remove("GIT_DIR")
        .env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .output()
        .expect("failed to run gitplumb")
}

fn stdout_of(dir: &Path, args: &[&str]) -> String {
    let output = gitplumb(dir, args);
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

fn init() -> TempDir {
    let tmp = TempDir::new().unwrap();
    stdout_of(tmp.path(), &["init"]);
    tmp
}

#[test]
fn hash_object_and_cat_file() {
    let tmp = init();
    fs::write(tmp.path().join("hello.txt"), "hi").unwrap();

    let id = stdout_of(tmp.path(), &["hash-object", "-w", "hello.txt"]);
    assert_eq!(id.trim(), "32f95c0d1244a78b2be1bab8de17906fabb2c4a8");
    assert!(
        tmp.path()
            .join(".git/objects/32/f95c0d1244a78b2be1bab8de17906fabb2c4a8")
            .is_file()
    );

    assert_eq!(stdout_of(tmp.path(), &["cat-file", "-p", id.trim()]), "hi");
    assert_eq!(stdout_of(tmp.path(), &["cat-file", "-t", "32f95c0"]), "blob\n");
    assert_eq!(stdout_of(tmp.path(), &["cat-file", "-s", "32f95c0"]), "2\n");
}

#[test]
fn hash_object_without_write_stores_nothing() {
    let tmp = init();
    fs::write(tmp.path().join("hello.txt"), "hi").unwrap();

    stdout_of(tmp.path(), &["hash-object", "hello.txt"]);
    assert!(!tmp.path().join(".git/objects/32").exists());
}

#[test]
fn hash_object_keeps_bytes_as_given() {
    let tmp = init();
    // Valid commit with a header this crate does not model
    let payload = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                   author A <a@b> 1 +0000\n\
                   committer A <a@b> 1 +0000\n\
                   encoding ISO-8859-1\n\
                   \n\
                   msg\n";
    fs::write(tmp.path().join("commit.txt"), payload).unwrap();
    let expected = ObjectId::hash(&encode(ObjectType::Commit, payload.as_bytes())).to_hex();

    let dry = stdout_of(tmp.path(), &["hash-object", "-t", "commit", "commit.txt"]);
    assert_eq!(dry.trim(), expected);

    let id = stdout_of(tmp.path(), &["hash-object", "-w", "-t", "commit", "commit.txt"]);
    assert_eq!(id.trim(), expected);
    assert_eq!(stdout_of(tmp.path(), &["cat-file", "-p", &expected]), payload);
}

#[test]
fn hash_object_rejects_malformed_commit() {
    let tmp = init();
    fs::write(tmp.path().join("bogus.txt"), "no tree here\n\nmsg\n").unwrap();

    let output = gitplumb(tmp.path(), &["hash-object", "-t", "commit", "bogus.txt"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("fatal: "));
}

#[test]
fn write_tree_then_ls_tree() {
    let tmp = init();
    fs::write(tmp.path().join("x.txt"), "hi").unwrap();
    fs::create_dir(tmp.path().join("sub")).unwrap();

    let root = stdout_of(tmp.path(), &["write-tree"]);
    let root = root.trim();

    assert_eq!(
        stdout_of(tmp.path(), &["ls-tree", "--name-only", root]),
        "sub\nx.txt\n"
    );
    assert_eq!(
        stdout_of(tmp.path(), &["ls-tree", root]),
        "040000 tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\tsub\n\
         100644 blob 32f95c0d1244a78b2be1bab8de17906fabb2c4a8\tx.txt\n"
    );

    // Unchanged worktree, unchanged id
    assert_eq!(stdout_of(tmp.path(), &["write-tree"]).trim(), root);
}

#[test]
fn commit_tree_links_parent() {
    let tmp = init();
    fs::write(tmp.path().join("a.txt"), "a").unwrap();
    let tree = stdout_of(tmp.path(), &["write-tree"]);
    let tree = tree.trim();

    let first = stdout_of(tmp.path(), &["commit-tree", tree, "-m", "first"]);
    let first = first.trim();
    let second = stdout_of(tmp.path(), &["commit-tree", tree, "-p", first, "-m", "second"]);

    let body = stdout_of(tmp.path(), &["cat-file", "-p", second.trim()]);
    let lines: Vec<_> = body.lines().collect();
    assert_eq!(lines[0], format!("tree {tree}"));
    assert_eq!(lines[1], format!("parent {first}"));
    assert!(lines[2].starts_with("author Test Author <test@example.com> "));
    assert!(body.ends_with("\n\nsecond\n"));
}

#[test]
fn commit_tree_rejects_non_tree() {
    let tmp = init();
    fs::write(tmp.path().join("a.txt"), "a").unwrap();
    let blob = stdout_of(tmp.path(), &["hash-object", "-w", "a.txt"]);

    let output = gitplumb(tmp.path(), &["commit-tree", blob.trim(), "-m", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("fatal: "));
}

#[test]
fn missing_object_fails_with_diagnostic() {
    let tmp = init();
    let output = gitplumb(
        tmp.path(),
        &["cat-file", "-p", "0000000000000000000000000000000000000000"],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("object not found"), "{stderr}");
}

#[test]
fn explicit_git_dir_outside_worktree() {
    let work = TempDir::new().unwrap();
    let store = TempDir::new().unwrap();
    let gitdir = store.path().join("db");
    let gitdir = gitdir.to_str().unwrap();

    stdout_of(work.path(), &["--git-dir", gitdir, "init"]);
    fs::write(work.path().join("f.txt"), "f").unwrap();

    let root = stdout_of(work.path(), &["--git-dir", gitdir, "write-tree"]);
    assert_eq!(
        stdout_of(work.path(), &["--git-dir", gitdir, "ls-tree", "--name-only", root.trim()]),
        "f.txt\n"
    );
}

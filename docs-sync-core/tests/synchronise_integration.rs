use std::fs;
use std::path::{Path, PathBuf};

use mockall::Sequence;
use tempfile::tempdir;

use docs_sync_core::config::{RemoteSource, SyncConfig};
use docs_sync_core::contract::{CommandOutput, GitCommand, MockCommandRunner};
use docs_sync_core::report::tree_digest;
use docs_sync_core::synchronise::synchronise;
use docs_sync_core::SyncError;

const UPSTREAM: &[(&str, &str)] = &[
    ("package.json", "{}"),
    ("docs/README.mdx", "# Docs"),
    ("docs/10-getting-started/01-install.mdx", "npm install"),
    ("docs/10-getting-started/02-project-structure.mdx", "layout"),
    ("docs/20-guides/index.mdx", "guides"),
    ("docs/20-guides/03-caching/01-overview.md", "cache"),
    ("examples/demo/page.tsx", "export default 1"),
];

fn config_in(root: &Path) -> SyncConfig {
    SyncConfig::new(
        RemoteSource {
            repo_url: "https://example.com/framework.git".into(),
            subtree_path: "docs".into(),
            reference: None,
        },
        root.join(".docs-cache"),
        root.join("content").join("docs"),
    )
}

fn write_files(root: &Path, files: &[(String, String)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn owned(files: &[(&str, &str)]) -> Vec<(String, String)> {
    files
        .iter()
        .map(|(p, c)| (p.to_string(), c.to_string()))
        .collect()
}

/// A runner whose `clone` materializes `files` in the target directory, and
/// whose other commands succeed without side effects.
fn fake_remote(files: &[(&str, &str)]) -> MockCommandRunner {
    let files = owned(files);
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(move |cmd: GitCommand| {
        if cmd.subcommand() == Some("clone") {
            let target = PathBuf::from(cmd.args.last().unwrap());
            assert!(!target.exists(), "clone target must not pre-exist");
            write_files(&target, &files);
        }
        Ok(CommandOutput::success())
    });
    runner
}

fn list_tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            out.push(
                path.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/"),
            );
            if entry.file_type().unwrap().is_dir() {
                walk(root, &path, out);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}

#[tokio::test]
async fn test_synchronise_publishes_normalized_subtree() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());
    let runner = fake_remote(UPSTREAM);

    let report = synchronise(&config, &runner)
        .await
        .expect("Synchronise should succeed");

    assert_eq!(
        list_tree(&config.dest_dir),
        vec![
            "README.mdx",
            "getting-started",
            "getting-started/install.mdx",
            "getting-started/project-structure.mdx",
            "guides",
            "guides/caching",
            "guides/caching/overview.md",
            "guides/index.mdx",
        ]
    );
    assert_eq!(
        fs::read_to_string(config.dest_dir.join("getting-started/install.mdx")).unwrap(),
        "npm install"
    );
    assert_eq!(report.files, 5);
    assert_eq!(report.directories, 3);
    // 10-getting-started, 01-install, 02-project-structure, 03-caching, 01-overview
    assert_eq!(report.renamed, 5);
    assert_eq!(report.digest, tree_digest(&config.dest_dir).unwrap());
    assert_eq!(report.destination, config.dest_dir);
}

#[tokio::test]
async fn test_synchronise_invokes_git_three_times_in_order() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());
    let files = owned(UPSTREAM);

    let mut runner = MockCommandRunner::new();
    let mut seq = Sequence::new();
    runner
        .expect_run()
        .withf(|cmd| cmd.subcommand() == Some("clone") && cmd.args.contains(&"--depth".to_string()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |cmd| {
            write_files(Path::new(cmd.args.last().unwrap()), &files);
            Ok(CommandOutput::success())
        });
    runner
        .expect_run()
        .withf(|cmd| cmd.subcommand() == Some("sparse-checkout") && cmd.args.last().unwrap() == "docs")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(CommandOutput::success()));
    runner
        .expect_run()
        .withf(|cmd| cmd.subcommand() == Some("checkout"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(CommandOutput::success()));

    synchronise(&config, &runner)
        .await
        .expect("Synchronise should succeed");
}

#[tokio::test]
async fn test_stale_cache_and_destination_do_not_leak() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());

    // Leftovers from an interrupted earlier run.
    write_files(
        &config.cache_dir,
        &owned(&[("docs/99-removed-upstream.mdx", "gone")]),
    );
    write_files(
        &config.dest_dir,
        &owned(&[("old-page.mdx", "stale"), ("getting-started/legacy.mdx", "stale")]),
    );

    let runner = fake_remote(UPSTREAM);
    synchronise(&config, &runner)
        .await
        .expect("Synchronise should succeed");

    let tree = list_tree(&config.dest_dir);
    assert!(!tree.iter().any(|p| p.contains("removed-upstream")), "{tree:?}");
    assert!(!tree.iter().any(|p| p.contains("old-page")), "{tree:?}");
    assert!(!tree.iter().any(|p| p.contains("legacy")), "{tree:?}");
}

#[tokio::test]
async fn test_clone_failure_leaves_destination_untouched() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());
    write_files(
        &config.dest_dir,
        &owned(&[("index.mdx", "published"), ("guides/a.mdx", "a")]),
    );
    let before = tree_digest(&config.dest_dir).unwrap();

    let mut runner = MockCommandRunner::new();
    runner.expect_run().times(1).returning(|cmd| {
        assert_eq!(cmd.subcommand(), Some("clone"));
        Ok(CommandOutput::failure(
            128,
            "fatal: unable to access 'https://example.com/framework.git/': Could not resolve host",
        ))
    });

    let err = synchronise(&config, &runner).await.unwrap_err();
    match err {
        SyncError::CommandFailed { command, status, stderr } => {
            assert!(command.starts_with("git clone"), "{command}");
            assert_eq!(status, 128);
            assert!(stderr.contains("Could not resolve host"));
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
    assert_eq!(tree_digest(&config.dest_dir).unwrap(), before);
    assert_eq!(list_tree(&config.dest_dir), vec!["guides", "guides/a.mdx", "index.mdx"]);
}

#[tokio::test]
async fn test_launch_failure_is_fatal() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());

    let mut runner = MockCommandRunner::new();
    runner.expect_run().times(1).returning(|cmd| {
        Err(SyncError::CommandLaunch {
            command: cmd.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "git not found"),
        })
    });

    let err = synchronise(&config, &runner).await.unwrap_err();
    assert!(matches!(err, SyncError::CommandLaunch { .. }));
    assert!(!config.dest_dir.exists());
}

#[tokio::test]
async fn test_checkout_failure_after_clone_is_fatal() {
    let tmp = tempdir().unwrap();
    let mut config = config_in(tmp.path());
    config.source.reference = Some("does-not-exist".into());
    let files = owned(UPSTREAM);

    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(move |cmd| match cmd.subcommand() {
        Some("clone") => {
            write_files(Path::new(cmd.args.last().unwrap()), &files);
            Ok(CommandOutput::success())
        }
        Some("checkout") => Ok(CommandOutput::failure(
            1,
            "error: pathspec 'does-not-exist' did not match",
        )),
        _ => Ok(CommandOutput::success()),
    });

    let err = synchronise(&config, &runner).await.unwrap_err();
    assert!(matches!(err, SyncError::CommandFailed { status: 1, .. }));
    assert!(!config.dest_dir.exists());
}

#[tokio::test]
async fn test_missing_subtree_is_reported() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());
    let runner = fake_remote(&[("package.json", "{}")]);

    let err = synchronise(&config, &runner).await.unwrap_err();
    match err {
        SyncError::SubtreeMissing { subtree, cache_dir } => {
            assert_eq!(subtree, "docs");
            assert_eq!(cache_dir, config.cache_dir);
        }
        other => panic!("expected SubtreeMissing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_collision_aborts_before_destination_changes() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());
    write_files(&config.dest_dir, &owned(&[("index.mdx", "published")]));
    let before = tree_digest(&config.dest_dir).unwrap();

    let runner = fake_remote(&[
        ("docs/01-intro.mdx", "one"),
        ("docs/02-intro.mdx", "two"),
    ]);

    let err = synchronise(&config, &runner).await.unwrap_err();
    match err {
        SyncError::NameCollision { name, first, second, .. } => {
            assert_eq!(name, "intro.mdx");
            assert_eq!(first, "01-intro.mdx");
            assert_eq!(second, "02-intro.mdx");
        }
        other => panic!("expected NameCollision, got {other:?}"),
    }
    assert_eq!(tree_digest(&config.dest_dir).unwrap(), before);
    // Plan failed before any rename ran.
    assert!(config.cache_dir.join("docs/01-intro.mdx").exists());
    assert!(config.cache_dir.join("docs/02-intro.mdx").exists());
}

#[tokio::test]
async fn test_two_runs_produce_identical_destinations() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());

    let first = synchronise(&config, &fake_remote(UPSTREAM)).await.unwrap();
    let tree_first = list_tree(&config.dest_dir);

    let second = synchronise(&config, &fake_remote(UPSTREAM)).await.unwrap();
    let tree_second = list_tree(&config.dest_dir);

    assert_eq!(first.digest, second.digest);
    assert_eq!(tree_first, tree_second);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_no_staging_directory_is_left_behind() {
    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());

    synchronise(&config, &fake_remote(UPSTREAM)).await.unwrap();

    let parent = config.dest_dir.parent().unwrap();
    let names: Vec<String> = fs::read_dir(parent)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["docs"]);
}

/// A runner whose `clone` calls `populate` on the target directory.
fn remote_with<F>(populate: F) -> MockCommandRunner
where
    F: Fn(&Path) + Send + 'static,
{
    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(move |cmd: GitCommand| {
        if cmd.subcommand() == Some("clone") {
            populate(Path::new(cmd.args.last().unwrap()));
        }
        Ok(CommandOutput::success())
    });
    runner
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlinks_are_published_without_being_traversed() {
    use std::os::unix::fs::symlink;

    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());
    let runner = remote_with(|target| {
        write_files(target, &owned(&[("docs/10-guide/01-intro.mdx", "intro")]));
        let docs = target.join("docs");
        symlink("10-guide", docs.join("02-current")).unwrap();
        symlink("../outside.mdx", docs.join("external.mdx")).unwrap();
        symlink(".", docs.join("loop")).unwrap();
    });

    let report = synchronise(&config, &runner)
        .await
        .expect("Trees with symlinks should publish");

    assert_eq!(
        list_tree(&config.dest_dir),
        vec!["current", "external.mdx", "guide", "guide/intro.mdx", "loop"]
    );
    // Link targets are copied verbatim; only the link's own name is normalized.
    assert_eq!(
        fs::read_link(config.dest_dir.join("current")).unwrap(),
        PathBuf::from("10-guide")
    );
    assert_eq!(
        fs::read_link(config.dest_dir.join("loop")).unwrap(),
        PathBuf::from(".")
    );
    // 10-guide, 01-intro.mdx, 02-current; nothing reached through a link
    assert_eq!(report.renamed, 3);
    assert_eq!(report.files, 4);
    assert_eq!(report.directories, 1);
    assert_eq!(report.digest, tree_digest(&config.dest_dir).unwrap());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_non_utf8_names_are_published_unchanged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = tempdir().unwrap();
    let config = config_in(tmp.path());
    let odd = OsStr::from_bytes(b"01-caf\xe9.mdx");
    let runner = remote_with(move |target| {
        write_files(target, &owned(&[("docs/10-guide/01-intro.mdx", "intro")]));
        fs::write(target.join("docs").join(odd), "accent").unwrap();
    });

    let report = synchronise(&config, &runner)
        .await
        .expect("Non UTF-8 names should publish");

    assert_eq!(
        fs::read_to_string(config.dest_dir.join(odd)).unwrap(),
        "accent"
    );
    assert_eq!(
        fs::read_to_string(config.dest_dir.join("guide/intro.mdx")).unwrap(),
        "intro"
    );
    assert_eq!(report.renamed, 2);
    assert_eq!(report.files, 2);
    assert_eq!(report.digest, tree_digest(&config.dest_dir).unwrap());
}

mod common;

use asset_sweep_lib::{
    read_manifest, run_cleanup, AuditLog, CleanupRun, RenderFormat, Severity,
};
use chrono::Local;
use common::{read_log, ScriptedStore, SiteFixture};
use std::fs;

fn mixed_site() -> SiteFixture {
    let site = SiteFixture::new();
    site.file("index.php", b"<?php echo 'hi';");
    site.file("cache/thumb.png", b"cached");
    site.file("cache/nested/deeper.png", b"cached");
    site.file("images/logo.png", b"logo");
    site.file("images/old.png", b"old");
    site.reference("images/logo.png");
    site
}

#[test]
fn test_mixed_tree_active_run() {
    let site = mixed_site();
    let store = site.store();

    let mut run = CleanupRun::new(site.config(false), &store).unwrap();
    let summary = run.execute().unwrap();

    assert_eq!(summary.files_ignored_extension, 1);
    assert_eq!(summary.directories_skipped, 1);
    assert_eq!(summary.files_referenced, 1);
    assert_eq!(summary.orphans_found, 1);
    assert_eq!(summary.orphans_staged, 1);
    assert_eq!(summary.files_scanned, 3);
    assert_eq!(summary.bytes_staged, 3);
    assert_eq!(summary.orphans, vec!["images/old.png"]);

    let batch = site.batch_dir();
    assert_eq!(summary.staging_dir.as_deref(), Some(batch.as_path()));
    assert!(batch.join("old.png").is_file());
    assert!(!site.root.join("images/old.png").exists());
    assert!(site.root.join("images/logo.png").is_file());
    assert!(site.root.join("index.php").is_file());
    assert!(site.root.join("cache/thumb.png").is_file());
    assert!(site.root.join("cache/nested/deeper.png").is_file());

    let manifest = read_manifest(&batch).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest[0].original, "images/old.png");
    assert_eq!(manifest[0].staged_as, "old.png");
}

#[test]
fn test_ignored_directory_subtree_is_never_visited() {
    let site = mixed_site();
    let store = site.store();

    let mut config = site.config(true);
    config.verbose = true;
    let mut run = CleanupRun::new(config, &store).unwrap();
    run.execute().unwrap();

    for record in run.log().records() {
        assert!(
            !record.message.contains("thumb.png") && !record.message.contains("nested"),
            "ignored subtree leaked into the log: {}",
            record.message
        );
    }
    assert!(run
        .log()
        .records()
        .iter()
        .any(|r| r.message == "path [cache] is ignored. [skipped]"));
}

#[test]
fn test_dry_run_is_idempotent() {
    let site = mixed_site();
    site.file("images/icons/unused.svg", b"<svg/>");
    let store = site.store();

    let first = CleanupRun::new(site.config(true), &store)
        .unwrap()
        .execute()
        .unwrap();
    let second = CleanupRun::new(site.config(true), &store)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(first.orphans, vec!["images/old.png", "images/icons/unused.svg"]);
    assert_eq!(first.orphans, second.orphans);
    assert_eq!(second.orphans_staged, 0);
    assert!(!site.trash_dir().exists());
    assert_ne!(first.log_path, second.log_path);
}

#[test]
fn test_substring_reference_in_long_text() {
    let site = SiteFixture::new();
    site.file("images/banner.jpg", b"jpg");
    site.file("images/unused.jpg", b"jpg");
    site.page(r#"<p><img src="/images/banner.jpg" alt="banner"></p>"#);
    let store = site.store();

    let summary = CleanupRun::new(site.config(true), &store)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(summary.files_referenced, 1);
    assert_eq!(summary.orphans, vec!["images/unused.jpg"]);
}

#[test]
fn test_bounded_string_needs_exact_match() {
    let site = SiteFixture::new();
    site.file("images/logo.png", b"logo");
    site.reference("/images/logo.png?v=2");
    let store = site.store();

    let summary = CleanupRun::new(site.config(true), &store)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(summary.files_referenced, 0);
    assert_eq!(summary.orphans, vec!["images/logo.png"]);
}

#[test]
fn test_ignored_files_never_reach_the_store() {
    let site = SiteFixture::new();
    site.file("index.php", b"<?php");
    site.file("lib/helpers.php", b"<?php");
    site.file(".htaccess", b"Deny from all");
    site.file("images/.hidden.png", b"x");
    site.reference("index.php");
    site.reference(".htaccess");
    let real = site.store();
    let store = ScriptedStore::new(&real);

    let summary = CleanupRun::new(site.config(true), &store)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(store.calls(), 0);
    assert_eq!(summary.files_ignored_extension, 2);
    assert_eq!(summary.files_ignored_hidden, 2);
    assert_eq!(summary.files_referenced, 0);
    assert!(summary.orphans.is_empty());
}

#[test]
fn test_audit_log_is_persisted() {
    let site = mixed_site();

    let summary = run_cleanup(site.config(true)).unwrap();
    let log_path = summary.log_path.clone().unwrap();

    assert!(log_path.starts_with(site.log_dir()));
    let text = read_log(&log_path);
    assert!(text.contains("INFO: Cleanup started at:"));
    assert!(text.contains("NOTICE: Reading dir: ./"));
    assert!(text.contains("NOTICE: images/logo.png exists in table: media"));
    assert!(text.contains("NOTICE: File [images/old.png] was not found in database. [dry run, not moved]"));
    assert!(text.contains("WARNING: file extension ignored in [index.php]. [skipped]"));
    assert!(text.contains("Logs saved to:"));
    assert!(!text.contains("DEBUG"));
}

#[test]
fn test_verbose_run_records_queue_activity() {
    let site = mixed_site();
    let store = site.store();

    let mut config = site.config(true);
    config.verbose = true;
    let mut run = CleanupRun::with_log(config, &store, AuditLog::in_memory(true), Local::now()).unwrap();
    run.execute().unwrap();

    let debug: Vec<&str> = run
        .log()
        .records()
        .iter()
        .filter(|r| r.severity == Severity::Debug)
        .map(|r| r.message.as_str())
        .collect();
    assert!(debug.iter().any(|m| m.starts_with("Enqueued item:")));
    assert!(debug.iter().any(|m| m.starts_with("Dequeued item:")));
    assert!(debug.iter().any(|m| m.contains("Table counters has no text columns")));
    assert!(debug.iter().any(|m| *m == "images/old.png not found in table: media"));
}

#[test]
fn test_html_rendering_of_a_run() {
    let site = SiteFixture::new();
    site.file("a&b.png", b"x");
    let store = site.store();

    let mut run = CleanupRun::new(site.config(true), &store).unwrap();
    run.execute().unwrap();

    let html = run.render_log(RenderFormat::Html);
    assert!(html.starts_with("<pre>"));
    assert!(html.contains("File [a&amp;b.png] was not found in database."));
    assert!(!html.contains("[a&b.png]"));
}

#[test]
fn test_empty_root_completes() {
    let site = SiteFixture::new();
    let store = site.store();

    let summary = CleanupRun::new(site.config(false), &store)
        .unwrap()
        .execute()
        .unwrap();

    assert_eq!(summary.files_scanned, 0);
    assert_eq!(summary.directories_scanned, 1);
    assert!(summary.orphans.is_empty());
    assert!(fs::read_dir(site.batch_dir()).unwrap().all(|e| {
        e.unwrap().file_name() == ".staged.jsonl"
    }));
}

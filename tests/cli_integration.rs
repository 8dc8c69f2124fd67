//! CLI smoke tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("spinescan")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("quarantine"));
}

#[test]
fn info_reports_version() {
    Command::cargo_bin("spinescan")
        .unwrap()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("spinescan v"))
        .stdout(predicate::str::contains("Tesseract"));
}

#[test]
fn scan_missing_input_exits_with_input_code() {
    Command::cargo_bin("spinescan")
        .unwrap()
        .args(["scan", "/nonexistent/fotos"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn scan_dry_run_prints_plan() {
    let dir = tempfile::tempdir().unwrap();
    let img: image::GrayImage = image::ImageBuffer::from_pixel(150, 60, image::Luma([240u8]));
    img.save(dir.path().join("shelf.png")).unwrap();

    Command::cargo_bin("spinescan")
        .unwrap()
        .args(["scan", "--dry-run"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution Plan"))
        .stdout(predicate::str::contains("shelf.png"));
}

#[test]
fn cleanup_missing_export_fails() {
    Command::cargo_bin("spinescan")
        .unwrap()
        .args(["cleanup", "/nonexistent/export.csv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Export not found"));
}

#[test]
fn stats_reads_export() {
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("export.csv");
    std::fs::write(
        &export,
        "book_id,title,author,publisher,isbn10,isbn13,year,copy_id,signature,status,cover_local,cover_online\n\
         1,Die Blechtrommel,Günter Grass,dtv,,9783423135702,1959,10,SIG1,Erfasst,,\n",
    )
    .unwrap();

    Command::cargo_bin("spinescan")
        .unwrap()
        .arg("stats")
        .arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Books:            1"))
        .stdout(predicate::str::contains("With ISBN:        1"));
}

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fanout(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fanout").expect("fanout binary");
    cmd.env("HOME", home.path()).env("USERPROFILE", home.path());
    cmd
}

fn mkdirs(root: &TempDir, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|n| {
            let p = root.path().join(n);
            std::fs::create_dir_all(&p).unwrap();
            p.display().to_string()
        })
        .collect()
}

#[test]
fn init_writes_config_that_check_accepts() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let dirs = mkdirs(&work, &["src", "d1", "d2"]);

    fanout(&home)
        .args(["init", "--source", &dirs[0], "--dest", &dirs[1], "--dest", &dirs[2]])
        .args(["--delay", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 destination(s)"));

    assert!(home.path().join(".fanout/config.yaml").exists());

    let output = fanout(&home)
        .args(["check", "--json"])
        .output()
        .expect("run check");
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(report["destinations"].as_array().unwrap().len(), 2);
    assert_eq!(report["delay_secs"], 2);
    assert_eq!(report["max_attempts"], 3);
}

#[test]
fn init_rejects_missing_destination_and_writes_nothing() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let dirs = mkdirs(&work, &["src"]);
    let missing = work.path().join("nowhere").display().to_string();

    fanout(&home)
        .args(["init", "--source", &dirs[0], "--dest", &missing])
        .assert()
        .failure()
        .stderr(predicate::str::contains("destination directory does not exist"))
        .stderr(predicate::str::contains("nowhere"));

    assert!(!home.path().join(".fanout/config.yaml").exists());
}

#[test]
fn check_without_config_explains_how_to_create_one() {
    let home = TempDir::new().unwrap();
    fanout(&home)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("fanout init"));
}

#[test]
fn check_with_flags_ignores_blank_destinations() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let dirs = mkdirs(&work, &["src", "d1"]);

    fanout(&home)
        .args(["check", "--source", &dirs[0], "--dest", &dirs[1], "--dest", "  "])
        .assert()
        .success()
        .stdout(predicate::str::contains("destination 1"))
        .stdout(predicate::str::contains("destination 2").not());
}

#[test]
fn check_reports_each_problem_on_its_own_line() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let src = work.path().join("no-src").display().to_string();
    let d1 = work.path().join("no-d1").display().to_string();
    let d2 = work.path().join("no-d2").display().to_string();

    let output = fanout(&home)
        .args(["check", "--source", &src, "--dest", &d1, "--dest", &d2])
        .output()
        .expect("run check");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches('✗').count(), 3, "stderr={stderr}");
}

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn clean_removes_dependencies_and_state() {
  let env = TestEnv::new();
  env.dotrun_cmd().assert().success();
  env.write_file(".venv/bin/python3", "");

  env
    .dotrun_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Cleaned"));

  assert!(!env.project().join(".dotrun.json").exists());
  assert!(!env.project().join("node_modules").exists());
  assert!(!env.project().join(".venv").exists());
  assert_eq!(env.logged("run clean"), 0);
}

#[test]
fn clean_runs_clean_script_when_defined() {
  let env = TestEnv::with_manifest(r#"{"scripts": {"clean": "rm -rf dist"}}"#);

  env.dotrun_cmd().arg("clean").assert().success();

  assert_eq!(env.logged("run clean"), 1);
}

#[test]
fn clean_without_manifest_succeeds() {
  let env = TestEnv::new();
  std::fs::remove_file(env.project().join("package.json")).unwrap();
  env.write_file("node_modules/pkg/package.json", "{}");

  env.dotrun_cmd().arg("clean").assert().success();

  assert!(!env.project().join("node_modules").exists());
}

#[test]
fn clean_twice_is_harmless() {
  let env = TestEnv::new();

  env.dotrun_cmd().arg("clean").assert().success();
  env.dotrun_cmd().arg("clean").assert().success();
}

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn first_run_installs_second_run_skips() {
  let env = TestEnv::new();

  env.dotrun_cmd().assert().success();
  env
    .dotrun_cmd()
    .assert()
    .success()
    .stderr(predicate::str::contains("Node dependencies up to date"));

  assert_eq!(env.logged("install"), 1);
  assert_eq!(env.logged("run start"), 2);
}

#[test]
fn dependency_edit_reinstalls_once() {
  let env = TestEnv::new();

  env.dotrun_cmd().assert().success();
  assert_eq!(env.state()["node"]["dependencies"]["pkg"], "1.0.0");

  env.write_file("package.json", &super::common::PACKAGE_JSON.replace("1.0.0", "1.0.1"));
  env
    .dotrun_cmd()
    .assert()
    .success()
    .stderr(predicate::str::contains("Node dependencies have changed, reinstalling"));
  assert_eq!(env.state()["node"]["dependencies"]["pkg"], "1.0.1");
  assert_eq!(env.state()["node"]["installed_packages"]["pkg"], "1.0.1");

  env.dotrun_cmd().assert().success();
  assert_eq!(env.logged("install"), 2);
}

#[test]
fn skip_install_runs_script_only() {
  let env = TestEnv::new();

  env.dotrun_cmd().args(["-s", "test"]).assert().success();

  assert_eq!(env.logged("install"), 0);
  assert_eq!(env.logged("run test"), 1);
}

#[test]
fn script_arguments_are_forwarded() {
  let env = TestEnv::new();

  env.dotrun_cmd().args(["test", "--watch", "src"]).assert().success();

  assert_eq!(env.logged("run test --watch src"), 1);
}

#[test]
fn unknown_script_prints_usage_and_runs_nothing() {
  let env = TestEnv::new();

  env
    .dotrun_cmd()
    .arg("deploy")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("script `deploy` not found"))
    .stderr(predicate::str::contains("Usage"));

  assert!(!env.log_path().exists());
  assert!(!env.project().join(".dotrun.json").exists());
}

#[test]
fn script_exit_code_is_propagated() {
  let env = TestEnv::new();

  env.dotrun_cmd().arg("fail").env("FAIL_CODE", "5").assert().code(5);
}

#[test]
fn failed_install_exits_one() {
  let env = TestEnv::with_manifest(r#"{"scripts": {"start": "serve"}}"#);
  std::fs::write(env.temp.path().join("bin").join("yarn"), "#!/bin/sh\nexit 4\n").unwrap();

  env
    .dotrun_cmd()
    .assert()
    .code(1)
    .stderr(predicate::str::contains("dependency install failed"));
  assert!(!env.project().join(".dotrun.json").exists());
}

#[test]
fn env_files_and_overrides_take_precedence_in_order() {
  let env = TestEnv::new();
  env.write_file(".env", "PORT=2000\n");
  env.dotrun_cmd().env("PORT", "1000").args(["-s", "port"]).assert().success();
  assert_eq!(env.read_file("port.txt").trim(), "2000");

  env.write_file(".env.local", "PORT=3000\n");
  env.dotrun_cmd().args(["-s", "port"]).assert().success();
  assert_eq!(env.read_file("port.txt").trim(), "3000");

  env.dotrun_cmd().args(["-s", "-e", "PORT=4000", "port"]).assert().success();
  assert_eq!(env.read_file("port.txt").trim(), "4000");
}

#[test]
fn install_always_reinstalls() {
  let env = TestEnv::new();

  for _ in 0..2 {
    env
      .dotrun_cmd()
      .arg("install")
      .assert()
      .success()
      .stdout(predicate::str::contains("Node dependencies installed"))
      .stdout(predicate::str::contains("Python dependencies skipped"));
  }

  assert_eq!(env.logged("install"), 2);
  assert_eq!(env.logged("run start"), 0);

  // The forced install recorded state, so a normal run has nothing to do.
  env.dotrun_cmd().assert().success();
  assert_eq!(env.logged("install"), 2);
}

#[test]
fn exec_runs_command_without_installing() {
  let env = TestEnv::new();

  env
    .dotrun_cmd()
    .args(["-e", "PORT=7", "exec", "sh", "-c", "echo $PORT > exec.txt"])
    .assert()
    .success();

  assert_eq!(env.read_file("exec.txt").trim(), "7");
  assert_eq!(env.logged("install"), 0);
}

#[test]
fn exec_exit_code_is_propagated() {
  let env = TestEnv::new();

  env.dotrun_cmd().args(["exec", "sh", "-c", "exit 6"]).assert().code(6);
}

#[test]
fn directory_flag_selects_project() {
  let env = TestEnv::new();

  env
    .dotrun_cmd()
    .current_dir(env.temp.path())
    .args(["-C", "project", "test"])
    .assert()
    .success();

  assert_eq!(env.logged("run test"), 1);
  assert!(env.project().join(".dotrun.json").is_file());
}

use std::fs;
use std::os::unix::process::CommandExt;
use std::process::{Child, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill, killpg};
use nix::unistd::Pid;

use super::common::TestEnv;

const TIMEOUT: Duration = Duration::from_secs(20);

fn wait_until(mut ready: impl FnMut() -> bool) {
  let started = Instant::now();
  while !ready() {
    assert!(started.elapsed() < TIMEOUT, "timed out waiting for dotrun");
    thread::sleep(Duration::from_millis(50));
  }
}

fn wait_for_exit(child: &mut Child) -> ExitStatus {
  let started = Instant::now();
  loop {
    if let Some(status) = child.try_wait().unwrap() {
      return status;
    }
    if started.elapsed() > TIMEOUT {
      child.kill().unwrap();
      panic!("dotrun did not exit after the interrupt");
    }
    thread::sleep(Duration::from_millis(50));
  }
}

fn pid_is_running(pid: i32) -> bool {
  kill(Pid::from_raw(pid), None).is_ok()
}

/// Pid of the stub compose stack, once it has started.
fn compose_pid(env: &TestEnv) -> i32 {
  let read = || -> Option<i32> { fs::read_to_string(env.compose_pid_path()).ok()?.trim().parse().ok() };
  wait_until(|| read().is_some());
  read().unwrap()
}

#[test]
fn ctrl_c_during_script_stops_everything_and_exits_130() {
  let env = TestEnv::new().with_compose();

  // Own process group, so the interrupt reaches dotrun and its children
  // the way a terminal Ctrl-C does, and nothing else.
  let mut child = env
    .dotrun_process()
    .args(["-s", "serve"])
    .env("DOTRUN_DOCKER_COMPOSE_WAIT_SECONDS", "0")
    .process_group(0)
    .spawn()
    .unwrap();

  wait_until(|| env.logged("run serve") == 1);
  let stack = compose_pid(&env);
  assert!(pid_is_running(stack));

  killpg(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
  let status = wait_for_exit(&mut child);

  assert_eq!(status.code(), Some(130));
  assert!(!pid_is_running(stack));
}

#[test]
fn ctrl_c_while_waiting_for_services_skips_script() {
  let env = TestEnv::new().with_compose();

  let mut child = env
    .dotrun_process()
    .args(["-s", "serve"])
    .env("DOTRUN_DOCKER_COMPOSE_WAIT_SECONDS", "30")
    .spawn()
    .unwrap();

  let stack = compose_pid(&env);

  kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).unwrap();
  let status = wait_for_exit(&mut child);

  assert_eq!(status.code(), Some(130));
  assert_eq!(env.logged("run serve"), 0);
  assert!(!pid_is_running(stack));
}

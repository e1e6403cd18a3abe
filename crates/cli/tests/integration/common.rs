//! Shared test helpers for CLI integration tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::process;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Stub `yarn`: logs every call to `$STUB_LOG`.
///
/// `install` materialises `node_modules/pkg` at the version `package.json`
/// declares. `run fail` exits with `$FAIL_CODE`, `run port` writes `$PORT`
/// to `port.txt` and `run serve` blocks.
const YARN_STUB: &str = r#"#!/bin/sh
cmd="$1"; shift
case "$cmd" in
  install)
    echo install >> "$STUB_LOG"
    version=$(sed -n 's/.*"pkg": *"\([^"]*\)".*/\1/p' package.json | head -n 1)
    if [ -n "$version" ]; then
      mkdir -p node_modules/pkg
      printf '{"name": "pkg", "version": "%s"}\n' "$version" > node_modules/pkg/package.json
    fi
    ;;
  run)
    echo "run $*" >> "$STUB_LOG"
    case "$1" in
      fail) exit "${FAIL_CODE:-3}" ;;
      port) echo "$PORT" > port.txt ;;
      serve) exec sleep 30 ;;
    esac
    ;;
esac
"#;

/// Stub `docker-compose`: `up` writes its pid to `$COMPOSE_PID` and blocks,
/// ignoring SIGINT so only an explicit stop ends it.
const COMPOSE_STUB: &str = r#"#!/bin/sh
echo "compose $1" >> "$STUB_LOG"
if [ "$1" = "up" ]; then
  trap '' INT
  echo $$ > "$COMPOSE_PID"
  exec sleep 30
fi
"#;

/// Variables from the developer's shell that would change what the binary
/// does.
const SCRUBBED_VARS: [&str; 5] = [
  "RUST_LOG",
  "PORT",
  "DOTRUN_DOCKER_COMPOSE_BINARY",
  "DOTRUN_DOCKER_COMPOSE_ACTIONS",
  "DOTRUN_DOCKER_COMPOSE_WAIT_SECONDS",
];

pub const PACKAGE_JSON: &str = r#"{
  "scripts": {"start": "serve", "test": "jest", "fail": "exit 1", "port": "echo", "serve": "serve"},
  "dependencies": {"pkg": "1.0.0"}
}"#;

/// Isolated test environment.
///
/// Each test gets a temporary directory holding a `project/` with a
/// `package.json`, a `bin/` with the stub tools and the stub call log.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    Self::with_manifest(PACKAGE_JSON)
  }

  pub fn with_manifest(package_json: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self { temp };

    fs::create_dir_all(env.project()).unwrap();
    env.write_file("package.json", package_json);

    env.write_tool("yarn", YARN_STUB);
    env
  }

  /// Add the `docker-compose` stub and a compose file to the project.
  pub fn with_compose(self) -> Self {
    self.write_tool("docker-compose", COMPOSE_STUB);
    self.write_file("docker-compose.yml", "services: {}\n");
    self
  }

  fn write_tool(&self, name: &str, script: &str) {
    let bin = self.bin();
    fs::create_dir_all(&bin).unwrap();
    let path = bin.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
  }

  pub fn project(&self) -> PathBuf {
    self.temp.path().join("project")
  }

  fn bin(&self) -> PathBuf {
    self.temp.path().join("bin")
  }

  pub fn log_path(&self) -> PathBuf {
    self.temp.path().join("stub.log")
  }

  pub fn compose_pid_path(&self) -> PathBuf {
    self.temp.path().join("compose.pid")
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.project().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  pub fn read_file(&self, relative_path: &str) -> String {
    fs::read_to_string(self.project().join(relative_path)).unwrap()
  }

  /// Number of stub calls logged exactly as `line`.
  pub fn logged(&self, line: &str) -> usize {
    fs::read_to_string(self.log_path())
      .map(|log| log.lines().filter(|l| *l == line).count())
      .unwrap_or(0)
  }

  /// Parsed `.dotrun.json`.
  pub fn state(&self) -> serde_json::Value {
    serde_json::from_str(&self.read_file(".dotrun.json")).unwrap()
  }

  /// Get a pre-configured Command for the dotrun binary.
  ///
  /// Runs in the project directory with only the stub tools and the system
  /// directories on `PATH`.
  pub fn dotrun_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("dotrun");
    cmd.current_dir(self.project());
    cmd.envs(self.tool_env());
    for var in SCRUBBED_VARS {
      cmd.env_remove(var);
    }
    cmd
  }

  /// The dotrun binary as a plain process, for tests that need to signal it
  /// while it runs.
  pub fn dotrun_process(&self) -> process::Command {
    let mut cmd = process::Command::new(env!("CARGO_BIN_EXE_dotrun"));
    cmd.current_dir(self.project());
    cmd.envs(self.tool_env());
    for var in SCRUBBED_VARS {
      cmd.env_remove(var);
    }
    cmd
  }

  fn tool_env(&self) -> [(&'static str, String); 3] {
    [
      ("PATH", format!("{}:/usr/bin:/bin", self.bin().display())),
      ("STUB_LOG", self.log_path().display().to_string()),
      ("COMPOSE_PID", self.compose_pid_path().display().to_string()),
    ]
  }
}

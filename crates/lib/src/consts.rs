//! Fixed file and directory names used inside a project.

/// Persisted dependency snapshot, relative to the project root.
pub const STATE_FILENAME: &str = ".dotrun.json";

pub const PACKAGE_JSON: &str = "package.json";
pub const YARN_LOCK: &str = "yarn.lock";
pub const NODE_MODULES_DIR: &str = "node_modules";

pub const REQUIREMENTS_TXT: &str = "requirements.txt";
pub const VENV_DIR: &str = ".venv";

/// Dotenv files, lowest precedence first.
pub const DOTENV_FILES: [&str; 2] = [".env", ".env.local"];

pub const COMPOSE_FILES: [&str; 2] = ["docker-compose.yaml", "docker-compose.yml"];

/// Script run when no command is given.
pub const DEFAULT_SCRIPT: &str = "start";

/// Read buffer size for streaming file digests.
pub const HASH_CHUNK_SIZE: usize = 8192;

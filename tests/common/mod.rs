//! Shared test infrastructure for integration tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Mock LM that answers every prompt with a qualified record. Rows naming
/// `Beta` fail with a non-zero exit; rows naming `Gamma` get prose back.
pub const MOCK_LM: &str = r#"#!/bin/sh
prompt=$(cat)
if printf '%s' "$prompt" | grep -q 'Beta'; then
    echo "connection reset" >&2
    exit 1
fi
if printf '%s' "$prompt" | grep -q 'Gamma'; then
    echo "Desculpe, nao consegui avaliar esta empresa."
    exit 0
fi
cat <<'JSON'
```json
{"Empresa": null, "status_icp": "alto", "justificativa_curta": "Setor alvo"}
```
JSON
"#;

/// Isolated scratch directory with its own HOME so user config never leaks in.
pub struct Workspace {
    dir: TempDir,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub fn write_script(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.write(name, contents);
        let mut perms = fs::metadata(&path).expect("script metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod script");
        path
    }

    /// `leadq` with a clean environment rooted at this workspace.
    pub fn leadq(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_leadq"));
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env_remove("LEADQ_LM_COMMAND")
            .env_remove("GEMINI_API_KEY")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.leadq().args(args).output().expect("run leadq")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

//! runCommand：通过平台 shell 执行命令
//!
//! 成功时返回 stdout（stdout 为空则返回 stderr，二者皆空返回固定提示）；
//! 非零退出码时错误中带上捕获到的 stdout / stderr。执行带超时。

use std::path::PathBuf;
use std::time::Duration;

use tokio::process::Command;

use crate::tools::ProjectFs;

/// Shell 执行器
#[derive(Debug, Clone)]
pub struct ShellRunner {
    fs: ProjectFs,
    timeout: Duration,
}

impl ShellRunner {
    pub fn new(fs: ProjectFs, timeout_secs: u64) -> Self {
        Self {
            fs,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn working_dir(&self, cwd: Option<&str>) -> PathBuf {
        match cwd {
            Some(c) if !c.trim().is_empty() => self.fs.resolve(c),
            _ => self.fs.root().to_path_buf(),
        }
    }

    pub async fn run(&self, command: &str, cwd: Option<&str>) -> Result<String, String> {
        let dir = self.working_dir(cwd);
        tracing::info!(command = %command, cwd = %dir.display(), "runCommand");

        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.current_dir(&dir).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| format!("Command timed out after {}s", self.timeout.as_secs()))?
            .map_err(|e| format!("Command failed: {e}"))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let mut msg = format!("Command failed: {command} ({})", output.status);
            if !stdout.is_empty() {
                msg.push_str(&format!("\nStdout: {stdout}"));
            }
            if !stderr.is_empty() {
                msg.push_str(&format!("\nStderr: {stderr}"));
            }
            tracing::warn!(command = %command, status = %output.status, "command exited non-zero");
            return Err(msg);
        }
        if !stderr.is_empty() {
            tracing::debug!(stderr = %stderr.trim(), "command stderr");
        }

        Ok(if !stdout.is_empty() {
            stdout
        } else if !stderr.is_empty() {
            stderr
        } else {
            "Command executed successfully (no output).".to_string()
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn runner(dir: &std::path::Path) -> ShellRunner {
        ShellRunner::new(ProjectFs::new(dir), 10)
    }

    #[tokio::test]
    async fn test_stdout_then_stderr_then_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let sh = runner(dir.path());
        assert_eq!(sh.run("echo hi", None).await.unwrap(), "hi\n");
        assert_eq!(sh.run("echo oops 1>&2", None).await.unwrap(), "oops\n");
        assert_eq!(
            sh.run("true", None).await.unwrap(),
            "Command executed successfully (no output)."
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_includes_output() {
        let dir = tempfile::tempdir().unwrap();
        let err = runner(dir.path())
            .run("echo partial; echo broken 1>&2; exit 3", None)
            .await
            .unwrap_err();
        assert!(err.contains("Stdout: partial"));
        assert!(err.contains("Stderr: broken"));
    }

    #[tokio::test]
    async fn test_cwd_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/marker.txt"), "").unwrap();
        let out = runner(dir.path()).run("ls", Some("nested")).await.unwrap();
        assert_eq!(out.trim(), "marker.txt");
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let sh = ShellRunner::new(ProjectFs::new(dir.path()), 1);
        let err = sh.run("sleep 5", None).await.unwrap_err();
        assert!(err.contains("timed out"));
    }
}

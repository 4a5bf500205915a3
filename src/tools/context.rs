//! getContext：本地环境快照
//!
//! 只读本地文件系统与进程环境（不访问网络）：工作目录、项目清单（package.json / Cargo.toml）、
//! 包管理器、脚本、依赖名、是否有 tsconfig.json、git 状态、白名单环境变量与当前时间。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

/// git 仓库信息；非仓库时只有 is_repo = false
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GitContext {
    pub is_repo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectContext {
    pub cwd: String,
    pub project_name: Option<String>,
    pub user: String,
    pub platform: String,
    pub runtime_version: String,
    pub git: GitContext,
    pub package_manager: Option<String>,
    pub scripts: Option<Vec<String>>,
    pub dependencies: Option<Vec<String>>,
    pub has_ts_config: bool,
    pub env: BTreeMap<String, String>,
    pub date: String,
}

/// 环境快照生成器
#[derive(Debug, Clone)]
pub struct ContextProvider {
    root: PathBuf,
    env_whitelist: Vec<String>,
}

#[derive(Debug, Default)]
struct Manifest {
    name: Option<String>,
    package_manager: Option<String>,
    scripts: Option<Vec<String>>,
    dependencies: Option<Vec<String>>,
}

impl ContextProvider {
    pub fn new(root: impl AsRef<Path>, env_whitelist: Vec<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            env_whitelist,
        }
    }

    /// 同步采集（内部会执行 git 子进程）
    pub fn snapshot(&self) -> ProjectContext {
        let manifest = read_package_json(&self.root)
            .or_else(|| read_cargo_toml(&self.root))
            .unwrap_or_default();

        ProjectContext {
            cwd: self.root.display().to_string(),
            project_name: manifest.name,
            user: std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string()),
            platform: std::env::consts::OS.to_string(),
            runtime_version: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            git: git_context(&self.root),
            package_manager: manifest.package_manager,
            scripts: manifest.scripts,
            dependencies: manifest.dependencies,
            has_ts_config: self.root.join("tsconfig.json").exists(),
            env: self.whitelisted_env(),
            date: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn whitelisted_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("NODE_ENV".to_string(), "development".to_string());
        for key in &self.env_whitelist {
            if let Ok(v) = std::env::var(key) {
                env.insert(key.clone(), v);
            }
        }
        env
    }
}

fn read_package_json(root: &Path) -> Option<Manifest> {
    let raw = std::fs::read_to_string(root.join("package.json")).ok()?;
    let pkg: serde_json::Value = serde_json::from_str(&raw).ok()?;
    let keys = |field: &str| -> Option<Vec<String>> {
        pkg.get(field)
            .and_then(|v| v.as_object())
            .map(|o| o.keys().cloned().collect())
    };

    let mut deps = keys("dependencies").unwrap_or_default();
    deps.extend(keys("devDependencies").unwrap_or_default());

    let package_manager = [
        ("yarn.lock", "yarn"),
        ("pnpm-lock.yaml", "pnpm"),
        ("bun.lockb", "bun"),
        ("package-lock.json", "npm"),
    ]
    .into_iter()
    .find(|(lock, _)| root.join(lock).exists())
    .map(|(_, pm)| pm.to_string());

    Some(Manifest {
        name: pkg.get("name").and_then(|v| v.as_str()).map(String::from),
        package_manager,
        scripts: keys("scripts"),
        dependencies: Some(deps),
    })
}

fn read_cargo_toml(root: &Path) -> Option<Manifest> {
    let raw = std::fs::read_to_string(root.join("Cargo.toml")).ok()?;
    let doc: toml::Table = raw.parse().ok()?;
    let table_keys = |field: &str| -> Vec<String> {
        doc.get(field)
            .and_then(|v| v.as_table())
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    };
    let mut deps = table_keys("dependencies");
    deps.extend(table_keys("dev-dependencies"));

    Some(Manifest {
        name: doc
            .get("package")
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(String::from),
        package_manager: Some("cargo".to_string()),
        scripts: None,
        dependencies: Some(deps),
    })
}

fn git(root: &Path, args: &[&str]) -> Option<String> {
    let out = Command::new("git")
        .args(args)
        .current_dir(root)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
}

fn git_context(root: &Path) -> GitContext {
    if git(root, &["rev-parse", "--is-inside-work-tree"]).as_deref() != Some("true") {
        return GitContext::default();
    }
    let status = git(root, &["status", "--short"]).map(|s| {
        if s.is_empty() {
            "clean".to_string()
        } else {
            s
        }
    });
    GitContext {
        is_repo: true,
        branch: git(root, &["rev-parse", "--abbrev-ref", "HEAD"]),
        status,
        last_commit: git(root, &["log", "-1", "--pretty=format:%s"]),
    }
}

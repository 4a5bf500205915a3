//! 文件系统工具：readFile / writeFile / listFiles
//!
//! ProjectFs 绑定工作目录，相对路径按工作目录解析，绝对路径原样使用。

use std::path::{Path, PathBuf};

/// 以工作目录为基准的文件访问
#[derive(Debug, Clone)]
pub struct ProjectFs {
    root_dir: PathBuf,
}

impl ProjectFs {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root_dir.join(p)
        }
    }

    pub async fn read_file(&self, path: &str) -> Result<String, String> {
        let resolved = self.resolve(path);
        tracing::info!(path = %path, "readFile");
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| format!("Failed to read file {path}: {e}"))
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<String, String> {
        let resolved = self.resolve(path);
        tracing::info!(path = %path, bytes = content.len(), "writeFile");
        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| format!("Failed to write file {path}: {e}"))?;
        Ok("File written successfully.".to_string())
    }

    /// 目录项名称（含隐藏文件），按名称排序
    pub async fn list_files(&self, path: &str) -> Result<Vec<String>, String> {
        let resolved = self.resolve(path);
        tracing::info!(path = %path, "listFiles");
        let mut dir = tokio::fs::read_dir(&resolved)
            .await
            .map_err(|e| format!("Failed to list files: {e}"))?;
        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| format!("Failed to list files: {e}"))?
        {
            entries.push(entry.file_name().to_string_lossy().to_string());
        }
        entries.sort();
        Ok(entries)
    }
}

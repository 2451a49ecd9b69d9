use crate::models::job::Job;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载数据并转换为 Job 对象
pub async fn load_toml_to_job(toml_file_path: &Path) -> Result<Job> {
    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let job: Job = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    job.validate()
        .with_context(|| format!("任务格式无效: {}", toml_file_path.display()))?;

    Ok(job)
}

/// 从文件夹中加载所有 TOML 文件并转换为 Job 对象列表
pub async fn load_all_toml_files(folder_path: &str) -> Result<Vec<Job>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut jobs = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            tracing::info!(
                "正在加载: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            );

            match load_toml_to_job(&path).await {
                Ok(job) => {
                    tracing::info!("成功加载任务，起始 URL: {}", job.url);
                    jobs.push(job);
                }
                Err(e) => {
                    tracing::warn!("加载文件失败 {}: {}", path.display(), e);
                }
            }
        }
    }

    Ok(jobs)
}

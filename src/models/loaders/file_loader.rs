use crate::models::file_task::FileTask;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

/// 从文件夹中加载所有待处理文件
///
/// 不递归子目录；按文件名排序，保证编号和批次稳定
pub async fn load_all_files(folder_path: &str) -> Result<Vec<FileTask>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("读取文件信息失败 {}: {}", path.display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let is_hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(true);
        if is_hidden {
            continue;
        }
        paths.push((path, metadata.len()));
    }

    paths.sort_by(|a, b| a.0.cmp(&b.0));

    let tasks: Vec<FileTask> = paths
        .into_iter()
        .enumerate()
        .map(|(index, (path, size))| {
            tracing::info!(
                "正在加载: {} ({} 字节)",
                path.file_name().unwrap_or_default().to_string_lossy(),
                size
            );
            FileTask::from_path(index, path, size)
        })
        .collect();

    Ok(tasks)
}

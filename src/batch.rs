//! ファイル単位のハイライト抽出
//!
//! 1ファイルの失敗はバッチ全体を止めず、`error` 付きの `FileRecord` になる。

use crate::error::{Result, VibeError};
use crate::pdf;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use vibewriting_common::{extract_page_notes, group_notes, FileRecord};

/// 1ファイルを読み込んでノートとグループを作る
pub async fn extract_file(path: &Path) -> Result<FileRecord> {
    let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VibeError::FileNotFound(path.display().to_string()),
        _ => VibeError::Io(e),
    })?;

    let content = pdf::read_pdf(&data)?;
    let notes: Vec<_> = content.pages.iter().flat_map(extract_page_notes).collect();
    let groups = group_notes(&notes);

    tracing::debug!(
        path = %path.display(),
        pages = content.page_count,
        notes = notes.len(),
        groups = groups.len(),
        "extracted file"
    );

    Ok(FileRecord {
        path: path.display().to_string(),
        name: file_name(path),
        title: content.title,
        notes,
        groups,
        error: None,
    })
}

/// 入力順に1ファイルずつ処理する
pub async fn extract_files(paths: &[PathBuf], show_progress: bool) -> Vec<FileRecord> {
    let pb = if show_progress {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        pb.set_message(file_name(path));
        let record = match extract_file(path).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(path = %path.display(), "extraction failed: {}", e);
                FileRecord::failed(path.display().to_string(), file_name(path), e.to_string())
            }
        };
        records.push(record);
        pb.inc(1);
    }
    pb.finish_and_clear();

    records
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

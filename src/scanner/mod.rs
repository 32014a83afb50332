use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 拡張子が pdf か（大文字小文字を区別しない）
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// 指定パスをPDFファイルの一覧に展開
///
/// - フォルダは再帰的に探索（フォルダ内はファイル名順）
/// - 重複は最初の出現だけ残す
/// - 読めないパスは警告を出してスキップ
pub fn expand_pdf_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut pdfs = Vec::new();

    for path in paths {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "path does not exist, skipped");
            continue;
        }

        for entry in WalkDir::new(path).sort_by_file_name().into_iter() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let file = entry.path();
            if entry.file_type().is_file() && is_pdf(file) && seen.insert(file.to_path_buf()) {
                pdfs.push(file.to_path_buf());
            }
        }
    }

    tracing::debug!(count = pdfs.len(), "expanded input paths");
    pdfs
}

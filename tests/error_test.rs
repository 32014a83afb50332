//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use std::path::Path;
use tempfile::tempdir;
use vibewriting::error::VibeError;
use vibewriting::{batch, pdf, scanner};

/// 存在しないファイルを抽出した場合
#[tokio::test]
async fn test_extract_nonexistent_file() {
    let result = batch::extract_file(Path::new("/nonexistent/path/12345.pdf")).await;
    assert!(matches!(result, Err(VibeError::FileNotFound(_))));
}

/// PDFでないファイルを抽出した場合
#[tokio::test]
async fn test_extract_garbage_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("fake.pdf");
    std::fs::write(&path, "this is plain text").unwrap();

    let result = batch::extract_file(&path).await;
    assert!(matches!(result, Err(VibeError::Pdf(_))));
}

/// 空のPDFデータ
#[test]
fn test_read_empty_bytes() {
    assert!(matches!(pdf::read_pdf(&[]), Err(VibeError::Pdf(_))));
}

/// 空のフォルダを展開した場合
#[test]
fn test_expand_empty_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    assert!(scanner::expand_pdf_paths(&[dir.path().to_path_buf()]).is_empty());
}

/// VibeErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        VibeError::Config("テスト設定エラー".to_string()),
        VibeError::FileNotFound("test.pdf".to_string()),
        VibeError::Pdf("xref broken".to_string()),
        VibeError::ApiCall("API呼び出し失敗".to_string()),
        VibeError::ApiParse("不正なJSON".to_string()),
        VibeError::ChatBusy,
        VibeError::NoPdfsFound("フォルダ".to_string()),
        VibeError::CliExecution("claude".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// MissingApiKeyエラーのメッセージ確認
#[test]
fn test_missing_api_key_message() {
    let display = format!("{}", VibeError::MissingApiKey);
    assert!(display.contains("APIキー"));
    assert!(display.contains("vibewriting config"));
    assert!(display.contains("API_KEY"));
}

/// 共通ライブラリのエラーはそのまま表示される
#[test]
fn test_core_error_is_transparent() {
    let err: VibeError = vibewriting_common::Error::DraftChanged(2).into();
    assert_eq!(format!("{}", err), "Draft 2 changed since the proposal was made");
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: VibeError = io_err.into();
    assert!(matches!(err, VibeError::Io(_)));
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VibeError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`vibewriting config --set-api-key YOUR_KEY` または環境変数 API_KEY で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("PDF読み込みエラー: {0}")]
    Pdf(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("前のメッセージの応答を待っています")]
    ChatBusy,

    #[error("PDFファイルが見つかりません: {0}")]
    NoPdfsFound(String),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error(transparent)]
    Core(#[from] vibewriting_common::Error),
}

impl From<lopdf::Error> for VibeError {
    fn from(e: lopdf::Error) -> Self {
        VibeError::Pdf(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VibeError>;

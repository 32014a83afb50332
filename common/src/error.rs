//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The draft was edited after the proposal under review was computed.
    #[error("Draft {0} changed since the proposal was made")]
    DraftChanged(u32),

    #[error("Unknown draft: {0}")]
    UnknownDraft(u32),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

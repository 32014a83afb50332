use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vibewriting")]
#[command(about = "PDFハイライトとAIアシスタントによる執筆支援ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (openai/claude)
    #[arg(long, default_value = "openai", global = true)]
    pub ai_provider: AiProvider,
}

#[derive(Subcommand)]
pub enum Commands {
    /// PDFからハイライトを抽出してJSONを出力
    Extract {
        /// PDFファイルまたはフォルダ（フォルダは再帰的に探索）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 出力JSONファイル（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// グループを表示（JSONの代わりに読みやすい形式）
        #[arg(long)]
        summary: bool,
    },

    /// アシスタント応答の編集提案を下書きに適用
    Apply {
        /// 下書きファイル
        #[arg(required = true)]
        draft: PathBuf,

        /// 応答テキストファイル（```json ブロックを含む）
        #[arg(required = true)]
        reply: PathBuf,

        /// 出力先（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 却下するブロック番号（0始まり、複数指定可）
        #[arg(short, long, value_delimiter = ',')]
        reject: Vec<usize>,
    },

    /// 2つのテキストの差分ブロックを表示
    Diff {
        #[arg(required = true)]
        before: PathBuf,

        #[arg(required = true)]
        after: PathBuf,
    },

    /// 対話的な執筆セッション
    Write {
        /// 最初に読み込むPDFファイルまたはフォルダ
        paths: Vec<PathBuf>,

        /// 最初の下書きとして読み込むファイル
        #[arg(short, long)]
        draft: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// モデル名を設定
        #[arg(long)]
        set_model: Option<String>,

        /// APIのベースURLを設定
        #[arg(long)]
        set_base_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },

    /// セッションログ管理
    Log {
        /// ログを削除
        #[arg(long)]
        clear: bool,

        /// ログ情報を表示
        #[arg(long)]
        info: bool,
    },
}

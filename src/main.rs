use clap::Parser;
use tracing_subscriber::EnvFilter;
use vibewriting::{assistant, batch, cli, config, error, render, repl, scanner, session_log};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use session_log::SessionLog;
use vibewriting_common::{diff_lines, parse_reply, ParsedReply, Review};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Extract { paths, output, summary } => {
            let pdfs = scanner::expand_pdf_paths(&paths);
            if pdfs.is_empty() {
                let joined = paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
                return Err(error::VibeError::NoPdfsFound(joined));
            }
            eprintln!("📄 {}件のPDFを処理します", pdfs.len());

            let records = batch::extract_files(&pdfs, true).await;
            let failed = records.iter().filter(|r| r.error.is_some()).count();

            match SessionLog::from_config(&config).and_then(|log| log.record_extraction(&records)) {
                Ok(Some(path)) => tracing::debug!(path = %path.display(), "extraction logged"),
                Ok(None) => {}
                Err(e) => tracing::warn!("session log not written: {}", e),
            }

            if summary {
                for record in &records {
                    println!("{}", render::file_summary(record));
                }
            } else {
                let json = serde_json::to_string_pretty(&records)?;
                match output {
                    Some(path) => {
                        std::fs::write(&path, json)?;
                        eprintln!("✔ 結果を保存: {}", path.display());
                    }
                    None => println!("{}", json),
                }
            }

            if failed > 0 {
                eprintln!("⚠ {}件のファイルで抽出に失敗しました", failed);
            }
        }

        Commands::Apply { draft, reply, output, reject } => {
            let base = std::fs::read_to_string(&draft)?;
            let reply_text = std::fs::read_to_string(&reply)?;

            let proposal = match parse_reply(&reply_text) {
                ParsedReply::Proposal(proposal) => proposal,
                ParsedReply::NoProposal => {
                    eprintln!("編集提案が見つかりません（下書きは変更しません）");
                    return Ok(());
                }
            };

            let mut review = Review::new(0, &base, &proposal);
            for index in reject {
                if !review.reject(index) {
                    eprintln!("⚠ ブロック番号が範囲外です: {}", index);
                }
            }

            if let Some(notes) = review.notes() {
                eprintln!("📝 {}", notes);
            }
            for block in review.blocks() {
                eprint!("{}", render::block(block, review.is_accepted(block.index)));
            }
            eprintln!(
                "採用 {}/{} ブロック（操作 {}件中 {}件を認識）",
                review.accepted_count(),
                review.blocks().len(),
                proposal.operations.len(),
                proposal.recognized_count()
            );

            let merged = review.preview();
            match output {
                Some(path) => {
                    std::fs::write(&path, merged)?;
                    eprintln!("✔ 保存しました: {}", path.display());
                }
                None => print!("{}", merged),
            }
        }

        Commands::Diff { before, after } => {
            let before = std::fs::read_to_string(&before)?;
            let after = std::fs::read_to_string(&after)?;
            let review = Review::from_texts(0, &before, &after, None);

            if review.is_empty() {
                println!("差分はありません");
            } else {
                print!("{}", render::line_diff(&diff_lines(&before, &after)));
                println!();
                for block in review.blocks() {
                    print!("{}", render::block(block, true));
                }
            }
        }

        Commands::Write { paths, draft } => {
            let assistant = assistant::create_assistant(cli.ai_provider, &config)?;
            repl::run_session(&config, assistant, &paths, draft.as_deref()).await?;
        }

        Commands::Config { set_api_key, set_model, set_base_url, show } => {
            let mut config = config;
            let mut changed = false;

            if let Some(key) = set_api_key {
                config.api_key = Some(key);
                changed = true;
                println!("✔ APIキーを設定しました");
            }
            if let Some(model) = set_model {
                println!("✔ モデルを設定しました: {}", model);
                config.model = model;
                changed = true;
            }
            if let Some(url) = set_base_url {
                println!("✔ ベースURLを設定しました: {}", url);
                config.base_url = url;
                changed = true;
            }
            if changed {
                config.save()?;
            }

            if show || !changed {
                println!("設定:");
                println!("  ファイル: {}", Config::config_path()?.display());
                println!("  ベースURL: {}", config.base_url);
                println!("  モデル: {}", config.model);
                println!("  temperature: {}", config.temperature);
                println!("  max_tokens: {}", config.max_tokens);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!(
                    "  システムプロンプト: {}",
                    config
                        .system_prompt_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(組み込み)".into())
                );
                println!("  ログ: {}", if config.session_log { "有効" } else { "無効" });
                println!("  APIキー: {}", if config.api_key.is_some() { "設定済み" } else { "未設定" });
            }
        }

        Commands::Log { clear, info } => {
            let log = SessionLog::from_config(&config)?;

            if info || !clear {
                let stats = log.info()?;
                println!("セッションログ:");
                println!("  パス: {}", log.dir().display());
                println!("  件数: {}", stats.count);
                println!("  サイズ: {} bytes", stats.bytes);
            }

            if clear {
                let removed = log.clear()?;
                println!("✔ {}件のログを削除しました", removed);
            }
        }
    }

    Ok(())
}

//! セッションログ
//!
//! 抽出やチャット呼び出しごとに `<log_dir>/<timestamp>-<kind>.json` を1件書き出す。
//! 抽出レコードには内容のSHA-256フィンガープリントを付ける。

use crate::assistant::{CallOutcome, ChatMessage};
use crate::config::Config;
use crate::error::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use vibewriting_common::FileRecord;

const LOG_EXTENSION: &str = "json";

#[derive(Debug, Serialize)]
struct LogRecord<'a, T: Serialize> {
    kind: &'a str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    payload: &'a T,
}

/// チャット1回分の記録
#[derive(Debug, Serialize)]
pub struct ChatLogEntry<'a> {
    pub backend: &'a str,
    pub system_prompt: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    pub outcome: &'a CallOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogInfo {
    pub count: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct SessionLog {
    dir: PathBuf,
    enabled: bool,
}

impl SessionLog {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self { dir: dir.into(), enabled }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.log_dir()?, config.session_log))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_extraction(&self, records: &[FileRecord]) -> Result<Option<PathBuf>> {
        let fingerprint = fingerprint(records)?;
        self.write("extract", Some(fingerprint), &records)
    }

    pub fn record_chat(&self, entry: &ChatLogEntry<'_>) -> Result<Option<PathBuf>> {
        self.write("chat", None, entry)
    }

    /// 無効時は何も書かずに `None`
    fn write<T: Serialize>(&self, kind: &str, fingerprint: Option<String>, payload: &T) -> Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.dir)?;

        let now = chrono::Local::now();
        let stem = format!("{}-{}", now.format("%Y%m%d-%H%M%S%.3f"), kind);
        let (path, file) = self.create_unique(&stem)?;

        let record = LogRecord {
            kind,
            timestamp: now.to_rfc3339(),
            fingerprint,
            payload,
        };
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &record)?;

        tracing::debug!(path = %path.display(), "session log written");
        Ok(Some(path))
    }

    fn create_unique(&self, stem: &str) -> Result<(PathBuf, File)> {
        let mut suffix = 0;
        loop {
            let name = if suffix == 0 {
                format!("{}.{}", stem, LOG_EXTENSION)
            } else {
                format!("{}-{}.{}", stem, suffix, LOG_EXTENSION)
            };
            let path = self.dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn entries(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == LOG_EXTENSION).unwrap_or(false) {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    pub fn info(&self) -> Result<LogInfo> {
        let mut info = LogInfo::default();
        for path in self.entries()? {
            info.count += 1;
            info.bytes += std::fs::metadata(&path)?.len();
        }
        Ok(info)
    }

    /// 削除した件数を返す
    pub fn clear(&self) -> Result<usize> {
        let paths = self.entries()?;
        for path in &paths {
            std::fs::remove_file(path)?;
        }
        Ok(paths.len())
    }
}

/// 抽出結果のSHA-256（16進）
pub fn fingerprint(records: &[FileRecord]) -> Result<String> {
    let bytes = serde_json::to_vec(records)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::ChatReply;

    fn record(name: &str) -> FileRecord {
        FileRecord {
            path: format!("/papers/{}", name),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        let a = fingerprint(&[record("a.pdf")]).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint(&[record("a.pdf")]).unwrap());
        assert_ne!(a, fingerprint(&[record("b.pdf")]).unwrap());
    }

    #[test]
    fn test_record_extraction_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path().join("logs"), true);

        let path = log.record_extraction(&[record("a.pdf")]).unwrap().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("-extract.json"));

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["kind"], "extract");
        assert_eq!(value["payload"][0]["name"], "a.pdf");
        assert_eq!(value["fingerprint"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_record_chat_and_info_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path(), true);

        let messages = vec![ChatMessage::user("hi")];
        let outcome: CallOutcome = Ok::<_, crate::error::VibeError>(ChatReply {
            content: "hello".into(),
            usage: serde_json::Value::Null,
        })
        .into();
        let entry = ChatLogEntry {
            backend: "openai",
            system_prompt: Some("SYS"),
            messages: &messages,
            outcome: &outcome,
        };
        log.record_chat(&entry).unwrap();
        log.record_chat(&entry).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let info = log.info().unwrap();
        assert_eq!(info.count, 2);
        assert!(info.bytes > 0);

        assert_eq!(log.clear().unwrap(), 2);
        assert_eq!(log.info().unwrap(), LogInfo::default());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_disabled_log_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = SessionLog::new(dir.path().join("logs"), false);
        assert!(log.record_extraction(&[]).unwrap().is_none());
        assert!(!dir.path().join("logs").exists());
        assert_eq!(log.info().unwrap().count, 0);
    }
}

//! 纯文本提取器 - 基础设施层
//!
//! 只处理文本类文件（txt / md / html / xml / csv ...），
//! 二进制文件（pdf、docx 等）直接判为不支持。

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::ExtractionError;
use crate::infrastructure::TextExtractor;
use crate::models::{FileHandle, FileTask};

const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xml", "xhtml"];

/// 纯文本提取器
pub struct PlainTextExtractor {
    script_style: Regex,
    tag: Regex,
    inline_space: Regex,
    blank_lines: Regex,
}

impl PlainTextExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            script_style: Regex::new(r"(?is)<script\b.*?</script>|<style\b.*?</style>")?,
            tag: Regex::new(r"(?s)<[^>]*>")?,
            inline_space: Regex::new(r"[ \t\u{00A0}\u{3000}]+")?,
            blank_lines: Regex::new(r"\n{3,}")?,
        })
    }

    async fn read_bytes(&self, file: &FileTask) -> Result<Vec<u8>, ExtractionError> {
        match &file.handle {
            FileHandle::Path(path) => {
                tokio::fs::read(path)
                    .await
                    .map_err(|source| ExtractionError::ReadFailed {
                        path: path.display().to_string(),
                        source,
                    })
            }
            FileHandle::Bytes(bytes) => Ok(bytes.to_vec()),
        }
    }

    /// 把原始字节转换为规范化文本
    pub fn to_plain_text(
        &self,
        name: &str,
        ext: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, ExtractionError> {
        let unsupported = || ExtractionError::UnsupportedFormat {
            name: name.to_string(),
        };

        if bytes.contains(&0) {
            return Err(unsupported());
        }
        let raw = std::str::from_utf8(bytes).map_err(|_| unsupported())?;
        let raw = raw.trim_start_matches('\u{FEFF}').replace("\r\n", "\n");

        let text = if ext.map(|e| MARKUP_EXTENSIONS.contains(&e)).unwrap_or(false) {
            self.strip_markup(&raw)
        } else {
            raw
        };

        let text = self.normalize_whitespace(&text);
        if text.is_empty() {
            return Err(ExtractionError::EmptyText {
                name: name.to_string(),
            });
        }
        Ok(text)
    }

    fn strip_markup(&self, raw: &str) -> String {
        let without_blocks = self.script_style.replace_all(raw, " ");
        let without_tags = self.tag.replace_all(&without_blocks, " ");
        without_tags
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&amp;", "&")
    }

    fn normalize_whitespace(&self, text: &str) -> String {
        let lines: Vec<String> = text
            .lines()
            .map(|line| self.inline_space.replace_all(line, " ").trim().to_string())
            .collect();
        let joined = lines.join("\n");
        self.blank_lines
            .replace_all(&joined, "\n\n")
            .trim()
            .to_string()
    }
}

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, file: &FileTask) -> Result<String> {
        let bytes = self.read_bytes(file).await?;
        let ext = file.extension();
        let text = self.to_plain_text(&file.display_name, ext.as_deref(), &bytes)?;
        debug!("提取完成: {} -> {} 字符", file.display_name, text.chars().count());
        Ok(text)
    }
}

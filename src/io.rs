use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::debug;

use crate::encoding::RawDocument;
use crate::ImportResult;

#[derive(Debug, Clone, Default)]
pub struct UploadMeta {
    /// e.g. "application/gzip" or "text/csv"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// original file name (used for extension fallback)
    pub name_hint: String,
}

impl UploadMeta {
    pub fn is_gzip(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || self.name_hint.ends_with(".gz")
    }

    pub fn is_zstd(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "zstd")
            || self.content_type.eq_ignore_ascii_case("application/zstd")
            || self.name_hint.ends_with(".zst")
    }

    /// Whether the name looks like a CSV file, compressed or not.
    pub fn has_csv_name(&self) -> bool {
        let name = self.name_hint.to_ascii_lowercase();
        let name = name
            .strip_suffix(".gz")
            .or_else(|| name.strip_suffix(".zst"))
            .unwrap_or(name.as_str());
        name.ends_with(".csv")
    }
}

/// Wrap `raw` with the decompression the meta calls for.
pub fn build_upload_reader<R>(raw: R, meta: &UploadMeta) -> Box<dyn AsyncRead + Unpin + Send>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = BufReader::with_capacity(1 << 16, raw);
    if meta.is_gzip() {
        Box::new(GzipDecoder::new(buf))
    } else if meta.is_zstd() {
        Box::new(ZstdDecoder::new(buf))
    } else {
        Box::new(buf)
    }
}

/// Buffer a whole upload in memory and classify its encoding.
pub async fn read_upload<R>(raw: R, meta: &UploadMeta) -> ImportResult<RawDocument>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = build_upload_reader(raw, meta);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;

    let doc = RawDocument::new(bytes);
    debug!(bytes = doc.len(), encoding = %doc.encoding(), name = %meta.name_hint, "upload buffered");
    Ok(doc)
}

/// Read a local file, inferring compression from its extension.
pub async fn upload_from_path(path: &Path) -> ImportResult<(RawDocument, UploadMeta)> {
    let file = File::open(path).await?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut meta = UploadMeta {
        name_hint: name,
        ..Default::default()
    };

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match ext {
        "gz" => {
            meta.content_type = "application/gzip".into();
            meta.content_encoding = "gzip".into();
        }
        "zst" => {
            meta.content_type = "application/zstd".into();
            meta.content_encoding = "zstd".into();
        }
        _ => {
            meta.content_type = "text/csv".into();
        }
    }

    let doc = read_upload(file, &meta).await?;
    Ok((doc, meta))
}

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message;
use tokio::io::AsyncReadExt;
use tracefall_core::error::{Result, TracefallError};
use tracefall_core::model::span::RawSpan;
use tracing::debug;

use crate::columns::adapt_batch;
use crate::json::parse_json_batch;
use crate::otlp::decode_request;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Path that reads from standard input.
pub const STDIN_PATH: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Otlp,
}

impl SourceFormat {
    /// Pick a format from the extension, ignoring a trailing `.gz`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        let ext = Path::new(name).extension()?.to_str()?;
        match ext {
            "json" => Some(Self::Json),
            "pb" | "binpb" | "otlp" => Some(Self::Otlp),
            _ => None,
        }
    }

    /// JSON documents start with `[` or `{`; anything else is treated as
    /// protobuf.
    pub fn sniff(bytes: &[u8]) -> Self {
        match bytes.iter().copied().find(|b| !b.is_ascii_whitespace()) {
            Some(b'[' | b'{') => Self::Json,
            _ => Self::Otlp,
        }
    }
}

/// Read spans from a file, or stdin for `-`.
pub async fn load_spans(path: &Path) -> Result<Vec<RawSpan>> {
    let bytes = if path.as_os_str() == STDIN_PATH {
        let mut buf = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .map_err(|e| TracefallError::Io(format!("failed to read stdin: {e}")))?;
        buf
    } else {
        tokio::fs::read(path)
            .await
            .map_err(|e| TracefallError::Io(format!("failed to read {}: {e}", path.display())))?
    };
    let spans = decode_bytes(&bytes, SourceFormat::from_path(path))?;
    debug!(path = %path.display(), spans = spans.len(), "span source loaded");
    Ok(spans)
}

/// Decode an in-memory source. Gzip input is detected by its magic bytes.
pub fn decode_bytes(bytes: &[u8], format: Option<SourceFormat>) -> Result<Vec<RawSpan>> {
    let inflated;
    let bytes = if bytes.starts_with(&GZIP_MAGIC) {
        inflated = gunzip(bytes)?;
        inflated.as_slice()
    } else {
        bytes
    };

    match format.unwrap_or_else(|| SourceFormat::sniff(bytes)) {
        SourceFormat::Json => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| TracefallError::Parse(format!("JSON source is not UTF-8: {e}")))?;
            Ok(adapt_batch(&parse_json_batch(text)?))
        }
        SourceFormat::Otlp => {
            let req = ExportTraceServiceRequest::decode(bytes)
                .map_err(|e| TracefallError::Parse(format!("invalid OTLP trace export: {e}")))?;
            Ok(decode_request(&req))
        }
    }
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| TracefallError::Io(format!("gzip decode failed: {e}")))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use testkit::{sample_otlp_bytes, sample_rows_json};

    use super::*;

    #[test]
    fn detects_format_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("trace.json")),
            Some(SourceFormat::Json)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("dump/trace.BINPB.gz")),
            Some(SourceFormat::Otlp)
        );
        assert_eq!(SourceFormat::from_path(Path::new("trace.gz")), None);
        assert_eq!(SourceFormat::from_path(Path::new("-")), None);
        assert_eq!(SourceFormat::sniff(b"  [ ]"), SourceFormat::Json);
    }

    #[tokio::test]
    async fn loads_gzipped_otlp_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("trace.pb.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&sample_otlp_bytes())?;
        std::fs::write(&path, encoder.finish()?)?;

        let spans = load_spans(&path).await?;
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].service_name, "checkout");
        Ok(())
    }

    #[tokio::test]
    async fn loads_json_rows_without_extension() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("export");
        std::fs::write(&path, sample_rows_json("t1"))?;

        let spans = load_spans(&path).await?;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].span_id, "root");
        assert_eq!(spans[0].parent_span_id, None);
        assert_eq!(spans[2].parent_span_id.as_deref(), Some("root"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let err = load_spans(Path::new("/nonexistent/trace.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, TracefallError::Io(_)));
    }

    #[test]
    fn json_without_required_columns_is_empty() {
        let spans = decode_bytes(br#"[{"span_id":"a"}]"#, None).unwrap();
        assert!(spans.is_empty());
        assert!(decode_bytes(b"\x0a\xff\xff", Some(SourceFormat::Otlp)).is_err());
    }
}

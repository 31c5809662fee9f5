//! Turning a file on disk into a `ByteSource`.
//!
//! A file becomes one block per `--split` segment (`seg0`, `seg1`, ...)
//! with addresses starting at the layout base, so split points show up as
//! separator rows in the viewer.

use std::fs;
use std::io::{Cursor, Read};
use std::ops::Range;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::Context;
use byteview::{ByteSource, MemoryBlockSet, MemoryByteBlock, MemorySource, SourceResolver};
use flate2::read::GzDecoder;
use num_bigint::BigUint;
use tracing::{debug, warn};

/// Helper: read bytes from a path, automatically handling `.gz` or a gzip header.
pub fn load_bytes_from_path(path: &Path) -> anyhow::Result<Vec<u8>> {
    let data =
        fs::read(path).with_context(|| format!("failed to read file: {}", path.display()))?;
    decode_bytes(path, data)
}

/// Decompress `data` when the extension or the header (0x1f 0x8b) says gzip.
fn decode_bytes(path: &Path, data: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    let is_gzip = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
        || (data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b);

    if is_gzip {
        let mut decoder = GzDecoder::new(Cursor::new(data));
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .context("gzip decompression failed")?;
        Ok(out)
    } else {
        Ok(data)
    }
}

/// Parse `0x`-prefixed hexadecimal or plain decimal.
pub fn parse_number(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number {s:?}: {e}"))
}

/// `START:LEN` range of file offsets to mark uninitialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninitRange(pub Range<usize>);

impl FromStr for UninitRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, len) = s
            .split_once(':')
            .ok_or_else(|| format!("expected START:LEN, got {s:?}"))?;
        let start = parse_number(start)?;
        let len = parse_number(len)?;
        Ok(Self(start..start.saturating_add(len)))
    }
}

/// How a flat file is cut into blocks.
#[derive(Debug, Clone, Default)]
pub struct ImageLayout {
    /// Address of file offset 0.
    pub base: usize,
    /// File offsets where a new block starts.
    pub splits: Vec<usize>,
    pub uninit: Vec<Range<usize>>,
}

impl ImageLayout {
    pub fn blocks(&self, bytes: &[u8]) -> Vec<MemoryByteBlock> {
        let mut cuts: Vec<usize> = self
            .splits
            .iter()
            .copied()
            .filter(|&s| s > 0 && s < bytes.len())
            .collect();
        cuts.sort_unstable();
        cuts.dedup();

        let mut bounds = vec![0];
        bounds.extend(cuts);
        bounds.push(bytes.len());

        bounds
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let (start, end) = (w[0], w[1]);
                let mut block = MemoryByteBlock::new(
                    format!("seg{i}"),
                    BigUint::from(self.base) + start,
                    bytes[start..end].to_vec(),
                );
                for r in &self.uninit {
                    let lo = r.start.max(start);
                    let hi = r.end.min(end);
                    if lo < hi {
                        block = block.with_uninitialized(lo - start..hi - start);
                    }
                }
                block
            })
            .collect()
    }
}

/// Open `path` as a source whose durable path is the canonical file path.
pub fn open_image(path: &Path, layout: &ImageLayout) -> anyhow::Result<Rc<dyn ByteSource>> {
    let bytes = load_bytes_from_path(path)?;
    let blocks = MemoryBlockSet::from_blocks(layout.blocks(&bytes));
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let durable = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned();
    debug!(path = %durable, len = bytes.len(), "opened image");
    Ok(Rc::new(MemorySource::new(name, Rc::new(blocks)).with_path(durable)))
}

/// Re-opens saved sources from disk with a fixed layout.
#[derive(Debug, Default)]
pub struct FileResolver {
    layout: ImageLayout,
}

impl FileResolver {
    pub fn new(layout: ImageLayout) -> Self {
        Self { layout }
    }
}

impl SourceResolver for FileResolver {
    fn resolve(&self, path: &str) -> Option<Rc<dyn ByteSource>> {
        match open_image(Path::new(path), &self.layout) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!(path, error = %e, "cannot reopen source");
                None
            }
        }
    }
}

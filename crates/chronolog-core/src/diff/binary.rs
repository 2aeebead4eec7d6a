//! Binary diff (spec.md §4.5).
//!
//! Produces a coarse structural report rather than a byte patch: whole-file
//! equality, a chunked diff for small files, and a similarity score.
//! Deliberately does not attempt any codec-aware comparison (image
//! dimensions, archive listings) -- that's presentation sugar the original
//! tool layered on top and spec.md `[FULL]` explicitly drops it here.

use sha2::{Digest as _, Sha256};

/// Size above which chunk-level comparison is skipped (too slow, too
/// noisy to be useful as a diff summary).
const CHUNK_SCAN_LIMIT: usize = 10 * 1024;
const CHUNK_SIZE: usize = 16;
const MAX_CHUNKS_REPORTED: usize = 20;
const SIMILARITY_WINDOW: usize = 1024;

/// One differing 16-byte-aligned chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDiff {
    pub offset: usize,
    pub old_hex: String,
    pub new_hex: String,
}

/// Summary of a binary comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryDiffReport {
    pub identical: bool,
    pub old_len: usize,
    pub new_len: usize,
    pub old_sha256: String,
    pub new_sha256: String,
    /// First [`MAX_CHUNKS_REPORTED`] differing 16-byte chunks, only
    /// populated when both sides are within [`CHUNK_SCAN_LIMIT`].
    pub chunks: Vec<ChunkDiff>,
    /// True when `chunks` was capped before every difference was found.
    pub chunks_truncated: bool,
    /// Fraction of matching bytes over the first [`SIMILARITY_WINDOW`]
    /// bytes of each side, scaled down by how different the overall
    /// lengths are. 1.0 means identical, 0.0 means nothing in common.
    pub similarity: f64,
    /// Best-effort MIME type guessed from the file extension, when a
    /// path was supplied.
    pub mime_type: Option<String>,
}

/// Compare two byte buffers as opaque binary content.
pub fn diff_binary(a: &[u8], b: &[u8], path: Option<&str>) -> BinaryDiffReport {
    let old_sha256 = hex::encode(Sha256::digest(a));
    let new_sha256 = hex::encode(Sha256::digest(b));
    let identical = old_sha256 == new_sha256;

    let (chunks, chunks_truncated) = if !identical && a.len() <= CHUNK_SCAN_LIMIT && b.len() <= CHUNK_SCAN_LIMIT {
        chunk_diff(a, b)
    } else {
        (Vec::new(), false)
    };

    BinaryDiffReport {
        identical,
        old_len: a.len(),
        new_len: b.len(),
        old_sha256,
        new_sha256,
        chunks,
        chunks_truncated,
        similarity: if identical { 1.0 } else { similarity(a, b) },
        mime_type: path.and_then(guess_mime_type),
    }
}

fn chunk_diff(a: &[u8], b: &[u8]) -> (Vec<ChunkDiff>, bool) {
    let max_len = a.len().max(b.len());
    let mut out = Vec::new();
    let mut truncated = false;

    let mut offset = 0;
    while offset < max_len {
        let end = (offset + CHUNK_SIZE).min(max_len);
        let a_chunk = a.get(offset..end.min(a.len())).unwrap_or(&[]);
        let b_chunk = b.get(offset..end.min(b.len())).unwrap_or(&[]);
        if a_chunk != b_chunk {
            if out.len() >= MAX_CHUNKS_REPORTED {
                truncated = true;
                break;
            }
            out.push(ChunkDiff {
                offset,
                old_hex: hex::encode(a_chunk),
                new_hex: hex::encode(b_chunk),
            });
        }
        offset += CHUNK_SIZE;
    }
    (out, truncated)
}

/// Byte-by-byte similarity over the first [`SIMILARITY_WINDOW`] bytes of
/// each side, scaled by how close the two lengths are -- files of very
/// different sizes can't be fully similar even if their shared prefix
/// matches exactly.
fn similarity(a: &[u8], b: &[u8]) -> f64 {
    let window = SIMILARITY_WINDOW.min(a.len()).min(b.len());
    let prefix_score = if window == 0 {
        if a.is_empty() && b.is_empty() { 1.0 } else { 0.0 }
    } else {
        let matches = a[..window].iter().zip(&b[..window]).filter(|(x, y)| x == y).count();
        matches as f64 / window as f64
    };

    let (short, long) = if a.len() <= b.len() { (a.len(), b.len()) } else { (b.len(), a.len()) };
    let size_ratio = if long == 0 { 1.0 } else { short as f64 / long as f64 };

    prefix_score * size_ratio
}

/// Best-effort MIME type guess from a file extension. Covers the common
/// cases a version-control front-end needs to decide how to render a
/// binary diff; anything unrecognized is `None` rather than a generic
/// fallback, so callers can distinguish "didn't know" from "octet-stream".
fn guess_mime_type(path: &str) -> Option<String> {
    let ext = path.rsplit('.').next()?.to_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        "exe" | "dll" => "application/x-msdownload",
        "so" => "application/x-sharedlib",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => return None,
    };
    Some(mime.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_report_identical_and_full_similarity() {
        let report = diff_binary(b"abcdef", b"abcdef", None);
        assert!(report.identical);
        assert_eq!(report.similarity, 1.0);
        assert!(report.chunks.is_empty());
    }

    #[test]
    fn single_byte_change_is_localized_to_one_chunk() {
        let mut a = vec![0u8; 32];
        let mut b = a.clone();
        b[20] = 0xFF;
        let report = diff_binary(&a, &b, None);
        assert!(!report.identical);
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].offset, 16);
        a[20] = 0xFF;
        assert_eq!(a, b);
    }

    #[test]
    fn large_files_skip_chunk_scan() {
        let a = vec![0u8; CHUNK_SCAN_LIMIT + 1];
        let mut b = a.clone();
        b[0] = 1;
        let report = diff_binary(&a, &b, None);
        assert!(report.chunks.is_empty());
        assert!(!report.chunks_truncated);
    }

    #[test]
    fn completely_different_content_has_low_similarity() {
        let a = vec![0u8; 2048];
        let b = vec![0xFFu8; 2048];
        let report = diff_binary(&a, &b, None);
        assert_eq!(report.similarity, 0.0);
    }

    #[test]
    fn mime_type_guessed_from_extension() {
        let report = diff_binary(b"\x89PNG", b"\x89PNG\x00", Some("logo.png"));
        assert_eq!(report.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn unknown_extension_has_no_mime_type() {
        let report = diff_binary(b"a", b"b", Some("data.bin"));
        assert_eq!(report.mime_type, None);
    }
}

//! ROOT compressed-block decoding.
//!
//! A compressed payload is a sequence of blocks, each with a 9-byte header:
//!
//! ```text
//! 0..2  algorithm tag: "ZL" zlib, "L4" lz4, "ZS" zstd, "XZ" xz
//! 2     method byte (unused here)
//! 3..6  compressed size, 24-bit little endian
//! 6..9  uncompressed size, 24-bit little endian
//! ```

use std::io::Read;

use super::error::{Result, RootError};

const HEADER_LEN: usize = 9;
/// LZ4 blocks carry an 8-byte xxhash64 checksum before the payload.
const LZ4_CHECKSUM_LEN: usize = 8;

pub(crate) fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut offset = 0;

    while out.len() < expected_len {
        let header = src.get(offset..offset + HEADER_LEN).ok_or_else(|| {
            RootError::Decompression(format!(
                "truncated block header at offset {offset} ({} of {expected_len} bytes decoded)",
                out.len()
            ))
        })?;
        let tag = [header[0], header[1]];
        let c_size = le24(&header[3..6]);
        let u_size = le24(&header[6..9]);
        offset += HEADER_LEN;

        let block = src.get(offset..offset + c_size).ok_or_else(|| {
            RootError::Decompression(format!(
                "block claims {c_size} bytes but only {} remain",
                src.len().saturating_sub(offset)
            ))
        })?;

        let decoded = match &tag {
            b"ZL" => zlib(block, u_size)?,
            b"L4" => lz4(block, u_size)?,
            b"ZS" => zstd(block, u_size)?,
            b"XZ" => xz(block, u_size)?,
            other => {
                return Err(RootError::Decompression(format!(
                    "unsupported compression algorithm '{}'",
                    String::from_utf8_lossy(other)
                )));
            }
        };
        if decoded.len() != u_size {
            return Err(RootError::Decompression(format!(
                "block decoded to {} bytes, header says {u_size}",
                decoded.len()
            )));
        }

        out.extend_from_slice(&decoded);
        offset += c_size;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "decoded {} bytes, expected {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}

fn zlib(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| RootError::Decompression(format!("zlib: {e}")))?;
    Ok(out)
}

fn lz4(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let payload = data
        .get(LZ4_CHECKSUM_LEN..)
        .ok_or_else(|| RootError::Decompression("lz4 block shorter than its checksum".into()))?;
    lz4_flex::block::decompress(payload, expected)
        .map_err(|e| RootError::Decompression(format!("lz4: {e}")))
}

fn zstd(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; expected];
    let mut decoder = ruzstd::decoding::FrameDecoder::new();
    let written = decoder
        .decode_all(data, &mut out)
        .map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
    out.truncate(written);
    Ok(out)
}

fn xz(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    lzma_rs::xz_decompress(&mut std::io::BufReader::new(data), &mut out)
        .map_err(|e| RootError::Decompression(format!("xz: {e}")))?;
    Ok(out)
}

fn le24(b: &[u8]) -> usize {
    usize::from(b[0]) | usize::from(b[1]) << 8 | usize::from(b[2]) << 16
}

/// Wrap `payload` in a single zlib block (used by tests that synthesize files).
#[cfg(test)]
pub(crate) fn zlib_block(payload: &[u8]) -> Vec<u8> {
    use std::io::Write;

    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(payload).expect("in-memory write");
    let compressed = enc.finish().expect("in-memory finish");

    let mut block = b"ZL\x08".to_vec();
    for len in [compressed.len(), payload.len()] {
        block.extend_from_slice(&(len as u32).to_le_bytes()[..3]);
    }
    block.extend_from_slice(&compressed);
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn le24_decodes_three_bytes() {
        assert_eq!(le24(&[0x10, 0x00, 0x00]), 16);
        assert_eq!(le24(&[0x00, 0x01, 0x00]), 256);
        assert_eq!(le24(&[0xff, 0xff, 0xff]), 0xff_ffff);
    }

    #[test]
    fn zlib_block_decodes() {
        let original = b"sidereal phase histogram payload, sidereal phase histogram payload";
        let block = zlib_block(original);
        assert_eq!(decompress(&block, original.len()).unwrap(), original);
    }

    #[test]
    fn lz4_block_skips_checksum() {
        let original = b"LZ4LZ4LZ4LZ4LZ4LZ4 ratio ratio ratio";
        let compressed = lz4_flex::block::compress(original);
        let mut block = b"L4\x01".to_vec();
        let c_len = compressed.len() + LZ4_CHECKSUM_LEN;
        block.extend_from_slice(&(c_len as u32).to_le_bytes()[..3]);
        block.extend_from_slice(&(original.len() as u32).to_le_bytes()[..3]);
        block.extend_from_slice(&[0u8; LZ4_CHECKSUM_LEN]);
        block.extend_from_slice(&compressed);
        assert_eq!(decompress(&block, original.len()).unwrap(), original);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let block = b"QQ\x00\x01\x00\x00\x01\x00\x00\x00".to_vec();
        let err = decompress(&block, 1).unwrap_err();
        assert!(err.to_string().contains("unsupported compression"));
    }

    #[test]
    fn truncated_input_is_an_error() {
        let block = zlib_block(b"abcdefgh");
        assert!(decompress(&block[..block.len() - 3], 8).is_err());
    }
}

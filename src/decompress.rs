//! zlib stream decoding for uploaded inventory documents.

use flate2::{Decompress, FlushDecompress, Status};
use tracing::debug;

use crate::error::{InventoryError, InventoryResult};

const MIN_CHUNK: usize = 4096;

/// Decompress a zlib (RFC 1950) wrapped DEFLATE stream.
///
/// The whole stream must be present; truncated or corrupt input fails with
/// [`InventoryError::Decode`] and no partial output is returned. Bytes after
/// the end of the stream are ignored.
pub fn decompress(input: &[u8]) -> InventoryResult<Vec<u8>> {
    let mut decoder = Decompress::new(true);
    let mut output = Vec::with_capacity(input.len().saturating_mul(4).max(MIN_CHUNK));

    loop {
        if output.len() == output.capacity() {
            output.reserve(output.capacity().max(MIN_CHUNK));
        }
        let read_before = consumed(&decoder, input.len());
        let written_before = output.len();

        let status = decoder
            .decompress_vec(&input[read_before..], &mut output, FlushDecompress::Finish)
            .map_err(|e| InventoryError::decode(format!("invalid zlib stream: {e}")))?;

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                let stalled = read_before == consumed(&decoder, input.len())
                    && written_before == output.len()
                    && output.len() < output.capacity();
                if stalled {
                    return Err(InventoryError::decode("unexpected end of zlib stream"));
                }
            }
        }
    }

    debug!(
        compressed_bytes = input.len(),
        decompressed_bytes = output.len(),
        "Decompressed inventory stream"
    );
    Ok(output)
}

fn consumed(decoder: &Decompress, limit: usize) -> usize {
    usize::try_from(decoder.total_in()).map_or(limit, |n| n.min(limit))
}

/// Check for a zlib header: deflate method, window size up to 32K and a
/// valid header checksum.
pub fn is_compressed(input: &[u8]) -> bool {
    match input {
        [cmf, flg, ..] => {
            cmf & 0x0F == 8 && cmf >> 4 <= 7 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0
        }
        _ => false,
    }
}

/// Return XML bytes for input that may or may not be compressed.
pub fn decode_if_compressed(input: &[u8]) -> InventoryResult<Vec<u8>> {
    if is_compressed(input) {
        decompress(input)
    } else {
        Ok(input.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decompress_round_trip() {
        let xml = b"<?xml version=\"1.0\"?><REQUEST><QUERY>INVENTORY</QUERY></REQUEST>";
        assert_eq!(decompress(&compress(xml)).unwrap(), xml.to_vec());
    }

    #[test]
    fn test_decompress_large_output_grows_buffer() {
        let data = vec![b'A'; 1 << 20];
        assert_eq!(decompress(&compress(&data)).unwrap().len(), 1 << 20);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = decompress(b"not a zlib stream").unwrap_err();
        assert!(matches!(err, InventoryError::Decode(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_truncated_stream_is_decode_error() {
        let compressed = compress(&vec![b'x'; 10_000]);
        let truncated = &compressed[..compressed.len() / 2];
        assert!(matches!(decompress(truncated), Err(InventoryError::Decode(_))));
        assert!(matches!(decompress(&[]), Err(InventoryError::Decode(_))));
    }

    #[test]
    fn test_header_sniffing() {
        assert!(is_compressed(&compress(b"<REQUEST/>")));
        assert!(!is_compressed(b"<?xml version=\"1.0\"?>"));
        assert!(!is_compressed(b"x"));
        assert_eq!(decode_if_compressed(b"<REQUEST/>").unwrap(), b"<REQUEST/>");
    }
}

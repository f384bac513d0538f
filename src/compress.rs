// zlib wrappers for object payloads

use std::io::Write;

use flate2::{Compression, Decompress, FlushDecompress, Status, write::ZlibEncoder};

use crate::error::{Error, Result};

const INFLATE_CHUNK: usize = 8 * 1024;

pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    compress_into(data, Vec::with_capacity(data.len() / 2))
}

fn compress_into<W: Write>(data: &[u8], sink: W) -> Result<W> {
    let mut encoder = ZlibEncoder::new(sink, Compression::default());
    encoder.write_all(data).map_err(Error::Compression)?;
    encoder.finish().map_err(Error::Compression)
}

/// Inflates a complete zlib stream.
///
/// A stream that runs out of input before its end marker is reported as
/// `CorruptData` rather than returning whatever was inflated so far.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut output = Vec::with_capacity(data.len() * 2);

    loop {
        output.reserve(INFLATE_CHUNK);
        let (in_before, out_before) = (inflater.total_in(), inflater.total_out());
        let remaining = &data[in_before as usize..];

        let status = inflater
            .decompress_vec(remaining, &mut output, FlushDecompress::Finish)
            .map_err(|e| Error::CorruptData(e.to_string()))?;

        if status == Status::StreamEnd {
            return Ok(output);
        }

        if inflater.total_in() == in_before && inflater.total_out() == out_before {
            return Err(Error::CorruptData(format!(
                "truncated zlib stream after {} bytes",
                in_before
            )));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_text_and_binary() {
        let samples: [&[u8]; 4] = [
            b"",
            b"hello world\n",
            &[0u8, 255, 0, 1, 2, 3, 0],
            &[b'x'; 100_000],
        ];
        for sample in samples {
            let packed = compress(sample).unwrap();
            assert_eq!(decompress(&packed).unwrap(), sample);
        }
    }

    #[derive(Debug)]
    struct FullSink;

    impl Write for FullSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::StorageFull.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn encoder_failure_is_not_corruption() {
        let err = compress_into(&[b'z'; 64 * 1024], FullSink).unwrap_err();
        assert!(matches!(
            err,
            Error::Compression(ref e) if e.kind() == std::io::ErrorKind::StorageFull
        ));
    }

    #[test]
    fn rejects_bad_header() {
        let err = decompress(b"definitely not zlib").unwrap_err();
        assert!(matches!(err, Error::CorruptData(_)));
    }

    #[test]
    fn rejects_truncated_stream() {
        let packed = compress(&[b'a'; 4096]).unwrap();
        let err = decompress(&packed[..packed.len() - 6]).unwrap_err();
        assert!(matches!(err, Error::CorruptData(_)));

        assert!(matches!(decompress(&[]), Err(Error::CorruptData(_))));
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut packed = compress(b"checksummed payload").unwrap();
        let last = packed.len() - 1;
        packed[last] ^= 0xff;
        assert!(matches!(decompress(&packed), Err(Error::CorruptData(_))));
    }
}

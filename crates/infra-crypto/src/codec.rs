// zstd / gzip stream codecs

use cryptq_core::domain::Scheme;
use cryptq_core::port::ProcessingError;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, BufRead, Write};

use crate::io::copy_stream;

const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];
const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];

/// Detected container format of compressed input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Codec {
    Zstd,
    Gzip,
}

impl Codec {
    pub fn for_scheme(scheme: &Scheme) -> Option<Self> {
        match scheme {
            Scheme::Zstd => Some(Codec::Zstd),
            Scheme::Gzip => Some(Codec::Gzip),
            _ => None,
        }
    }

    pub fn sniff(prefix: &[u8]) -> Option<Self> {
        if prefix.starts_with(ZSTD_MAGIC) {
            Some(Codec::Zstd)
        } else if prefix.starts_with(GZIP_MAGIC) {
            Some(Codec::Gzip)
        } else {
            None
        }
    }
}

fn corrupt_input(e: io::Error) -> ProcessingError {
    ProcessingError::StreamIo(format!("corrupt compressed stream: {}", e))
}

/// Compress `input` into `output`; returns uncompressed bytes consumed
pub(crate) fn compress<R: BufRead, W: Write>(
    codec: Codec,
    mut input: R,
    output: W,
    zstd_level: i32,
    gzip_level: u32,
    buffer_size: usize,
) -> Result<u64, ProcessingError> {
    match codec {
        Codec::Zstd => {
            let mut encoder = zstd::stream::write::Encoder::new(output, zstd_level)?;
            let n = copy_stream(&mut input, &mut encoder, buffer_size, ProcessingError::from)?;
            encoder.finish()?;
            Ok(n)
        }
        Codec::Gzip => {
            let mut encoder = GzEncoder::new(output, Compression::new(gzip_level));
            let n = copy_stream(&mut input, &mut encoder, buffer_size, ProcessingError::from)?;
            encoder.finish()?;
            Ok(n)
        }
    }
}

/// Decompress by sniffing the magic bytes; returns decompressed bytes written
pub(crate) fn decompress<R: BufRead, W: Write + ?Sized>(
    mut input: R,
    output: &mut W,
    buffer_size: usize,
) -> Result<u64, ProcessingError> {
    let codec = Codec::sniff(input.fill_buf()?).ok_or_else(|| {
        ProcessingError::StreamIo("input is neither zstd nor gzip".to_string())
    })?;
    match codec {
        Codec::Zstd => {
            let mut decoder = zstd::stream::read::Decoder::with_buffer(input)?;
            copy_stream(&mut decoder, output, buffer_size, corrupt_input)
        }
        Codec::Gzip => {
            let mut decoder = MultiGzDecoder::new(input);
            copy_stream(&mut decoder, output, buffer_size, corrupt_input)
        }
    }
}

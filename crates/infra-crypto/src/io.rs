// File plumbing shared by all transforms

use cryptq_core::port::ProcessingError;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Suffix of the in-progress output file
pub(crate) const PART_SUFFIX: &str = ".part";

/// Counts bytes pulled from the wrapped reader
#[derive(Debug)]
pub(crate) struct CountingReader<R> {
    inner: R,
    count: Arc<AtomicU64>,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> (Self, Arc<AtomicU64>) {
        let count = Arc::new(AtomicU64::new(0));
        (
            Self {
                inner,
                count: Arc::clone(&count),
            },
            count,
        )
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Counts bytes pushed into the wrapped writer
pub(crate) struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub(crate) type SourceReader = BufReader<CountingReader<File>>;
pub(crate) type PartWriter = CountingWriter<BufWriter<File>>;

/// Open the source file; the counter reports bytes read from disk
pub(crate) fn open_source(
    path: &Path,
    buffer_size: usize,
) -> Result<(SourceReader, Arc<AtomicU64>), ProcessingError> {
    let file = File::open(path).map_err(|e| {
        ProcessingError::StreamIo(format!("cannot open {}: {}", path.display(), e))
    })?;
    let (reader, count) = CountingReader::new(file);
    Ok((BufReader::with_capacity(buffer_size, reader), count))
}

pub(crate) fn part_path(final_path: &Path) -> PathBuf {
    let mut s = final_path.as_os_str().to_owned();
    s.push(PART_SUFFIX);
    PathBuf::from(s)
}

/// Write through `<final>.part` and rename on success.
///
/// On any error the partial file is removed, so `final_path` only ever holds
/// complete output. Returns the number of bytes written.
pub(crate) fn write_atomically<F>(final_path: &Path, body: F) -> Result<u64, ProcessingError>
where
    F: FnOnce(&mut PartWriter) -> Result<(), ProcessingError>,
{
    let part = part_path(final_path);
    let file = File::create(&part).map_err(|e| {
        ProcessingError::StreamIo(format!("cannot create {}: {}", part.display(), e))
    })?;
    let mut writer = CountingWriter::new(BufWriter::new(file));

    let result = body(&mut writer)
        .and_then(|_| finish(writer))
        .and_then(|written| {
            fs::rename(&part, final_path)?;
            Ok(written)
        });

    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn finish(mut writer: PartWriter) -> Result<u64, ProcessingError> {
    writer.flush()?;
    let written = writer.count();
    let file = writer
        .into_inner()
        .into_inner()
        .map_err(|e| ProcessingError::from(e.into_error()))?;
    file.sync_all()?;
    Ok(written)
}

/// Copy until EOF; read failures go through `on_read_error`, write failures are StreamIO
pub(crate) fn copy_stream<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
    on_read_error: fn(io::Error) -> ProcessingError,
) -> Result<u64, ProcessingError> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(on_read_error(e)),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

/// Fill `buf` as far as the reader allows; returns bytes read (< len only at EOF)
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_renames_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");

        let written = write_atomically(&target, |w| {
            w.write_all(b"hello")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(written, 5);
        assert_eq!(fs::read(&target).unwrap(), b"hello");
        assert!(!part_path(&target).exists());
    }

    #[test]
    fn test_failure_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");

        let err = write_atomically(&target, |w| {
            w.write_all(b"partial")?;
            Err(ProcessingError::DecryptionFailed("tag mismatch".to_string()))
        })
        .unwrap_err();

        assert_eq!(err.kind(), "DecryptionFailed");
        assert!(!target.exists());
        assert!(!part_path(&target).exists());
    }

    #[test]
    fn test_missing_directory_is_stream_io() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("out.bin");
        let err = write_atomically(&target, |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), "StreamIO");
    }

    #[test]
    fn test_read_full_stops_at_eof() {
        let mut src: &[u8] = b"abc";
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut src, &mut buf).unwrap(), 3);
        assert_eq!(read_full(&mut src, &mut buf).unwrap(), 0);
    }
}

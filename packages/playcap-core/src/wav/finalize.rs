use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{WavError, WavResult};
use crate::protocol_constants::{
    DATA_SIZE_OFFSET, RIFF_PREAMBLE_LEN, RIFF_SIZE_OFFSET, WAV_HEADER_LEN,
};

/// Patches the RIFF and data chunk sizes of a completed capture in place.
///
/// The total length `L` is taken from the target's end position. Two 4-byte
/// little-endian fields are overwritten and nothing else changes:
///
/// - offset 4: `L - 8`
/// - offset 40: `L - 44`
///
/// Returns the data payload size `L - 44`. A 44-byte target (no samples)
/// becomes a valid empty WAV with sizes 36 and 0. Running finalize again on an
/// unchanged target produces identical bytes.
///
/// The producer must have stopped and flushed before this is called.
///
/// # Errors
///
/// - [`WavError::IncompleteHeader`] if `L < 44`; nothing is written
/// - [`WavError::SizeOverflow`] if `L - 8` does not fit in 32 bits; nothing is written
/// - [`WavError::Io`] if seeking or writing fails
pub fn finalize_wav<T>(target: &mut T) -> WavResult<u32>
where
    T: Read + Write + Seek + ?Sized,
{
    let len = target.seek(SeekFrom::End(0))?;

    if len < WAV_HEADER_LEN as u64 {
        log::warn!("[Wav] Refusing to finalize {}-byte target: header incomplete", len);
        return Err(WavError::IncompleteHeader { len });
    }

    let riff_size =
        u32::try_from(len - RIFF_PREAMBLE_LEN).map_err(|_| WavError::SizeOverflow { len })?;
    // riff_size fits, so the smaller data size does too
    let data_size = riff_size - (WAV_HEADER_LEN as u32 - RIFF_PREAMBLE_LEN as u32);

    target.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
    target.write_all(&riff_size.to_le_bytes())?;

    target.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
    target.write_all(&data_size.to_le_bytes())?;

    target.flush()?;

    log::debug!(
        "[Wav] Finalized: total={} bytes, riff_size={}, data_size={}",
        len,
        riff_size,
        data_size
    );
    Ok(data_size)
}

/// Opens the file at `path` for read-modify-write and finalizes it.
///
/// # Errors
///
/// Returns [`WavError::Io`] if the file cannot be opened, plus every error of
/// [`finalize_wav`].
pub fn finalize_wav_file(path: impl AsRef<Path>) -> WavResult<u32> {
    let path = path.as_ref();
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let data_size = finalize_wav(&mut file)?;
    file.sync_all()?;
    log::info!(
        "[Wav] Finalized {} ({} data bytes)",
        path.display(),
        data_size
    );
    Ok(data_size)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::wav::{write_wav_header, AudioFormat, WavHeader, WavSink};

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    /// Builds an unfinalized capture with `data_len` bytes of a ramp pattern.
    fn capture(format: AudioFormat, data_len: usize) -> Cursor<Vec<u8>> {
        let mut bytes = Vec::new();
        write_wav_header(&mut bytes, &format).unwrap();
        bytes.extend((0..data_len).map(|i| (i % 251) as u8));
        Cursor::new(bytes)
    }

    mod size_fields {
        use super::*;

        #[test]
        fn sizes_match_total_length() {
            for data_len in [0usize, 4, 1000, 4096, 65_536] {
                let mut target = capture(AudioFormat::default(), data_len);
                finalize_wav(&mut target).unwrap();

                let bytes = target.into_inner();
                let len = bytes.len() as u32;
                assert_eq!(u32_at(&bytes, 4), len - 8, "riff size for {data_len}");
                assert_eq!(u32_at(&bytes, 40), len - 44, "data size for {data_len}");
            }
        }

        #[test]
        fn returns_data_payload_size() {
            let mut target = capture(AudioFormat::pcm16(16000, 2), 1000);
            assert_eq!(finalize_wav(&mut target).unwrap(), 1000);

            let bytes = target.into_inner();
            assert_eq!(u32_at(&bytes, 40), 1000);
            assert_eq!(u32_at(&bytes, 4), 1036);
        }

        #[test]
        fn only_size_fields_change() {
            let mut target = capture(AudioFormat::default(), 512);
            let before = target.get_ref().clone();
            finalize_wav(&mut target).unwrap();
            let after = target.into_inner();

            assert_eq!(before.len(), after.len());
            for (i, (a, b)) in before.iter().zip(after.iter()).enumerate() {
                if !(4..8).contains(&i) && !(40..44).contains(&i) {
                    assert_eq!(a, b, "byte {i} changed");
                }
            }
        }

        #[test]
        fn finalize_is_idempotent() {
            let mut target = capture(AudioFormat::default(), 777 * 4);
            finalize_wav(&mut target).unwrap();
            let first = target.get_ref().clone();

            finalize_wav(&mut target).unwrap();
            assert_eq!(&first, target.get_ref());
        }
    }

    mod boundaries {
        use super::*;

        #[test]
        fn header_only_target_is_valid_empty_wav() {
            let mut target = capture(AudioFormat::default(), 0);
            assert_eq!(finalize_wav(&mut target).unwrap(), 0);

            let bytes = target.into_inner();
            assert_eq!(u32_at(&bytes, 4), 36);
            assert_eq!(u32_at(&bytes, 40), 0);
        }

        #[test]
        fn short_target_fails_without_modification() {
            let full = capture(AudioFormat::default(), 0).into_inner();
            let truncated = full[..43].to_vec();
            let mut target = Cursor::new(truncated.clone());

            let err = finalize_wav(&mut target).unwrap_err();
            assert!(matches!(err, WavError::IncompleteHeader { len: 43 }));
            assert_eq!(target.into_inner(), truncated);
        }

        /// Target that reports a fixed length and records writes.
        struct OversizedTarget {
            len: u64,
            writes: usize,
        }

        impl Read for OversizedTarget {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Ok(0)
            }
        }

        impl Write for OversizedTarget {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.writes += 1;
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        impl Seek for OversizedTarget {
            fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
                Ok(match pos {
                    SeekFrom::End(_) => self.len,
                    SeekFrom::Start(offset) => offset,
                    SeekFrom::Current(_) => 0,
                })
            }
        }

        #[test]
        fn oversized_target_reports_overflow_without_writing() {
            let mut target = OversizedTarget {
                len: u32::MAX as u64 + 9,
                writes: 0,
            };
            let err = finalize_wav(&mut target).unwrap_err();
            assert!(matches!(err, WavError::SizeOverflow { .. }));
            assert_eq!(target.writes, 0);
        }

        #[test]
        fn largest_representable_target_succeeds() {
            let mut target = OversizedTarget {
                len: u32::MAX as u64 + 8,
                writes: 0,
            };
            assert_eq!(finalize_wav(&mut target).unwrap(), u32::MAX - 36);
            assert_eq!(target.writes, 2);
        }

        #[test]
        fn empty_target_fails() {
            let mut target = Cursor::new(Vec::new());
            assert!(matches!(
                finalize_wav(&mut target),
                Err(WavError::IncompleteHeader { len: 0 })
            ));
        }
    }

    mod scenario {
        use super::*;

        #[test]
        fn three_chunks_at_16khz_stereo() {
            let format = AudioFormat::pcm16(16000, 2);
            let mut sink = WavSink::create(Cursor::new(Vec::new()), format).unwrap();
            for _ in 0..3 {
                sink.append(&[0x5A; 4096]).unwrap();
            }
            let mut target = sink.into_inner().unwrap();

            let data_bytes = finalize_wav(&mut target).unwrap();
            let bytes = target.into_inner();

            assert_eq!(data_bytes, 12288);
            assert_eq!(u32_at(&bytes, 40), 12288);
            assert_eq!(u32_at(&bytes, 4), 12324);
            assert_eq!(bytes.len(), 12332);

            let duration = format.duration_secs(data_bytes as u64);
            assert!((duration - 0.192).abs() < 1e-9);

            let header = WavHeader::parse(&bytes).unwrap();
            assert!(header.is_finalized(bytes.len() as u64));
            assert_eq!(header.format, format);
        }
    }

    mod files {
        use super::*;
        use tempfile::TempDir;

        #[test]
        fn finalizes_file_on_disk() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("capture.wav");
            std::fs::write(&path, capture(AudioFormat::default(), 4096).into_inner()).unwrap();

            assert_eq!(finalize_wav_file(&path).unwrap(), 4096);

            let bytes = std::fs::read(&path).unwrap();
            assert_eq!(u32_at(&bytes, 4), 4096 + 36);
            assert_eq!(u32_at(&bytes, 40), 4096);
        }

        #[test]
        fn missing_file_is_io_error() {
            let temp_dir = TempDir::new().unwrap();
            let err = finalize_wav_file(temp_dir.path().join("missing.wav")).unwrap_err();
            assert!(matches!(err, WavError::Io(_)));
        }

        #[test]
        fn truncated_file_is_left_untouched() {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("aborted.wav");
            std::fs::write(&path, b"RIFF\0\0\0\0WAVE").unwrap();

            let err = finalize_wav_file(&path).unwrap_err();
            assert!(matches!(err, WavError::IncompleteHeader { len: 12 }));
            assert_eq!(std::fs::read(&path).unwrap(), b"RIFF\0\0\0\0WAVE");
        }
    }
}

use std::io::Write;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;

use super::AudioFormat;
use crate::error::{WavError, WavResult};
use crate::protocol_constants::{
    FMT_CHUNK_SIZE, RIFF_PREAMBLE_LEN, WAVE_FORMAT_PCM, WAV_HEADER_LEN,
};

/// Generates the 44-byte WAVE header for a capture whose length is not yet known.
///
/// Both the RIFF chunk size and the data chunk size are written as zero
/// placeholders; [`finalize_wav`](super::finalize_wav) patches them once the
/// producer has stopped. All numeric fields are little-endian.
///
/// # Errors
///
/// Returns [`WavError::InvalidFormat`] if `format` fails validation.
pub fn create_wav_header(format: &AudioFormat) -> WavResult<Bytes> {
    format.validate()?;

    let mut header = BytesMut::with_capacity(WAV_HEADER_LEN);

    // RIFF header
    header.put_slice(b"RIFF");
    header.put_u32_le(0); // File size - 8 (patched at finalize)
    header.put_slice(b"WAVE");

    // fmt chunk
    header.put_slice(b"fmt ");
    header.put_u32_le(FMT_CHUNK_SIZE);
    header.put_u16_le(WAVE_FORMAT_PCM);
    header.put_u16_le(format.channels);
    header.put_u32_le(format.sample_rate);
    header.put_u32_le(format.byte_rate());
    header.put_u16_le(format.block_align());
    header.put_u16_le(format.bits_per_sample);

    // data chunk
    header.put_slice(b"data");
    header.put_u32_le(0); // Data size (patched at finalize)

    debug_assert_eq!(header.len(), WAV_HEADER_LEN);
    Ok(header.freeze())
}

/// Writes the placeholder header to `sink` at its current position.
///
/// The sink must be positioned at offset 0 of a freshly created target.
/// Exactly 44 bytes are written in a single `write_all`; nothing else is
/// buffered. Write failures are returned as-is and never retried.
pub fn write_wav_header<W: Write + ?Sized>(sink: &mut W, format: &AudioFormat) -> WavResult<()> {
    let header = create_wav_header(format)?;
    sink.write_all(&header)?;
    log::debug!("[Wav] Header written: {}", format);
    Ok(())
}

/// Parsed view of a canonical 44-byte PCM WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WavHeader {
    /// RIFF chunk size (bytes 4..8).
    pub riff_size: u32,
    /// Format parameters from the `fmt ` chunk.
    pub format: AudioFormat,
    /// Byte rate as stored in the header.
    pub byte_rate: u32,
    /// Block align as stored in the header.
    pub block_align: u16,
    /// Data chunk size (bytes 40..44).
    pub data_size: u32,
}

impl WavHeader {
    /// Parses the first 44 bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`WavError::IncompleteHeader`] when fewer than 44 bytes are
    /// given and [`WavError::InvalidHeader`] when a magic tag, the fmt chunk
    /// size or the format tag does not match a canonical PCM header.
    pub fn parse(bytes: &[u8]) -> WavResult<Self> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(WavError::IncompleteHeader {
                len: bytes.len() as u64,
            });
        }

        let mut buf = &bytes[..WAV_HEADER_LEN];

        expect_tag(&mut buf, b"RIFF")?;
        let riff_size = buf.get_u32_le();
        expect_tag(&mut buf, b"WAVE")?;
        expect_tag(&mut buf, b"fmt ")?;

        let fmt_size = buf.get_u32_le();
        if fmt_size != FMT_CHUNK_SIZE {
            return Err(WavError::InvalidHeader(format!(
                "fmt chunk size {fmt_size}, expected {FMT_CHUNK_SIZE}"
            )));
        }
        let format_tag = buf.get_u16_le();
        if format_tag != WAVE_FORMAT_PCM {
            return Err(WavError::InvalidHeader(format!(
                "format tag {format_tag} is not integer PCM"
            )));
        }

        let channels = buf.get_u16_le();
        let sample_rate = buf.get_u32_le();
        let byte_rate = buf.get_u32_le();
        let block_align = buf.get_u16_le();
        let bits_per_sample = buf.get_u16_le();

        expect_tag(&mut buf, b"data")?;
        let data_size = buf.get_u32_le();

        Ok(Self {
            riff_size,
            format: AudioFormat::new(sample_rate, channels, bits_per_sample),
            byte_rate,
            block_align,
            data_size,
        })
    }

    /// Returns true if both size fields describe a file of `file_len` bytes.
    pub fn is_finalized(&self, file_len: u64) -> bool {
        file_len >= WAV_HEADER_LEN as u64
            && self.riff_size as u64 == file_len - RIFF_PREAMBLE_LEN
            && self.data_size as u64 == file_len - WAV_HEADER_LEN as u64
    }

    /// Returns true if the derived fields agree with the stored format.
    pub fn is_consistent(&self) -> bool {
        self.byte_rate == self.format.byte_rate() && self.block_align == self.format.block_align()
    }
}

fn expect_tag(buf: &mut &[u8], tag: &[u8; 4]) -> WavResult<()> {
    let found = &buf[..4];
    if found != tag {
        return Err(WavError::InvalidHeader(format!(
            "expected {:?} tag, found {:?}",
            String::from_utf8_lossy(tag),
            String::from_utf8_lossy(found)
        )));
    }
    buf.advance(4);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    }

    mod create {
        use super::*;

        #[test]
        fn header_is_44_bytes() {
            let header = create_wav_header(&AudioFormat::default()).unwrap();
            assert_eq!(header.len(), 44);
        }

        #[test]
        fn header_has_magic_tags() {
            let header = create_wav_header(&AudioFormat::default()).unwrap();
            assert_eq!(&header[0..4], b"RIFF");
            assert_eq!(&header[8..12], b"WAVE");
            assert_eq!(&header[12..16], b"fmt ");
            assert_eq!(&header[36..40], b"data");
        }

        #[test]
        fn size_fields_are_zero_placeholders() {
            let header = create_wav_header(&AudioFormat::default()).unwrap();
            assert_eq!(u32_at(&header, 4), 0);
            assert_eq!(u32_at(&header, 40), 0);
        }

        #[test]
        fn fmt_chunk_encodes_format() {
            let header = create_wav_header(&AudioFormat::pcm16(16000, 2)).unwrap();
            assert_eq!(u32_at(&header, 16), 16);
            assert_eq!(u16_at(&header, 20), 1);
            assert_eq!(u16_at(&header, 22), 2);
            assert_eq!(u32_at(&header, 24), 16000);
            assert_eq!(u32_at(&header, 28), 64000);
            assert_eq!(u16_at(&header, 32), 4);
            assert_eq!(u16_at(&header, 34), 16);
        }

        #[test]
        fn mono_48khz_byte_rate() {
            let header = create_wav_header(&AudioFormat::pcm16(48000, 1)).unwrap();
            assert_eq!(u32_at(&header, 28), 96000);
            assert_eq!(u16_at(&header, 32), 2);
        }

        #[test]
        fn invalid_format_writes_nothing() {
            let mut sink = Vec::new();
            let result = write_wav_header(&mut sink, &AudioFormat::pcm16(16000, 0));
            assert!(matches!(result, Err(WavError::InvalidFormat(_))));
            assert!(sink.is_empty());
        }

        #[test]
        fn write_appends_at_current_position() {
            let mut sink = Vec::new();
            write_wav_header(&mut sink, &AudioFormat::default()).unwrap();
            assert_eq!(sink.len(), 44);
            assert_eq!(&sink[..], &create_wav_header(&AudioFormat::default()).unwrap()[..]);
        }
    }

    mod parse {
        use super::*;

        #[test]
        fn parses_created_header() {
            let format = AudioFormat::pcm16(22050, 1);
            let header = create_wav_header(&format).unwrap();
            let parsed = WavHeader::parse(&header).unwrap();

            assert_eq!(parsed.format, format);
            assert_eq!(parsed.riff_size, 0);
            assert_eq!(parsed.data_size, 0);
            assert!(parsed.is_consistent());
        }

        #[test]
        fn short_input_is_incomplete() {
            let header = create_wav_header(&AudioFormat::default()).unwrap();
            let err = WavHeader::parse(&header[..43]).unwrap_err();
            assert!(matches!(err, WavError::IncompleteHeader { len: 43 }));
        }

        #[test]
        fn wrong_magic_is_rejected() {
            let mut header = create_wav_header(&AudioFormat::default()).unwrap().to_vec();
            header[0..4].copy_from_slice(b"RIFX");
            assert!(matches!(
                WavHeader::parse(&header),
                Err(WavError::InvalidHeader(_))
            ));
        }

        #[test]
        fn float_format_tag_is_rejected() {
            let mut header = create_wav_header(&AudioFormat::default()).unwrap().to_vec();
            header[20] = 3;
            assert!(matches!(
                WavHeader::parse(&header),
                Err(WavError::InvalidHeader(_))
            ));
        }

        #[test]
        fn placeholder_header_is_not_finalized() {
            let header = create_wav_header(&AudioFormat::default()).unwrap();
            let parsed = WavHeader::parse(&header).unwrap();
            assert!(!parsed.is_finalized(44 + 4096));
        }

        #[test]
        fn zero_length_capture_is_finalized_with_36_and_0() {
            let mut header = create_wav_header(&AudioFormat::default()).unwrap().to_vec();
            header[4..8].copy_from_slice(&36u32.to_le_bytes());
            let parsed = WavHeader::parse(&header).unwrap();
            assert!(parsed.is_finalized(44));
        }
    }
}

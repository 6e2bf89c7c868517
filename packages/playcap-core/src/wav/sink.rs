use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};

use super::{write_wav_header, AudioFormat};
use crate::error::{WavError, WavResult};
use crate::protocol_constants::{MAX_WAV_DATA_BYTES, WAV_HEADER_LEN};

/// Encodes signed 16-bit samples as little-endian bytes.
///
/// Samples keep their order, so interleaved input stays interleaved:
/// least-significant byte first, channels in the order they were captured.
pub fn encode_samples_le(samples: &[i16]) -> Bytes {
    let mut pcm = BytesMut::with_capacity(samples.len() * 2);
    for &sample in samples {
        pcm.put_i16_le(sample);
    }
    pcm.freeze()
}

/// Append-only writer for the data region of a capture.
///
/// Creating a sink writes the placeholder header; every append goes straight
/// to the underlying writer in call order. The sink tracks the data size so
/// producers can stop before the 32-bit size fields would overflow. It never
/// patches the header itself; [`finalize_wav`](super::finalize_wav) does that
/// once the writer has been flushed and released.
#[derive(Debug)]
pub struct WavSink<W: Write> {
    writer: W,
    format: AudioFormat,
    data_bytes: u64,
}

impl<W: Write> WavSink<W> {
    /// Writes the placeholder header to `writer` and returns a sink positioned
    /// at the start of the data region.
    pub fn create(mut writer: W, format: AudioFormat) -> WavResult<Self> {
        write_wav_header(&mut writer, &format)?;
        Ok(Self {
            writer,
            format,
            data_bytes: 0,
        })
    }

    /// Appends raw PCM bytes.
    ///
    /// # Errors
    ///
    /// - [`WavError::PartialFrame`] if `chunk` is not a whole number of frames
    /// - [`WavError::SizeOverflow`] if the data region would exceed the 32-bit size fields
    /// - [`WavError::Io`] if the writer rejects the bytes
    pub fn append(&mut self, chunk: &[u8]) -> WavResult<()> {
        let block_align = self.format.block_align();
        if chunk.len() % block_align as usize != 0 {
            return Err(WavError::PartialFrame {
                len: chunk.len(),
                block_align,
            });
        }

        let new_len = self.data_bytes + chunk.len() as u64;
        if new_len > MAX_WAV_DATA_BYTES {
            return Err(WavError::SizeOverflow {
                len: new_len + WAV_HEADER_LEN as u64,
            });
        }

        self.writer.write_all(chunk)?;
        self.data_bytes = new_len;
        Ok(())
    }

    /// Encodes and appends interleaved 16-bit samples.
    pub fn append_samples(&mut self, samples: &[i16]) -> WavResult<()> {
        self.append(&encode_samples_le(samples))
    }

    /// Bytes appended after the header so far.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }

    /// Bytes that can still be appended before the size fields overflow.
    pub fn remaining_capacity(&self) -> u64 {
        MAX_WAV_DATA_BYTES.saturating_sub(self.data_bytes)
    }

    /// Format the header was written with.
    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Flushes buffered bytes to the underlying writer.
    pub fn flush(&mut self) -> WavResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> WavResult<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

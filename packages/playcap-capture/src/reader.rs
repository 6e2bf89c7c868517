use std::io::{self, Read};

use playcap_core::{AudioFormat, CaptureError, PcmSource, SessionResult};

/// Reads raw interleaved s16le PCM from any byte stream.
///
/// Bytes that do not complete a frame are held back until the next read, so
/// the session only ever sees whole frames. A trailing partial frame at end of
/// stream is dropped.
pub struct ReaderSource<R> {
    reader: R,
    format: AudioFormat,
    scratch: Vec<u8>,
    pending: usize,
}

impl<R: Read + Send> ReaderSource<R> {
    /// Wraps `reader`, declaring that it carries PCM in `format`.
    pub fn new(reader: R, format: AudioFormat) -> Self {
        Self {
            reader,
            format,
            scratch: Vec::new(),
            pending: 0,
        }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Send> PcmSource for ReaderSource<R> {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [i16]) -> SessionResult<usize> {
        let block_align = self.format.block_align() as usize;
        let channels = self.format.channels.max(1) as usize;
        let frames_wanted = buf.len() / channels;
        if frames_wanted == 0 || block_align == 0 {
            return Ok(0);
        }

        let want_bytes = frames_wanted * block_align;
        if self.scratch.len() < want_bytes {
            self.scratch.resize(want_bytes, 0);
        }

        loop {
            let n = match self.reader.read(&mut self.scratch[self.pending..want_bytes]) {
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(CaptureError::Io(err)),
            };

            if n == 0 {
                if self.pending > 0 {
                    log::warn!(
                        "[Source] Dropping {} trailing bytes that do not form a frame",
                        self.pending
                    );
                    self.pending = 0;
                }
                return Ok(0);
            }

            let total = self.pending + n;
            let usable = total - total % block_align;
            if usable == 0 {
                self.pending = total;
                continue;
            }

            for (sample, bytes) in buf.iter_mut().zip(self.scratch[..usable].chunks_exact(2)) {
                *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
            }

            self.scratch.copy_within(usable..total, 0);
            self.pending = total - usable;
            return Ok(usable / 2);
        }
    }
}

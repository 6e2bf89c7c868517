use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{CaptureConfig, CaptureResult, CaptureStats, PcmSource};
use crate::error::{CaptureError, ErrorCode, SessionResult};
use crate::events::{CaptureEvent, EventEmitter};
use crate::utils::{capture_file_name, now_millis, unique_path};
use crate::wav::{encode_samples_le, finalize_wav_file, AudioFormat, WavSink};

/// Buffer size of the file writer; a few reads worth of default-format audio.
const WRITE_BUFFER_BYTES: usize = 64 * 1024;

type CaptureSink = WavSink<BufWriter<File>>;

/// A running capture: one producer appending to one WAV file.
///
/// Dropping a session without calling [`stop`](Self::stop) or
/// [`wait`](Self::wait) cancels the producer but leaves the file
/// unfinalized; it can be repaired later with
/// [`finalize_wav_file`](crate::wav::finalize_wav_file).
pub struct CaptureSession {
    session_id: String,
    path: PathBuf,
    format: AudioFormat,
    cancel: CancellationToken,
    finished: CancellationToken,
    data_bytes: Arc<AtomicU64>,
    producer: Option<JoinHandle<SessionResult<u64>>>,
    emitter: Arc<dyn EventEmitter>,
}

impl CaptureSession {
    /// Creates the output file, writes the header and starts the producer.
    ///
    /// Must be called from within a Tokio runtime; the producer runs on the
    /// runtime's blocking pool.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::Configuration`] for invalid config or no runtime
    /// - [`CaptureError::FormatMismatch`] if the source format differs from the config
    /// - [`CaptureError::Io`] / [`CaptureError::Wav`] if the file or header cannot be written
    pub fn start<S>(
        config: CaptureConfig,
        source: S,
        emitter: Arc<dyn EventEmitter>,
    ) -> SessionResult<Self>
    where
        S: PcmSource + 'static,
    {
        config.validate()?;

        let found = source.format();
        if found != config.format {
            return Err(CaptureError::FormatMismatch {
                expected: config.format.to_string(),
                found: found.to_string(),
            });
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            CaptureError::Configuration(
                "capture sessions must be started inside a Tokio runtime".to_string(),
            )
        })?;

        let (path, file) = create_capture_file(&config)?;
        let sink = match write_header(file, config.format) {
            Ok(sink) => sink,
            Err(err) => {
                log::error!(
                    "[Capture] Header write failed for {}: {}",
                    path.display(),
                    err
                );
                if let Err(remove_err) = fs::remove_file(&path) {
                    log::warn!(
                        "[Capture] Could not remove incomplete file {}: {}",
                        path.display(),
                        remove_err
                    );
                }
                return Err(err);
            }
        };

        let session_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();
        let data_bytes = Arc::new(AtomicU64::new(0));

        let producer = {
            let cancel = cancel.clone();
            let done = finished.clone().drop_guard();
            let data_bytes = Arc::clone(&data_bytes);
            let session_id = session_id.clone();
            let samples_per_read = config.samples_per_read;
            runtime.spawn_blocking(move || {
                let _done = done;
                run_producer(
                    &session_id,
                    sink,
                    source,
                    samples_per_read,
                    &cancel,
                    &data_bytes,
                )
            })
        };

        log::info!(
            "[Capture] Session started: session={}, file={}, format={}",
            session_id,
            path.display(),
            config.format
        );
        emitter.emit_capture(CaptureEvent::Started {
            session_id: session_id.clone(),
            path: path.clone(),
            format: config.format,
            timestamp: now_millis(),
        });

        Ok(Self {
            session_id,
            path,
            format: config.format,
            cancel,
            finished,
            data_bytes,
            producer: Some(producer),
            emitter,
        })
    }

    /// Unique identifier of this session.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// File receiving the capture.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format declared in the header.
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Snapshot of the data written so far.
    pub fn stats(&self) -> CaptureStats {
        let data_bytes = self.data_bytes.load(Ordering::Relaxed);
        CaptureStats {
            data_bytes,
            duration_secs: self.format.duration_secs(data_bytes),
            is_recording: !self.finished.is_cancelled(),
        }
    }

    /// Resolves once the producer has exited, whether stopped, exhausted or failed.
    pub async fn producer_finished(&self) {
        self.finished.cancelled().await;
    }

    /// Signals the producer to stop, waits for it, then finalizes the file.
    ///
    /// The chunk being read when the signal arrives is still written.
    pub async fn stop(mut self) -> SessionResult<CaptureResult> {
        log::info!("[Capture] Stop requested: session={}", self.session_id);
        self.cancel.cancel();
        self.join_and_finalize().await
    }

    /// Waits for the source to run dry, then finalizes the file.
    pub async fn wait(mut self) -> SessionResult<CaptureResult> {
        self.join_and_finalize().await
    }

    async fn join_and_finalize(&mut self) -> SessionResult<CaptureResult> {
        // The handle stays in place until the join resolves so that dropping
        // this future mid-join still cancels the producer.
        let produced = match self.producer.as_mut() {
            Some(handle) => match handle.await {
                Ok(result) => result,
                Err(err) => Err(CaptureError::ProducerPanicked(err.to_string())),
            },
            None => Err(CaptureError::ProducerPanicked(
                "producer already joined".to_string(),
            )),
        };
        self.producer = None;

        // The producer has released the file; reopen it for patching.
        let path = self.path.clone();
        let finalized = match tokio::task::spawn_blocking(move || finalize_wav_file(&path)).await
        {
            Ok(result) => result.map_err(CaptureError::from),
            Err(err) => Err(CaptureError::ProducerPanicked(err.to_string())),
        };

        match (produced, finalized) {
            (Ok(_), Ok(data_bytes)) => {
                let result = CaptureResult {
                    session_id: self.session_id.clone(),
                    path: self.path.clone(),
                    format: self.format,
                    data_bytes,
                    duration_secs: self.format.duration_secs(data_bytes as u64),
                };
                log::info!(
                    "[Capture] Session finalized: session={}, file={}, data_bytes={}, length={:.3}s",
                    result.session_id,
                    result.path.display(),
                    result.data_bytes,
                    result.duration_secs
                );
                self.emitter.emit_capture(CaptureEvent::Finalized {
                    session_id: result.session_id.clone(),
                    path: result.path.clone(),
                    data_bytes: result.data_bytes,
                    duration_secs: result.duration_secs,
                    timestamp: now_millis(),
                });
                Ok(result)
            }
            (Err(err), finalized) => {
                match finalized {
                    Ok(data_bytes) => log::warn!(
                        "[Capture] Producer failed, file finalized with {} data bytes: session={}, error={}",
                        data_bytes,
                        self.session_id,
                        err
                    ),
                    Err(ref finalize_err) => log::warn!(
                        "[Capture] Producer failed and file could not be finalized: session={}, error={}, finalize_error={}",
                        self.session_id,
                        err,
                        finalize_err
                    ),
                }
                self.emit_failed(&err);
                Err(err)
            }
            (Ok(_), Err(err)) => {
                log::error!(
                    "[Capture] Finalize failed: session={}, file={}, error={}",
                    self.session_id,
                    self.path.display(),
                    err
                );
                self.emit_failed(&err);
                Err(err)
            }
        }
    }

    fn emit_failed(&self, err: &CaptureError) {
        self.emitter.emit_capture(CaptureEvent::Failed {
            session_id: self.session_id.clone(),
            path: self.path.clone(),
            code: err.code(),
            error: err.to_string(),
            timestamp: now_millis(),
        });
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.producer.is_some() {
            log::warn!(
                "[Capture] Session dropped without stop: session={}, file={} left unfinalized",
                self.session_id,
                self.path.display()
            );
        }
        self.cancel.cancel();
    }
}

/// Opens a fresh output file for the session.
///
/// Generated names get a numeric suffix on collision; an explicit name
/// replaces any existing file.
fn create_capture_file(config: &CaptureConfig) -> io::Result<(PathBuf, File)> {
    fs::create_dir_all(&config.output_dir)?;

    match &config.file_name {
        Some(name) => {
            let path = config.output_dir.join(name);
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;
            Ok((path, file))
        }
        None => {
            let name = capture_file_name(&chrono::Local::now());
            loop {
                let path = unique_path(&config.output_dir, &name, |p| p.exists());
                match OpenOptions::new().write(true).create_new(true).open(&path) {
                    Ok(file) => return Ok((path, file)),
                    // Lost a race with another session for the same name
                    Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                    Err(err) => return Err(err),
                }
            }
        }
    }
}

/// Writes the placeholder header and pushes it to disk before any audio.
fn write_header(file: File, format: AudioFormat) -> SessionResult<CaptureSink> {
    let mut sink = WavSink::create(BufWriter::with_capacity(WRITE_BUFFER_BYTES, file), format)?;
    sink.flush()?;
    Ok(sink)
}

/// Producer loop: read, append, repeat until cancelled, exhausted or failed.
///
/// The writer is always flushed and closed before returning so that
/// finalize sees every appended byte.
fn run_producer<S: PcmSource>(
    session_id: &str,
    mut sink: CaptureSink,
    mut source: S,
    samples_per_read: usize,
    cancel: &CancellationToken,
    data_bytes: &AtomicU64,
) -> SessionResult<u64> {
    let mut buf = vec![0i16; samples_per_read];
    let mut reads: u64 = 0;

    let outcome = loop {
        if cancel.is_cancelled() {
            log::debug!("[Capture] Producer cancelled: session={}", session_id);
            break Ok(());
        }

        let samples = match source.read(&mut buf) {
            Ok(0) => {
                log::info!("[Capture] Source exhausted: session={}", session_id);
                break Ok(());
            }
            Ok(n) => n.min(buf.len()),
            Err(err) => break Err(err),
        };

        let chunk = encode_samples_le(&buf[..samples]);
        if chunk.len() as u64 > sink.remaining_capacity() {
            log::warn!(
                "[Capture] WAV size limit reached after {} data bytes, stopping: session={}",
                sink.data_bytes(),
                session_id
            );
            break Ok(());
        }
        if let Err(err) = sink.append(&chunk) {
            break Err(CaptureError::from(err));
        }

        reads += 1;
        data_bytes.store(sink.data_bytes(), Ordering::Relaxed);
    };

    let written = sink.data_bytes();
    let closed = close_sink(sink);

    log::debug!(
        "[Capture] Producer exited: session={}, reads={}, data_bytes={}",
        session_id,
        reads,
        written
    );

    outcome.and(closed).map(|_| written)
}

fn close_sink(sink: CaptureSink) -> SessionResult<()> {
    let writer = sink.into_inner()?;
    let file = writer
        .into_inner()
        .map_err(|err| CaptureError::Io(err.into_error()))?;
    file.sync_all()?;
    Ok(())
}

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use rodio::{Decoder, OutputStreamBuilder, Sink};

/// Called once when the audio reaches its natural end.
pub type OnFinish = Box<dyn FnOnce() + Send>;

/// Something that can start playing the azan.
pub trait AudioBackend: Send + Sync {
    /// Begin playback immediately. `on_finish` fires on natural end of stream,
    /// never after [`AudioHandle::stop`].
    fn play(&self, on_finish: OnFinish) -> Result<Box<dyn AudioHandle>>;
}

/// A live playback. Dropping it releases the output.
pub trait AudioHandle: Send {
    fn stop(&mut self);
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Plays an audio file through the default output device.
///
/// rodio's output stream is not `Send`, so each playback owns a thread that
/// opens the device, feeds the sink and watches for the end of the stream.
pub struct RodioBackend {
    path: PathBuf,
    load_timeout: Duration,
}

impl RodioBackend {
    pub fn new(path: PathBuf, load_timeout: Duration) -> Self {
        Self { path, load_timeout }
    }
}

impl AudioBackend for RodioBackend {
    fn play(&self, on_finish: OnFinish) -> Result<Box<dyn AudioHandle>> {
        if !self.path.exists() {
            bail!("Audio file not found: {:?}", self.path);
        }

        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let path = self.path.clone();
        let flag = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("azan-audio".to_string())
            .spawn(move || {
                let (_stream, sink) = match open_sink(&path) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(format!("{:#}", e)));
                        return;
                    }
                };
                if ready_tx.send(Ok(())).is_err() {
                    // Caller gave up waiting.
                    return;
                }

                while !flag.load(Ordering::Acquire) {
                    if sink.empty() {
                        log::debug!("azan stream ended");
                        on_finish();
                        return;
                    }
                    thread::park_timeout(POLL_INTERVAL);
                }
                sink.stop();
            })
            .context("Spawning audio thread")?;

        match ready_rx.recv_timeout(self.load_timeout) {
            Ok(Ok(())) => Ok(Box::new(RodioHandle {
                stop,
                thread: Some(thread),
            })),
            Ok(Err(message)) => Err(anyhow!(message)),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                stop.store(true, Ordering::Release);
                bail!("Timed out opening audio output after {:?}", self.load_timeout)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => bail!("Audio thread exited early"),
        }
    }
}

fn open_sink(path: &Path) -> Result<(rodio::OutputStream, Sink)> {
    let mut stream = OutputStreamBuilder::from_default_device()
        .map_err(|e| anyhow!("No audio device: {}", e))?
        .open_stream_or_fallback()
        .map_err(|e| anyhow!("Opening audio stream: {}", e))?;
    stream.log_on_drop(false);

    let file = File::open(path).with_context(|| format!("Opening {:?}", path))?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| anyhow!("Decoding {:?}: {}", path, e))?;

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.play();
    Ok((stream, sink))
}

struct RodioHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AudioHandle for RodioHandle {
    fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            // The finish callback runs on this thread and may stop us.
            if thread.thread().id() == thread::current().id() {
                return;
            }
            thread.thread().unpark();
            if thread.join().is_err() {
                log::warn!("audio thread panicked");
            }
        }
    }
}

impl Drop for RodioHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = &self.thread {
            thread.thread().unpark();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_fails_before_touching_audio() {
        let backend = RodioBackend::new(PathBuf::from("/nonexistent/azan.mp3"), Duration::from_secs(1));
        let err = backend.play(Box::new(|| {})).err().unwrap();
        assert!(err.to_string().contains("not found"));
    }
}

//! Decode worker loop: one thread per player, all blocking I/O lives here.
//!
//! The worker polls its player's shared flags, opens the requested resource,
//! decodes packets, and appends interleaved chunks to the sink with depth
//! based backpressure. Failures are caught at the session boundary and
//! stored for the tick context to drain; nothing here ever panics the loop.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::EngineConfig;
use crate::constants::SAMPLE_RATE;
use crate::error::PlayerError;
use crate::playback::player::PlayerShared;
use crate::source::TrackSource;

/// Keeps `worker_alive` in sync with the worker thread's lifetime, even on
/// unwind.
struct WorkerGuard {
    shared: Arc<PlayerShared>,
}

impl WorkerGuard {
    fn new(shared: Arc<PlayerShared>) -> Self {
        shared.worker_alive.store(true, Ordering::Relaxed);
        Self { shared }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.shared.worker_alive.store(false, Ordering::Relaxed);
    }
}

/// Spawn the long-lived worker thread for one player.
pub(crate) fn spawn(shared: Arc<PlayerShared>, source: Arc<dyn TrackSource>, config: EngineConfig) {
    thread::spawn(move || run(shared, source, config));
}

fn run(shared: Arc<PlayerShared>, source: Arc<dyn TrackSource>, config: EngineConfig) {
    let _guard = WorkerGuard::new(shared.clone());
    let idle = Duration::from_millis(config.worker_idle_ms.max(1));

    loop {
        if shared.kill.load(Ordering::SeqCst) {
            break;
        }

        if !shared.queued.load(Ordering::SeqCst) {
            // A stop with no session to cancel is spent here.
            shared.stop_requested.store(false, Ordering::SeqCst);
            thread::sleep(idle);
            continue;
        }

        let track = shared.pending_track.lock().unwrap().take();
        let Some(track) = track else {
            shared.queued.store(false, Ordering::SeqCst);
            continue;
        };

        // A newer set_song/play supersedes any stop that raced it.
        shared.stop_requested.store(false, Ordering::SeqCst);
        let session = shared.session_id.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("player '{}': session {} playing '{}'", shared.name, session, track);

        match run_session(&shared, source.as_ref(), &config, &track) {
            Ok(finished) => {
                if finished && shared.looping.load(Ordering::SeqCst) && !should_abort(&shared) {
                    let mut pending = shared.pending_track.lock().unwrap();
                    *pending = Some(track);
                    drop(pending);
                    shared.playing.store(false, Ordering::SeqCst);
                    continue;
                }
                if finished && !shared.stop_requested.load(Ordering::SeqCst) {
                    shared.complete.store(true, Ordering::SeqCst);
                }
            }
            Err(err) => {
                warn!("player '{}': session failed: {}", shared.name, err);
                let mut last_error = shared.last_error.lock().unwrap();
                *last_error = Some(err);
            }
        }

        shared.playing.store(false, Ordering::SeqCst);
        shared.queued.store(false, Ordering::SeqCst);
        shared.stop_requested.store(false, Ordering::SeqCst);
    }

    debug!("player '{}': worker exiting", shared.name);
}

fn should_abort(shared: &PlayerShared) -> bool {
    shared.kill.load(Ordering::SeqCst) || shared.stop_requested.load(Ordering::SeqCst)
}

/// Open the resource, decode it, and feed the sink until the track ends or
/// the session is cancelled. Returns `Ok(true)` on a natural end.
fn run_session(
    shared: &PlayerShared,
    source: &dyn TrackSource,
    config: &EngineConfig,
    track: &str,
) -> Result<bool, PlayerError> {
    let resource = source.open(track)?;

    let stream = MediaSourceStream::new(resource.stream, Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = resource.extension.as_deref() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| PlayerError::DecodeFailure(format!("probe failed: {}", err)))?;
    let mut format = probed.format;

    let decode_track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlayerError::DecodeFailure("no supported audio track".to_string()))?;
    let track_id = decode_track.id;
    let sample_rate = decode_track.codec_params.sample_rate.unwrap_or(SAMPLE_RATE);
    let mut decoder = symphonia::default::get_codecs()
        .make(&decode_track.codec_params, &DecoderOptions::default())
        .map_err(|err| PlayerError::DecodeFailure(format!("unsupported codec: {}", err)))?;

    let output = open_output_stream(config)?;
    let mixer = output.mixer().clone();
    {
        let mut sink = shared.sink.lock().unwrap();
        *sink = Sink::connect_new(&mixer);
        // Start silent; the manager pushes the real volume on its next tick.
        sink.set_volume(0.0);
    }

    {
        let mut current = shared.current_track.lock().unwrap();
        *current = Some(track.to_string());
    }
    shared.playing.store(true, Ordering::SeqCst);

    // Frames of decoded audio still to be replaced with silence. Some output
    // backends ignore a volume change before the first write; feeding zeros
    // keeps the primer span from popping at full device gain.
    let mut primer_frames =
        ((config.primer_silence_ms / 1000.0) * sample_rate as f32).ceil() as usize;

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut finished = false;

    loop {
        if should_abort(shared) {
            break;
        }

        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                finished = true;
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                finished = true;
                break;
            }
            Err(err) => {
                abandon_sink(shared);
                return Err(PlayerError::DecodeFailure(format!("read failed: {}", err)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(err)) => {
                // Recoverable per the codec contract; skip the packet.
                warn!("player '{}': bad packet: {}", shared.name, err);
                continue;
            }
            Err(err) => {
                abandon_sink(shared);
                return Err(PlayerError::DecodeFailure(format!("decode failed: {}", err)));
            }
        };

        let spec = *decoded.spec();
        if sample_buf
            .as_ref()
            .map(|buf| buf.capacity() < decoded.capacity() * spec.channels.count())
            .unwrap_or(true)
        {
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }
        let buf = sample_buf.as_mut().unwrap();
        buf.copy_interleaved_ref(decoded);

        let mut samples = to_stereo(buf.samples(), spec.channels.count());
        if samples.is_empty() {
            continue;
        }

        if primer_frames > 0 {
            let zeroed = (primer_frames * 2).min(samples.len());
            samples[..zeroed].fill(0.0);
            primer_frames -= zeroed / 2;
        }

        if !wait_for_sink_capacity(shared, config) {
            break;
        }

        let sink = shared.sink.lock().unwrap();
        sink.append(SamplesBuffer::new(2, sample_rate, samples));
    }

    if finished {
        drain_sink(shared, config);
    }
    abandon_sink(shared);

    Ok(finished && !shared.stop_requested.load(Ordering::SeqCst))
}

/// Interleave a decoded chunk down (or up) to stereo.
fn to_stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

/// Open the default output stream with bounded retry behavior.
fn open_output_stream(config: &EngineConfig) -> Result<OutputStream, PlayerError> {
    let attempts = config.output_open_retries.max(1);
    for attempt in 1..=attempts {
        match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                if attempt == attempts {
                    return Err(PlayerError::Output(format!(
                        "failed to open output stream after {} attempts: {}",
                        attempts, err
                    )));
                }
                warn!(
                    "open_default_stream attempt {}/{} failed: {}",
                    attempt, attempts, err
                );
                thread::sleep(Duration::from_millis(config.output_open_retry_ms));
            }
        }
    }
    unreachable!("retry loop always returns");
}

/// Block the append path until the sink queue drops below the configured
/// maximum. Returns `false` if the session was cancelled while waiting.
fn wait_for_sink_capacity(shared: &PlayerShared, config: &EngineConfig) -> bool {
    if config.max_sink_chunks == 0 {
        return true;
    }
    loop {
        if should_abort(shared) {
            return false;
        }
        let len = shared.sink.lock().unwrap().len();
        if len < config.max_sink_chunks {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Wait for the queued audio to play out after the producer finished.
fn drain_sink(shared: &PlayerShared, config: &EngineConfig) {
    let idle = Duration::from_millis(config.worker_idle_ms.max(1));
    loop {
        if should_abort(shared) {
            return;
        }
        let empty = shared.sink.lock().unwrap().empty();
        if empty {
            return;
        }
        thread::sleep(idle);
    }
}

/// Release the session's queued audio and detach the sink.
fn abandon_sink(shared: &PlayerShared) {
    let sink = shared.sink.lock().unwrap();
    sink.stop();
    sink.clear();
}

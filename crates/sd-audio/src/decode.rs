use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use sd_core::signal::AudioSignal;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::LoadError;

/// Fallback when the container does not declare a sample rate.
const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// Decode an audio file into a mono signal at its native sample rate.
///
/// Supports WAV, MP3, FLAC, OGG, AAC, MP4 and MKV via symphonia. Channels are
/// averaged. When `max_secs` is given, decoding stops once that much audio
/// has been produced and the result is cut to it.
///
/// The file handle is dropped before returning.
///
/// # Errors
/// Returns a [`LoadError`] if the file is missing, unreadable or undecodable.
///
/// # Example
/// ```no_run
/// use sd_audio::decode::decode_file;
/// let signal = decode_file("clip.wav", Some(60.0)).unwrap();
/// println!("{} samples @ {} Hz", signal.len(), signal.sample_rate());
/// ```
pub fn decode_file(
    path: impl AsRef<Path>,
    max_secs: Option<f64>,
) -> Result<AudioSignal, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str());
    decode_source(Box::new(file), ext, max_secs, &path.display().to_string())
}

/// Decode an in-memory audio buffer (e.g. the bytes a recorder produced).
///
/// `extension` is an optional format hint such as `"wav"`.
///
/// # Errors
/// Returns a [`LoadError`] if the bytes are not decodable audio.
pub fn decode_bytes(
    bytes: impl Into<Arc<[u8]>>,
    extension: Option<&str>,
    max_secs: Option<f64>,
) -> Result<AudioSignal, LoadError> {
    let bytes: Arc<[u8]> = bytes.into();
    let label = format!("<{} octets en mémoire>", bytes.len());
    decode_source(Box::new(Cursor::new(bytes)), extension, max_secs, &label)
}

/// Decide how a `next_packet` failure ends decoding.
///
/// EOF ends the stream normally. Any other error fails the load if nothing was
/// decoded yet; after that, the clip is kept truncated at the last good packet.
fn end_of_stream(error: &SymphoniaError, decoded: usize, label: &str) -> Result<(), LoadError> {
    match error {
        SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
        _ if decoded == 0 => Err(LoadError::DecodeError(format!("{label} : {error}"))),
        _ => {
            log::warn!("{label} tronqué après {decoded} échantillons : {error}");
            Ok(())
        }
    }
}

fn decode_source(
    source: Box<dyn MediaSource>,
    extension: Option<&str>,
    max_secs: Option<f64>,
    label: &str,
) -> Result<AudioSignal, LoadError> {
    let mss = MediaSourceStream::new(source, MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let detected = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| LoadError::UnsupportedFormat(e.to_string()))?;

    let mut format = detected.format;
    let track = format.default_track().ok_or(LoadError::NoTrack)?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or_else(|| {
        log::warn!("Sample rate absent dans {label}, repli sur {FALLBACK_SAMPLE_RATE} Hz");
        FALLBACK_SAMPLE_RATE
    });
    let max_frames = max_secs.map(|secs| (secs * f64::from(sample_rate)).ceil() as usize);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| LoadError::DecodeError(e.to_string()))?;

    let track_id = track.id;
    let mut all_samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;

    loop {
        if max_frames.is_some_and(|max| all_samples.len() >= max) {
            break;
        }

        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(e) => {
                end_of_stream(&e, all_samples.len(), label)?;
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Audio decode frame error: {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let num_frames = decoded.capacity();
        // Reuse SampleBuffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        // Downmix to mono
        all_samples.extend(
            buf.samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    if let Some(max) = max_frames {
        all_samples.truncate(max);
    }

    if all_samples.is_empty() {
        return Err(LoadError::Empty);
    }

    log::info!(
        "Decoded {} samples @ {sample_rate}Hz from {label}",
        all_samples.len()
    );

    Ok(AudioSignal::new(all_samples, sample_rate))
}

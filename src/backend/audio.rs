//! Audio decoding backed by `symphonia`.
//!
//! Detects the container (MP4/MOV, WebM/MKV, Ogg, WAV, …), picks the first
//! track with a known codec, and decodes every packet to planar `f32`.
//! Recoverable per-packet decode errors are skipped the way media players
//! skip a damaged frame; anything else aborts the run.

use super::{AudioDecoder, DecodedAudio};
use crate::error::{ConvertError, Stage};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// [`AudioDecoder`] implemented with symphonia.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> Result<DecodedAudio, ConvertError> {
        let source = Cursor::new(bytes.to_vec());
        let stream = MediaSourceStream::new(Box::new(source), Default::default());

        let mut format_hint = Hint::new();
        if let Some(ext) = hint {
            format_hint.with_extension(ext);
        }

        let detected = symphonia::default::get_probe()
            .format(
                &format_hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ConvertError::corrupt(Stage::Open, format!("unsupported container: {e}")))?;
        let mut format = detected.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ConvertError::corrupt(Stage::Open, "no audio track found"))?;
        let track_id = track.id;
        let declared_rate = track.codec_params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| ConvertError::corrupt(Stage::Open, format!("unsupported codec: {e}")))?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut sample_rate = declared_rate.unwrap_or(0);
        let mut buffer: Option<SampleBuffer<f32>> = None;
        let mut skipped = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(ConvertError::corrupt(Stage::Open, format!("demux failed: {e}")))
                }
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    skipped += 1;
                    debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => {
                    return Err(ConvertError::corrupt(Stage::Open, format!("decode failed: {e}")))
                }
            };

            let spec = *decoded.spec();
            let n_channels = spec.channels.count();
            if channels.is_empty() {
                channels = vec![Vec::new(); n_channels];
                sample_rate = spec.rate;
            }

            let needed = decoded.capacity() as u64;
            let fits = buffer
                .as_ref()
                .is_some_and(|b| b.capacity() as u64 >= needed * n_channels as u64);
            if !fits {
                buffer = Some(SampleBuffer::<f32>::new(needed, spec));
            }
            let Some(buf) = buffer.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks(n_channels) {
                for (channel, sample) in channels.iter_mut().zip(frame) {
                    channel.push(*sample);
                }
            }
        }

        if skipped > 0 {
            warn!("{} audio packets could not be decoded and were skipped", skipped);
        }
        if channels.is_empty() || channels[0].is_empty() {
            return Err(ConvertError::corrupt(Stage::Open, "audio track contains no samples"));
        }
        if sample_rate == 0 {
            return Err(ConvertError::corrupt(Stage::Open, "audio track has no sample rate"));
        }

        info!(
            sample_rate,
            channels = channels.len(),
            frames = channels[0].len(),
            "Audio decoded"
        );
        Ok(DecodedAudio {
            sample_rate,
            channels,
        })
    }
}

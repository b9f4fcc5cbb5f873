//! PCM to MP3: convert float samples to 16-bit blocks and drive the encoder.
//!
//! Mono sources are encoded as mono from the first channel. Sources with
//! more than two channels are encoded from their first two; the rest are
//! dropped with a warning rather than downmixed.

use crate::backend::{DecodedAudio, Mp3EncoderFactory};
use crate::config::AudioPolicy;
use crate::error::{ConvertError, Stage};
use crate::progress::{Progress, ProgressUnit};
use tracing::{debug, info, warn};

/// Reject a source larger than `limit` bytes. Runs before any decoding.
pub fn ensure_within_ceiling(size: u64, limit: u64) -> Result<(), ConvertError> {
    if size > limit {
        warn!("Rejecting {}-byte source: limit is {} bytes", size, limit);
        return Err(ConvertError::ResourceCeilingExceeded { size, limit });
    }
    Ok(())
}

/// Convert one float sample to signed 16-bit.
///
/// The input is clamped to [-1, 1] (NaN becomes silence). Negative values
/// scale by 32768 and the rest by 32767, so both extremes are reachable;
/// the result truncates toward zero.
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

fn fill_block(src: &[f32], dst: &mut Vec<i16>) {
    dst.clear();
    dst.extend(src.iter().copied().map(sample_to_i16));
}

/// An encoded MP3 stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub channels: usize,
    pub blocks: usize,
}

/// Encode `audio` as MP3 in blocks of `policy.block_size` samples per channel.
pub fn encode_mp3(
    audio: &DecodedAudio,
    policy: &AudioPolicy,
    factory: &dyn Mp3EncoderFactory,
    progress: Progress<'_>,
) -> Result<EncodedAudio, ConvertError> {
    let frames = audio.frames();
    if audio.channels.is_empty() || frames == 0 {
        return Err(ConvertError::corrupt(Stage::Open, "audio track contains no samples"));
    }
    if audio.channel_count() > 2 {
        warn!(
            "Source has {} channels; encoding the first two",
            audio.channel_count()
        );
    }

    let left = &audio.channels[0];
    let right = audio.channels.get(1);
    let channels: u8 = if right.is_some() { 2 } else { 1 };
    let mut encoder = factory.create(channels, audio.sample_rate, policy.bitrate_kbps)?;

    let block = policy.block_size.max(1);
    let total = frames.div_ceil(block);
    progress.start(ProgressUnit::Block, total);

    let mut out = Vec::new();
    let mut left_block = Vec::with_capacity(block);
    let mut right_block = Vec::with_capacity(block);
    let mut empty_chunks = 0usize;

    for (i, start) in (0..frames).step_by(block).enumerate() {
        let n = i + 1;
        let end = (start + block).min(frames);
        progress.unit_start(n, total);

        fill_block(&left[start..end], &mut left_block);
        let right_slice = match right {
            Some(r) => {
                fill_block(r.get(start..end.min(r.len())).unwrap_or(&[]), &mut right_block);
                right_block.resize(left_block.len(), 0);
                Some(right_block.as_slice())
            }
            None => None,
        };

        let chunk = match encoder.encode_block(&left_block, right_slice) {
            Ok(chunk) => chunk,
            Err(e) => {
                progress.unit_error(n, total, &e);
                return Err(e.at_stage(Stage::Encode));
            }
        };
        if chunk.is_empty() {
            empty_chunks += 1;
        } else {
            out.extend_from_slice(&chunk);
        }
        progress.unit_complete(n, total, chunk.len());
    }

    let tail = encoder.flush().map_err(|e| e.at_stage(Stage::Encode))?;
    out.extend_from_slice(&tail);
    debug!(
        "Encoded {} blocks ({} buffered with no output), flush {} bytes",
        total,
        empty_chunks,
        tail.len()
    );

    if out.is_empty() {
        return Err(ConvertError::encode(Stage::Encode, "encoder produced an empty stream"));
    }

    info!(
        "MP3 encoded: {} Hz, {} channel(s), {} frames → {} bytes",
        audio.sample_rate,
        channels,
        frames,
        out.len()
    );
    progress.complete(total, out.len());
    Ok(EncodedAudio {
        bytes: out,
        channels: channels as usize,
        blocks: total,
    })
}

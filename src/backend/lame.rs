//! MP3 encoding backed by LAME through `mp3lame-encoder`.

use super::{BlockEncoder, Mp3EncoderFactory};
use crate::error::{ConvertError, Stage};
use mp3lame_encoder::{Bitrate, Builder, DualPcm, Encoder, FlushNoGap, MonoPcm, Quality};
use tracing::debug;

/// Bytes LAME may emit on flush (its documented minimum flush buffer).
const FLUSH_RESERVE: usize = 7200;

/// [`Mp3EncoderFactory`] producing LAME sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LameEncoderFactory;

impl Mp3EncoderFactory for LameEncoderFactory {
    fn create(
        &self,
        channels: u8,
        sample_rate: u32,
        bitrate_kbps: u32,
    ) -> Result<Box<dyn BlockEncoder>, ConvertError> {
        let fail = |what: &str, e: &dyn std::fmt::Debug| {
            ConvertError::encode(Stage::Encode, format!("LAME {what}: {e:?}"))
        };

        let mut builder = Builder::new()
            .ok_or_else(|| ConvertError::encode(Stage::Encode, "LAME failed to allocate"))?;
        builder
            .set_num_channels(channels)
            .map_err(|e| fail("channels", &e))?;
        builder
            .set_sample_rate(sample_rate)
            .map_err(|e| fail("sample rate", &e))?;
        builder
            .set_brate(bitrate(bitrate_kbps)?)
            .map_err(|e| fail("bitrate", &e))?;
        builder
            .set_quality(Quality::Best)
            .map_err(|e| fail("quality", &e))?;
        let encoder = builder.build().map_err(|e| fail("init", &e))?;

        debug!(channels, sample_rate, bitrate_kbps, "LAME encoder ready");
        Ok(Box::new(LameSession {
            encoder,
            stereo: channels > 1,
        }))
    }
}

fn bitrate(kbps: u32) -> Result<Bitrate, ConvertError> {
    Ok(match kbps {
        64 => Bitrate::Kbps64,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => {
            return Err(ConvertError::InvalidConfig(format!(
                "unsupported MP3 bitrate {other} kbps"
            )))
        }
    })
}

struct LameSession {
    encoder: Encoder,
    stereo: bool,
}

impl BlockEncoder for LameSession {
    fn encode_block(
        &mut self,
        left: &[i16],
        right: Option<&[i16]>,
    ) -> Result<Vec<u8>, ConvertError> {
        let mut out = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(left.len()));
        let result = match (self.stereo, right) {
            (true, Some(right)) => self.encoder.encode_to_vec(DualPcm { left, right }, &mut out),
            (false, None) => self.encoder.encode_to_vec(MonoPcm(left), &mut out),
            _ => {
                return Err(ConvertError::Internal(
                    "block channel layout does not match encoder".into(),
                ))
            }
        };
        result.map_err(|e| ConvertError::encode(Stage::Encode, format!("LAME encode: {e:?}")))?;
        Ok(out)
    }

    fn flush(&mut self) -> Result<Vec<u8>, ConvertError> {
        let mut out = Vec::with_capacity(FLUSH_RESERVE);
        self.encoder
            .flush_to_vec::<FlushNoGap>(&mut out)
            .map_err(|e| ConvertError::encode(Stage::Encode, format!("LAME flush: {e:?}")))?;
        Ok(out)
    }
}

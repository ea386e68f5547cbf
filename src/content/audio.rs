//! PCM sample buffers to WAV

use std::io::Cursor;

use crate::error::LlmError;
use crate::types::AudioSampleBuffer;

/// Convert a float sample in [-1, 1] to 16-bit PCM.
fn to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encode a decoded sample buffer as 16-bit interleaved WAV.
///
/// Only mono and stereo buffers are accepted.
pub fn encode_wav(buffer: &AudioSampleBuffer) -> Result<Vec<u8>, LlmError> {
    let channels = buffer.number_of_channels();
    if channels == 0 || buffer.length() == 0 {
        return Err(LlmError::InvalidInput(
            "Audio sample buffer contains no samples".to_string(),
        ));
    }
    if channels > 2 {
        return Err(LlmError::UnsupportedOperation(format!(
            "Audio sample buffers with {channels} channels are not supported"
        )));
    }
    if buffer.sample_rate == 0 {
        return Err(LlmError::InvalidInput(
            "Audio sample buffer has a zero sample rate".to_string(),
        ));
    }

    let spec = hound::WavSpec {
        channels: channels as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for frame in 0..buffer.length() {
            for channel in &buffer.channels {
                writer.write_sample(to_i16(channel[frame]))?;
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

//! 16-bit PCM wire format: float frames in, base64 little-endian i16 out, and back.

use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use super::{INPUT_MIME_TYPE, PCM_SCALE};
use crate::api::types::{EncodedBlob, PlaybackChunk};
use crate::error::{DecodeError, FormatError};

/// Quantise one float sample to i16.
///
/// Out-of-range input clamps to the i16 limits instead of wrapping: Rust's
/// float-to-int `as` cast saturates (and maps NaN to 0). In-range values
/// truncate toward zero.
#[inline]
pub fn quantize(sample: f32) -> i16 {
    (sample * PCM_SCALE) as i16
}

/// Encode a microphone frame as `audio/pcm;rate=16000`.
pub fn encode_frame(samples: &[f32]) -> EncodedBlob {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&quantize(sample).to_le_bytes());
    }

    EncodedBlob::new(general_purpose::STANDARD.encode(&bytes), INPUT_MIME_TYPE)
}

/// Inverse of the text wrapping done by [`encode_frame`].
pub fn decode_blob(text: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(general_purpose::STANDARD.decode(text)?)
}

/// Interpret raw bytes as interleaved 16-bit little-endian PCM.
pub fn decode_audio_data(
    bytes: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<PlaybackChunk, FormatError> {
    let frame_bytes = 2 * channels as usize;
    if frame_bytes == 0 || bytes.len() % frame_bytes != 0 {
        return Err(FormatError {
            len: bytes.len(),
            channels,
            frame_bytes,
        });
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM_SCALE)
        .collect();

    Ok(PlaybackChunk {
        samples: Arc::from(samples),
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_i16(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect()
    }

    #[test]
    fn test_encode_tags_input_mime_type() {
        let blob = encode_frame(&[0.0; 8]);
        assert_eq!(blob.mime_type, "audio/pcm;rate=16000");
    }

    #[test]
    fn test_round_trip_matches_quantization() {
        let samples: Vec<f32> = (0..4096)
            .map(|i| ((i as f32) * 0.013).sin() * 0.9)
            .collect();

        let blob = encode_frame(&samples);
        let bytes = decode_blob(&blob.data).unwrap();

        assert_eq!(bytes.len(), samples.len() * 2);
        let expected: Vec<i16> = samples.iter().map(|&s| quantize(s)).collect();
        assert_eq!(to_i16(&bytes), expected);
    }

    #[test]
    fn test_quantize_scales_and_truncates() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(0.5), 16384);
        assert_eq!(quantize(-0.5), -16384);
        assert_eq!(quantize(-1.0), i16::MIN);
        // truncation toward zero
        assert_eq!(quantize(0.00002), 0);
        assert_eq!(quantize(-0.00002), 0);
    }

    #[test]
    fn test_out_of_range_clamps_instead_of_wrapping() {
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(2.5), i16::MAX);
        assert_eq!(quantize(-3.0), i16::MIN);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn test_decode_blob_rejects_invalid_text() {
        assert!(decode_blob("not base64!!").is_err());
        assert_eq!(decode_blob("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decode_audio_data_duration() {
        // 12000 mono samples at 24 kHz = 0.5 s
        let bytes = vec![0u8; 12000 * 2];
        let chunk = decode_audio_data(&bytes, 24000, 1).unwrap();
        assert_eq!(chunk.frames(), 12000);
        assert!((chunk.duration() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_decode_audio_data_stereo_counts_frames() {
        let bytes = vec![0u8; 4800 * 2 * 2];
        let chunk = decode_audio_data(&bytes, 24000, 2).unwrap();
        assert_eq!(chunk.frames(), 4800);
        assert!((chunk.duration() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_decode_audio_data_rejects_partial_frames() {
        let err = decode_audio_data(&[0u8; 3], 24000, 1).unwrap_err();
        assert_eq!(err.len, 3);
        assert_eq!(err.frame_bytes, 2);

        // whole samples but not whole stereo frames
        assert!(decode_audio_data(&[0u8; 6], 24000, 2).is_err());
        assert!(decode_audio_data(&[0u8; 4], 24000, 0).is_err());
    }

    #[test]
    fn test_decode_audio_data_normalises_samples() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&i16::MIN.to_le_bytes());
        bytes.extend_from_slice(&16384i16.to_le_bytes());
        let chunk = decode_audio_data(&bytes, 24000, 1).unwrap();
        assert_eq!(&chunk.samples[..], &[-1.0, 0.5]);
    }
}

//! Canonical audio normalization.
//!
//! Every user recording is converted to one canonical container before it
//! enters the pipeline: mono 16-bit PCM WAV at the source sample rate. The
//! conversion is deterministic — the same input always produces
//! byte-identical output — so transcription never sees device- or
//! codec-specific variance.

use std::borrow::Cow;

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;
use tracing::debug;

use murmur_core::error::{MurmurError, Result};

/// A recording converted to the canonical container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAudio {
    /// Complete canonical WAV file: 44-byte header + 16-bit LE samples.
    pub wav: Vec<u8>,
    pub sample_rate: u32,
    pub sample_count: usize,
}

/// Decode an arbitrary compressed or raw recording, down-mix to mono, and
/// serialize to the canonical container. Fails with
/// [`MurmurError::UnsupportedAudioFormat`] when the container or codec
/// cannot be decoded.
pub fn normalize_recording(bytes: &[u8]) -> Result<NormalizedAudio> {
    let (samples, sample_rate) = decode_mono(bytes)?;
    let wav = encode_canonical_wav(&samples, sample_rate);
    debug!(
        sample_rate,
        sample_count = samples.len(),
        wav_bytes = wav.len(),
        "Normalized recording"
    );
    Ok(NormalizedAudio {
        wav,
        sample_rate,
        sample_count: samples.len(),
    })
}

/// Average all channels of one decoded buffer into the mono sample vector.
fn downmix<T>(mono: &mut Vec<f32>, buf: Cow<AudioBuffer<T>>)
where
    T: symphonia::core::sample::Sample,
    f32: FromSample<T>,
{
    let channels = buf.spec().channels.count();
    if channels == 0 {
        return;
    }
    for frame in 0..buf.frames() {
        let mut acc = 0.0f32;
        for ch in 0..channels {
            acc += f32::from_sample(buf.chan(ch)[frame]);
        }
        mono.push(acc / channels as f32);
    }
}

/// Decode any supported container/codec into mono f32 samples.
fn decode_mono(bytes: &[u8]) -> Result<(Vec<f32>, u32)> {
    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &Default::default(), &Default::default())
        .map_err(|e| MurmurError::UnsupportedAudioFormat(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            MurmurError::UnsupportedAudioFormat("no decodable audio track".into())
        })?;

    let sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        MurmurError::UnsupportedAudioFormat("unknown sample rate".into())
    })?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MurmurError::UnsupportedAudioFormat(format!("unsupported codec: {e}")))?;
    let track_id = track.id;

    let mut mono: Vec<f32> = Vec::new();
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = decoder
            .decode(&packet)
            .map_err(|e| MurmurError::UnsupportedAudioFormat(e.to_string()))?;
        match decoded {
            AudioBufferRef::F32(buf) => downmix(&mut mono, buf),
            AudioBufferRef::F64(buf) => downmix(&mut mono, buf),
            AudioBufferRef::U8(buf) => downmix(&mut mono, buf),
            AudioBufferRef::U16(buf) => downmix(&mut mono, buf),
            AudioBufferRef::U24(buf) => downmix(&mut mono, buf),
            AudioBufferRef::U32(buf) => downmix(&mut mono, buf),
            AudioBufferRef::S8(buf) => downmix(&mut mono, buf),
            AudioBufferRef::S16(buf) => downmix(&mut mono, buf),
            AudioBufferRef::S24(buf) => downmix(&mut mono, buf),
            AudioBufferRef::S32(buf) => downmix(&mut mono, buf),
        }
    }

    Ok((mono, sample_rate))
}

/// Scale one sample to signed 16-bit: clamp to [-1, 1], negative values
/// scale by 32768 and non-negative by 32767.
fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Serialize mono samples to the canonical WAV container: a 44-byte header
/// (PCM format code 1, 1 channel, 16 bits per sample) followed by the
/// samples as signed 16-bit little-endian integers.
pub fn encode_canonical_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = samples.len() * 2; // 2 bytes per i16 sample
    let byte_rate = sample_rate * 2;
    let block_align = 2u16;
    let file_size = 36 + data_len as u32;

    let mut wav = Vec::with_capacity(44 + data_len);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&file_size.to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_len as u32).to_le_bytes());
    for &sample in samples {
        wav.extend_from_slice(&sample_to_i16(sample).to_le_bytes());
    }

    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hand-roll an interleaved stereo 16-bit WAV for decode tests.
    fn stereo_wav(sample_rate: u32, frames: &[(i16, i16)]) -> Vec<u8> {
        let data_len = frames.len() * 4;
        let mut wav = Vec::with_capacity(44 + data_len);
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&(sample_rate * 4).to_le_bytes());
        wav.extend_from_slice(&4u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_len as u32).to_le_bytes());
        for &(left, right) in frames {
            wav.extend_from_slice(&left.to_le_bytes());
            wav.extend_from_slice(&right.to_le_bytes());
        }
        wav
    }

    #[test]
    fn test_canonical_header_layout() {
        let samples = vec![0.0f32; 16000]; // 1 second at 16kHz
        let wav = encode_canonical_wav(&samples, 16000);

        assert_eq!(wav.len(), 44 + 16000 * 2);
        assert_eq!(&wav[0..4], b"RIFF");
        let riff_size = u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]);
        assert_eq!(riff_size, 36 + 16000 * 2);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");

        let fmt_size = u32::from_le_bytes([wav[16], wav[17], wav[18], wav[19]]);
        assert_eq!(fmt_size, 16);
        let format_code = u16::from_le_bytes([wav[20], wav[21]]);
        assert_eq!(format_code, 1);
        let channels = u16::from_le_bytes([wav[22], wav[23]]);
        assert_eq!(channels, 1);
        let rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
        assert_eq!(rate, 16000);
        let byte_rate = u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]);
        assert_eq!(byte_rate, 32000);
        let block_align = u16::from_le_bytes([wav[32], wav[33]]);
        assert_eq!(block_align, 2);
        let bits = u16::from_le_bytes([wav[34], wav[35]]);
        assert_eq!(bits, 16);

        assert_eq!(&wav[36..40], b"data");
        let data_len = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
        assert_eq!(data_len, 16000 * 2);
    }

    #[test]
    fn test_sample_scaling_and_clamping() {
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32768);
        assert_eq!(sample_to_i16(-0.5), -16384);
        assert_eq!(sample_to_i16(0.5), 16383);
        // Out-of-range input clamps before scaling.
        assert_eq!(sample_to_i16(2.0), 32767);
        assert_eq!(sample_to_i16(-2.0), -32768);
    }

    #[test]
    fn test_stereo_input_downmixes_to_mono() {
        // L = +0.5, R = -0.5 averages to silence; L = R = 0.5 stays 0.5.
        let input = stereo_wav(44_100, &[(16384, -16384), (16384, 16384)]);
        let normalized = normalize_recording(&input).unwrap();

        assert_eq!(normalized.sample_rate, 44_100);
        assert_eq!(normalized.sample_count, 2);

        let channels = u16::from_le_bytes([normalized.wav[22], normalized.wav[23]]);
        assert_eq!(channels, 1);
        let rate = u32::from_le_bytes([
            normalized.wav[24],
            normalized.wav[25],
            normalized.wav[26],
            normalized.wav[27],
        ]);
        assert_eq!(rate, 44_100);
        let data_len = u32::from_le_bytes([
            normalized.wav[40],
            normalized.wav[41],
            normalized.wav[42],
            normalized.wav[43],
        ]);
        assert_eq!(data_len as usize, 2 * normalized.sample_count);

        let first = i16::from_le_bytes([normalized.wav[44], normalized.wav[45]]);
        assert_eq!(first, 0);
        let second = i16::from_le_bytes([normalized.wav[46], normalized.wav[47]]);
        assert_eq!(second, 16383); // 0.5 scaled by 32767
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let input = stereo_wav(22_050, &[(100, -300), (5000, 5000), (-32768, 32767)]);
        let first = normalize_recording(&input).unwrap();
        let second = normalize_recording(&input).unwrap();
        assert_eq!(first.wav, second.wav);
        assert_eq!(first.sample_count, second.sample_count);
    }

    #[test]
    fn test_undecodable_input_is_rejected() {
        let err = normalize_recording(b"definitely not audio").unwrap_err();
        assert!(matches!(err, MurmurError::UnsupportedAudioFormat(_)));
    }
}

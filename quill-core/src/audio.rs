//! Speech audio returned by the speech model.
//!
//! The model answers with raw 16-bit little-endian PCM, mono, usually at
//! 24 kHz, base64-encoded. This module decodes it, hands normalized samples
//! to the player and writes WAV files for export.

use base64::Engine;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

/// Sample rate used when the mime type does not name one.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Errors from audio handling.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Invalid audio payload: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoded mono PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm16 {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl Pcm16 {
    /// Decode raw little-endian bytes. A trailing odd byte is dropped.
    pub fn from_bytes(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self {
            samples,
            sample_rate,
        }
    }

    /// Decode a base64 payload.
    pub fn from_base64(data: &str, sample_rate: u32) -> Result<Self, AudioError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| AudioError::Decode(e.to_string()))?;
        Ok(Self::from_bytes(&bytes, sample_rate))
    }

    /// Decode an inline reply, reading the rate from its mime type.
    pub fn from_inline(inline: &gemini::InlineData) -> Result<Self, AudioError> {
        Self::from_base64(&inline.data, sample_rate_from_mime(&inline.mime_type))
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples scaled to [-1.0, 1.0).
    pub fn normalized(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| s as f32 / 32768.0).collect()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Encode as a WAV file (RIFF, PCM, 16-bit mono).
    pub fn to_wav(&self) -> Vec<u8> {
        let data_len = (self.samples.len() * 2) as u32;
        let byte_rate = self.sample_rate * 2;

        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes()); // block align
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for sample in &self.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    /// Write a WAV file.
    pub async fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), AudioError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, self.to_wav()).await?;
        Ok(())
    }
}

/// Read `rate=NNNN` from a mime type such as `audio/L16;codec=pcm;rate=24000`.
pub fn sample_rate_from_mime(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_odd_byte_dropped() {
        let pcm = Pcm16::from_bytes(&[0x00, 0x40, 0xFF], DEFAULT_SAMPLE_RATE);
        assert_eq!(pcm.samples(), &[0x4000]);
    }

    #[test]
    fn test_normalized() {
        let pcm = Pcm16::from_bytes(&[0x00, 0x80, 0x00, 0x40, 0x00, 0x00], DEFAULT_SAMPLE_RATE);
        assert_eq!(pcm.normalized(), vec![-1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_base64_decode() {
        // Two samples: 1 and -1.
        let pcm = Pcm16::from_base64("AQD//w==", DEFAULT_SAMPLE_RATE).unwrap();
        assert_eq!(pcm.samples(), &[1, -1]);
        assert!(Pcm16::from_base64("not base64!", DEFAULT_SAMPLE_RATE).is_err());
    }

    #[test]
    fn test_sample_rate_from_mime() {
        assert_eq!(sample_rate_from_mime("audio/L16;codec=pcm;rate=16000"), 16000);
        assert_eq!(sample_rate_from_mime("audio/pcm"), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn test_duration() {
        let pcm = Pcm16::from_bytes(&vec![0u8; 48_000], DEFAULT_SAMPLE_RATE);
        assert_eq!(pcm.duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_wav_header() {
        let pcm = Pcm16::from_bytes(&[1, 0, 2, 0], DEFAULT_SAMPLE_RATE);
        let wav = pcm.to_wav();
        assert_eq!(wav.len(), 48);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 24_000);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 4);
        assert_eq!(&wav[44..], &[1, 0, 2, 0]);
    }

    #[tokio::test]
    async fn test_write_wav() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("audio").join("scene.wav");

        let pcm = Pcm16::from_bytes(&[0, 0, 0, 0], DEFAULT_SAMPLE_RATE);
        pcm.write_wav(&path).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 48);
    }
}

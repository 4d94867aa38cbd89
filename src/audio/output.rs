//! WAV encoding and decoding
//!
//! The server answers `/voice` with an in-memory WAV container and reads
//! the inference worker's WAV replies back into samples.

use std::io::Cursor;

use crate::core::error::{InferenceStage, Result, TtsError};

/// Synthesized audio: sample rate plus mono samples normalized to [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl SynthesizedAudio {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Audio codec for the HTTP surface
pub struct AudioOutput;

impl AudioOutput {
    /// Encode samples as a mono 16-bit PCM WAV file held in memory
    pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_error)?;
            for &sample in samples {
                let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(scaled).map_err(wav_error)?;
            }
            writer.finalize().map_err(wav_error)?;
        }

        Ok(cursor.into_inner())
    }

    /// Decode a WAV file (integer or float PCM) into mono f32 samples.
    /// Multi-channel input keeps only the first channel.
    pub fn decode_wav(bytes: &[u8]) -> Result<SynthesizedAudio> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(decode_error)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_error)?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(decode_error)?
            }
        };

        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved.into_iter().step_by(channels).collect()
        };

        Ok(SynthesizedAudio::new(spec.sample_rate, samples))
    }
}

fn wav_error(err: hound::Error) -> TtsError {
    TtsError::Internal {
        message: format!("WAV encoding failed: {}", err),
        location: Some("AudioOutput::encode_wav".to_string()),
    }
}

fn decode_error(err: hound::Error) -> TtsError {
    TtsError::inference(InferenceStage::AudioDecode, err.to_string())
}

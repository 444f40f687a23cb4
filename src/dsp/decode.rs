//! Background-track decoding (WAV via `hound`, MP3 via `minimp3`).
//!
//! Everything is downmixed to mono; the tone chains carry the stereo image.

use std::io::Cursor;

use crate::error::{NadaError, NadaResult};

use super::track::SampleBuffer;

/// Container formats we can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Sniff the format from the leading bytes. Anything that is not RIFF
    /// is assumed to be MPEG audio.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            AudioFormat::Wav
        } else {
            AudioFormat::Mp3
        }
    }
}

/// Decode a complete WAV or MP3 file held in memory.
pub fn decode_track(bytes: &[u8]) -> NadaResult<SampleBuffer> {
    if bytes.is_empty() {
        return Err(NadaError::decode("empty audio file"));
    }
    match AudioFormat::detect(bytes) {
        AudioFormat::Wav => decode_wav(bytes),
        AudioFormat::Mp3 => decode_mp3(bytes),
    }
}

pub fn decode_wav(bytes: &[u8]) -> NadaResult<SampleBuffer> {
    let mut reader =
        hound::WavReader::new(Cursor::new(bytes)).map_err(|e| NadaError::decode(format!("wav: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| NadaError::decode(format!("wav: {e}")))?,
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()
                .map_err(|e| NadaError::decode(format!("wav: {e}")))?
        }
    };

    checked(SampleBuffer::from_interleaved_f32(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    ))
}

pub fn decode_mp3(bytes: &[u8]) -> NadaResult<SampleBuffer> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut mono: Vec<f64> = Vec::new();
    let mut sample_rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(minimp3::Frame {
                data,
                sample_rate: rate,
                channels,
                ..
            }) => {
                if channels == 0 {
                    continue;
                }
                sample_rate = rate.max(0) as u32;
                mono.extend(data.chunks(channels).map(|frame| {
                    frame.iter().map(|&s| s as f64 / 32768.0).sum::<f64>() / frame.len() as f64
                }));
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => continue,
            Err(e) => return Err(NadaError::decode(format!("mp3: {e:?}"))),
        }
    }

    checked(SampleBuffer::new(mono, sample_rate))
}

fn checked(buffer: SampleBuffer) -> NadaResult<SampleBuffer> {
    if buffer.is_empty() || buffer.sample_rate == 0 {
        return Err(NadaError::decode("no audio frames decoded"));
    }
    Ok(buffer)
}

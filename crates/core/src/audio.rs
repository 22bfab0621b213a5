//! Placeholder Speech Rendering
//!
//! Writes silent PCM WAV artifacts sized to the response text. Real
//! text-to-speech is out of scope; downstream consumers only rely on the
//! artifact descriptor and on a playable file existing at the path. A
//! rendering failure must never abort the turn: the renderer degrades to
//! a one-second placeholder and keeps going.

use crate::generator::estimate_tokens;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SAMPLE_RATE: u32 = 24_000;
const BYTES_PER_SAMPLE: u32 = 2;
/// Rough speaking pace used to size the artifact.
const WORDS_PER_SECOND: usize = 3;

/// Descriptor for a rendered audio artifact. Field names are part of the
/// output record contract.
#[derive(Debug, Clone, Serialize)]
pub struct AudioArtifact {
    pub audio_file: String,
    pub voice_used: String,
    pub audio_tokens: u32,
    pub duration_seconds: u32,
}

/// Renders spoken responses into an uploads directory.
pub struct SpeechRenderer {
    out_dir: PathBuf,
}

impl SpeechRenderer {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    /// Renders `text` as a silent WAV named `{file_name}.wav`.
    ///
    /// Duration is `max(1, words / 3)` seconds. On any write failure a
    /// one-second placeholder is attempted instead; even if that also
    /// fails, a descriptor is still returned and the turn continues.
    pub fn render(&self, text: &str, voice: &str, file_name: &str) -> AudioArtifact {
        let words = text.split_whitespace().count();
        let duration_seconds = (words / WORDS_PER_SECOND).max(1) as u32;
        let path = self.out_dir.join(format!("{file_name}.wav"));

        let duration_seconds = match self.write_silence(&path, duration_seconds) {
            Ok(()) => {
                info!(path = %path.display(), duration_seconds, voice, "rendered audio artifact");
                duration_seconds
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "audio rendering failed, writing 1s placeholder");
                if let Err(err) = self.write_silence(&path, 1) {
                    warn!(path = %path.display(), error = %err, "placeholder audio write failed as well");
                }
                1
            }
        };

        AudioArtifact {
            audio_file: path.display().to_string(),
            voice_used: voice.to_string(),
            audio_tokens: estimate_tokens(text),
            duration_seconds,
        }
    }

    fn write_silence(&self, path: &Path, duration_seconds: u32) -> io::Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let samples = SAMPLE_RATE * duration_seconds;
        let pcm = vec![0u8; (samples * BYTES_PER_SAMPLE) as usize];
        write_wav_pcm16(path, &pcm, SAMPLE_RATE)
    }
}

/// Writes 16-bit mono PCM bytes under a minimal RIFF/WAVE header.
fn write_wav_pcm16(path: &Path, pcm: &[u8], sample_rate: u32) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let data_len = pcm.len() as u32;
    let byte_rate = sample_rate * BYTES_PER_SAMPLE;

    out.write_all(b"RIFF")?;
    out.write_all(&(36 + data_len).to_le_bytes())?;
    out.write_all(b"WAVE")?;

    out.write_all(b"fmt ")?;
    out.write_all(&16u32.to_le_bytes())?; // PCM header length
    out.write_all(&1u16.to_le_bytes())?; // PCM format
    out.write_all(&1u16.to_le_bytes())?; // mono
    out.write_all(&sample_rate.to_le_bytes())?;
    out.write_all(&byte_rate.to_le_bytes())?;
    out.write_all(&(BYTES_PER_SAMPLE as u16).to_le_bytes())?; // block align
    out.write_all(&16u16.to_le_bytes())?; // bits per sample

    out.write_all(b"data")?;
    out.write_all(&data_len.to_le_bytes())?;
    out.write_all(pcm)?;
    out.flush()
}

//! Audio test file generation
//!
//! Silent mono WAV files with an exact frame count, so probed durations are
//! known in advance.

use hound::{WavSpec, WavWriter};
use std::path::{Path, PathBuf};

/// Standard test sample rate (8 kHz keeps files small)
pub const TEST_SAMPLE_RATE: u32 = 8000;

/// Generate a silent mono WAV file of `duration_ms`
pub fn generate_silent_wav<P: AsRef<Path>>(path: P, duration_ms: u64) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: TEST_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    let total_frames = (TEST_SAMPLE_RATE as u64 * duration_ms) / 1000;
    for _ in 0..total_frames {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write a track manifest pointing both renditions at local files
pub fn write_track_manifest(
    dir: &Path,
    title: &str,
    compressed: &Path,
    lossless: &Path,
) -> std::io::Result<PathBuf> {
    let path = dir.join("track.toml");
    let manifest = format!(
        "title = {title:?}\n\n[renditions]\ncompressed = {compressed:?}\nlossless = {lossless:?}\n",
        compressed = compressed.display().to_string(),
        lossless = lossless.display().to_string(),
    );
    std::fs::write(&path, manifest)?;
    Ok(path)
}

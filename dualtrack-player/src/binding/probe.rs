//! Duration probing using symphonia
//!
//! Reads container headers only; no packets are decoded. The duration comes
//! from the default audio track's frame count and time base (or sample rate
//! when the container has no time base).

use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Probe an in-memory resource for its duration in seconds.
///
/// Returns `Ok(None)` when the container is readable but does not declare a
/// length (live streams, MP3 without a Xing/VBRI header).
///
/// # Errors
/// - Unsupported or corrupt container
/// - No audio track
pub fn probe_duration(bytes: Vec<u8>, extension: Option<&str>) -> Result<Option<f64>> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Load(format!("Failed to probe format: {}", e)))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Load("No audio track found".to_string()))?;

    let params = &track.codec_params;
    let duration = match (params.n_frames, params.time_base, params.sample_rate) {
        (Some(frames), Some(time_base), _) => {
            let time = time_base.calc_time(frames);
            Some(time.seconds as f64 + time.frac)
        }
        (Some(frames), None, Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
        _ => None,
    };

    debug!(
        "Probed track: frames={:?}, sample_rate={:?}, duration={:?}",
        params.n_frames, params.sample_rate, duration
    );

    Ok(duration)
}

use std::path::Path;

use anyhow::Context;
use hound::WavReader;

pub fn wav_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let reader =
        WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    Ok(frames / spec.sample_rate as f64)
}

#[cfg(test)]
pub(crate) fn write_silence(path: &Path, seconds: f64) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for _ in 0..(seconds * spec.sample_rate as f64) as usize {
        writer.write_sample(0i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_of_generated_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_silence(&path, 1.5).unwrap();
        let duration = wav_duration_seconds(&path).unwrap();
        assert!((duration - 1.5).abs() < 1e-3);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(wav_duration_seconds(Path::new("/nonexistent/voice.wav")).is_err());
    }
}

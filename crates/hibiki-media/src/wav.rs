//! WAV clip decoding. The spec requires 16-bit PCM only; anything else
//! fails the load rather than silently resampling bit depth.

use std::path::Path;

use hibiki_core::clip::{AudioClip, Clip};

use crate::error::MediaError;

pub fn load_wav_clip(path: &Path, is_loop: bool) -> Result<Clip, MediaError> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| MediaError::Wav(format!("failed to open {}: {e}", path.display())))?;

    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(MediaError::Wav(format!(
            "{} is not 16-bit PCM (format={:?}, bits={})",
            path.display(),
            spec.sample_format,
            spec.bits_per_sample
        )));
    }

    let channels = spec.channels;
    let sample_rate = spec.sample_rate as f64;

    let samples: Vec<f32> = reader
        .into_samples::<i16>()
        .filter_map(Result::ok)
        .map(|s| s as f32 / 32768.0)
        .collect();

    if samples.is_empty() {
        return Err(MediaError::Wav(format!("{} has no frames", path.display())));
    }

    let frame_count = samples.len() / channels.max(1) as usize;
    let duration_sec = frame_count as f64 / sample_rate;
    let waveform_summary = AudioClip::compute_waveform_summary(&samples, channels);

    Ok(Clip::Audio(AudioClip {
        source_path: path.display().to_string(),
        is_loop,
        samples,
        channels,
        sample_rate,
        duration_sec,
        waveform_summary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static FIXTURE_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_wav_path(name: &str) -> std::path::PathBuf {
        let n = FIXTURE_COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("hibiki-media-test-{name}-{n}.wav"))
    }

    fn write_pcm16(path: &std::path::Path, channels: u16, sample_rate: u32, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &sample in frames {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_stereo_16bit_pcm() {
        let path = temp_wav_path("stereo");
        write_pcm16(&path, 2, 44_100, &[0, 0, i16::MAX, i16::MIN, 0, 0]);

        let clip = load_wav_clip(&path, true).unwrap();
        let Clip::Audio(audio) = clip else { panic!("expected an audio clip") };
        assert_eq!(audio.channels, 2);
        assert!(audio.is_loop);
        assert_eq!(audio.samples.len(), 6);
        assert!((audio.samples[2] - 1.0).abs() < 1e-3);
        assert!((audio.duration_sec - 3.0 / 44_100.0).abs() < 1e-9);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_24_bit_pcm() {
        let path = temp_wav_path("24bit");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 24,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i32).unwrap();
        writer.finalize().unwrap();

        let err = load_wav_clip(&path, false).unwrap_err();
        assert!(matches!(err, MediaError::Wav(_)));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn frame_at_reads_back_written_samples() {
        let path = temp_wav_path("frame-at");
        write_pcm16(&path, 2, 44_100, &[0, 0, i16::MAX, i16::MIN]);

        let clip = load_wav_clip(&path, false).unwrap();
        let Clip::Audio(audio) = clip else { panic!("expected an audio clip") };
        // 1.5 sample periods in: unambiguously truncates to frame index 1.
        let (l, r) = audio.frame_at(1.5 / 44_100.0);
        assert!((l - 1.0).abs() < 1e-3);
        assert!((r - (-1.0)).abs() < 1e-3);

        std::fs::remove_file(&path).ok();
    }
}

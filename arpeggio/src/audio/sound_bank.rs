//! 音色库：每个琴键一段预解码的 PCM 采样

use crate::audio::tone::{render_tone, ToneConfig};
use crate::catalog::{KeyId, KeySpec, NoteCatalog, VoiceClass};
use crate::error::AudioError;
use rodio::{Decoder, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// 共享的只读采样数据，克隆只增加引用计数
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    channels: u16,
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl SampleBuffer {
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
            samples: samples.into(),
        }
    }

    pub fn decode_file(path: &Path) -> Result<Self, AudioError> {
        let file = File::open(path).map_err(|source| AudioError::SampleIo {
            path: path.to_path_buf(),
            source,
        })?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|source| AudioError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();
        Ok(Self::new(channels, sample_rate, samples))
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as f64 / self.channels as f64;
        Duration::from_secs_f64(frames / self.sample_rate as f64)
    }

    pub fn source(&self) -> PcmSource {
        PcmSource {
            buffer: self.clone(),
            position: 0,
        }
    }
}

/// 一次播放：从头读取共享采样
pub struct PcmSource {
    buffer: SampleBuffer,
    position: usize,
}

impl Iterator for PcmSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.buffer.samples.get(self.position).copied()?;
        self.position += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.samples.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl Source for PcmSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.buffer.samples.len().saturating_sub(self.position))
    }

    fn channels(&self) -> u16 {
        self.buffer.channels
    }

    fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.buffer.duration())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SoundBank {
    white: Vec<Option<SampleBuffer>>,
    black: Vec<Option<SampleBuffer>>,
}

impl SoundBank {
    /// 从 `<dir>/<sound_name>.wav` 读取每个键的采样；读不到的键用合成音代替
    pub fn load_dir(dir: &Path, catalog: &NoteCatalog, synth: &ToneConfig) -> Self {
        let mut decoded = 0usize;
        let bank = Self::build(catalog, |spec| {
            let path = dir.join(format!("{}.wav", spec.sound_name));
            match SampleBuffer::decode_file(&path) {
                Ok(buffer) => {
                    decoded += 1;
                    buffer
                }
                Err(err @ AudioError::Decode { .. }) => {
                    log::warn!("{err}; using synthesized tone");
                    synthesized(spec.pitch, synth)
                }
                Err(err) => {
                    log::debug!("{err}; using synthesized tone");
                    synthesized(spec.pitch, synth)
                }
            }
        });
        let total = catalog.keys().count();
        if decoded < total {
            log::info!(
                "Loaded {decoded}/{total} samples from {}, the rest are synthesized",
                dir.display()
            );
        } else {
            log::info!("Loaded {total} samples from {}", dir.display());
        }
        bank
    }

    pub fn synthesized(catalog: &NoteCatalog, synth: &ToneConfig) -> Self {
        Self::build(catalog, |spec| synthesized(spec.pitch, synth))
    }

    fn build<F>(catalog: &NoteCatalog, mut make: F) -> Self
    where
        F: FnMut(&KeySpec) -> SampleBuffer,
    {
        let white = catalog.white_keys().iter().map(|spec| Some(make(spec))).collect();
        let black = catalog.black_keys().iter().map(|spec| Some(make(spec))).collect();
        Self { white, black }
    }

    pub fn get(&self, key: KeyId) -> Option<&SampleBuffer> {
        let slots = match key.class {
            VoiceClass::White => &self.white,
            VoiceClass::Black => &self.black,
        };
        slots.get(key.index)?.as_ref()
    }

    pub fn insert(&mut self, key: KeyId, buffer: SampleBuffer) {
        let slots = match key.class {
            VoiceClass::White => &mut self.white,
            VoiceClass::Black => &mut self.black,
        };
        if slots.len() <= key.index {
            slots.resize(key.index + 1, None);
        }
        slots[key.index] = Some(buffer);
    }
}

fn synthesized(pitch: u8, synth: &ToneConfig) -> SampleBuffer {
    SampleBuffer::new(1, synth.sample_rate, render_tone(pitch, synth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_synth() -> ToneConfig {
        ToneConfig {
            sample_rate: 8_000,
            attack_ms: 1.0,
            decay_ms: 5.0,
            length_ms: 20.0,
            fade_ms: 5.0,
        }
    }

    #[test]
    fn missing_directory_falls_back_to_synth_for_every_key() {
        let catalog = NoteCatalog::piano();
        let dir = tempfile::tempdir().unwrap();
        let bank = SoundBank::load_dir(&dir.path().join("nope"), &catalog, &short_synth());
        for spec in catalog.keys() {
            let buffer = bank.get(spec.key).unwrap();
            assert_eq!(buffer.channels(), 1);
            assert_eq!(buffer.sample_rate(), 8_000);
            assert!(!buffer.is_empty());
        }
        assert!(bank.get(KeyId::white(52)).is_none());
    }

    #[test]
    fn undecodable_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("C4.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(matches!(
            SampleBuffer::decode_file(&path),
            Err(AudioError::Decode { .. })
        ));
        assert!(matches!(
            SampleBuffer::decode_file(&dir.path().join("D4.wav")),
            Err(AudioError::SampleIo { .. })
        ));
    }

    #[test]
    fn source_plays_buffer_once() {
        let buffer = SampleBuffer::new(2, 4, vec![0.1, 0.2, 0.3, 0.4]);
        let source = buffer.source();
        assert_eq!(source.channels(), 2);
        assert_eq!(source.total_duration(), Some(Duration::from_millis(500)));
        assert_eq!(source.collect::<Vec<_>>(), vec![0.1, 0.2, 0.3, 0.4]);
        // The buffer is shared, a second source starts from the top again.
        assert_eq!(buffer.source().next(), Some(0.1));
    }

    #[test]
    fn insert_replaces_single_key() {
        let catalog = NoteCatalog::piano();
        let mut bank = SoundBank::synthesized(&catalog, &short_synth());
        let c4 = catalog.lookup("C4").unwrap();
        bank.insert(c4, SampleBuffer::new(1, 44_100, vec![0.5; 3]));
        assert_eq!(bank.get(c4).unwrap().len(), 3);
        assert_eq!(bank.get(c4).unwrap().sample_rate(), 44_100);
    }
}

use crate::dispatcher::{MAX_OCTAVE, MIN_OCTAVE};
use crate::error::ConfigError;
use crate::flash::DEFAULT_FLASH_FRAMES;
use crate::voices::{LimiterConfig, DEFAULT_BASE_VOLUME, DEFAULT_LIMITER_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 初始化与运行时配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PianoOptions {
    pub limiter_threshold: usize,
    pub base_volume: f32,
    /// 混音声道上限
    pub channel_count: usize,
    pub flash_frames: u32,
    /// 从头播放时的起始位置（毫秒）
    pub start_offset_ms: i64,
    pub left_octave: u8,
    pub right_octave: u8,
    /// 第一次按下播放键时加载的 MIDI 文件
    pub midi_path: Option<PathBuf>,
    pub notes_dir: PathBuf,
    pub frames_per_second: u32,
}

impl Default for PianoOptions {
    fn default() -> Self {
        Self {
            limiter_threshold: DEFAULT_LIMITER_THRESHOLD,
            base_volume: DEFAULT_BASE_VOLUME,
            channel_count: 512,
            flash_frames: DEFAULT_FLASH_FRAMES,
            start_offset_ms: 0,
            left_octave: 4,
            right_octave: 5,
            midi_path: None,
            notes_dir: PathBuf::from("assets/notes"),
            frames_per_second: 60,
        }
    }
}

impl PianoOptions {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 配置文件不存在时使用默认值
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let options: Self = serde_json::from_str(text)?;
        Ok(options.sanitized())
    }

    pub fn sanitized(mut self) -> Self {
        self.limiter_threshold = self.limiter_threshold.max(1);
        self.left_octave = self.left_octave.clamp(MIN_OCTAVE, MAX_OCTAVE);
        self.right_octave = self.right_octave.clamp(MIN_OCTAVE, MAX_OCTAVE);
        self.base_volume = self.base_volume.clamp(0.0, 1.0);
        self.start_offset_ms = self.start_offset_ms.max(0);
        self.frames_per_second = self.frames_per_second.max(1);
        self
    }

    pub fn limiter(&self) -> LimiterConfig {
        LimiterConfig {
            threshold: self.limiter_threshold,
            base_volume: self.base_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let options = PianoOptions::from_json(r#"{ "limiter_threshold": 8 }"#).unwrap();
        assert_eq!(options.limiter_threshold, 8);
        assert_eq!(options.channel_count, 512);
        assert_eq!(options.left_octave, 4);
        assert_eq!(options.right_octave, 5);
        assert_eq!(options.limiter(), LimiterConfig { threshold: 8, base_volume: 0.6 });
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let options = PianoOptions::from_json(
            r#"{ "left_octave": 12, "base_volume": 3.0, "start_offset_ms": -5 }"#,
        )
        .unwrap();
        assert_eq!(options.left_octave, MAX_OCTAVE);
        assert_eq!(options.base_volume, 1.0);
        assert_eq!(options.start_offset_ms, 0);
    }

    #[test]
    fn zero_limiter_threshold_is_raised_to_one() {
        let options = PianoOptions::from_json(r#"{ "limiter_threshold": 0 }"#).unwrap();
        assert_eq!(options.limiter_threshold, 1);
        let limiter = options.limiter();
        assert_eq!(limiter.limiter_factor(1), 1.0);
        assert!(limiter.gain(4, 127) > 0.0);
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "midi_path": "song.mid", "start_offset_ms": 135000 }}"#).unwrap();
        let options = PianoOptions::load(file.path()).unwrap();
        assert_eq!(options.midi_path, Some(PathBuf::from("song.mid")));
        assert_eq!(options.start_offset_ms, 135_000);
    }

    #[test]
    fn invalid_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            PianoOptions::load(file.path()),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn absent_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let options = PianoOptions::load_or_default(&dir.path().join("arpeggio.json")).unwrap();
        assert_eq!(options, PianoOptions::default());
    }
}

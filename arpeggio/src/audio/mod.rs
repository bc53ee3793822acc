//! 音频输出层：rodio 声道池、音色库与备用合成音

pub mod mixer;
pub mod sound_bank;
pub mod tone;

pub use mixer::{NullChannel, NullMixer, RodioChannel, RodioMixer};
pub use sound_bank::{PcmSource, SampleBuffer, SoundBank};
pub use tone::ToneConfig;

//! # arpeggio
//!
//! 可以用电脑键盘弹奏、也可以自动回放 MIDI 文件的 88 键钢琴引擎。
//!
//! ## 功能特性
//!
//! - **键盘演奏**：左右手各 12 个字母，分别对应各自八度的 12 个半音
//! - **MIDI 回放**：按挂钟时间调度音符，支持暂停、继续与跳转
//! - **声部限幅**：复音数超过阈值后按 `sqrt(T/n)` 衰减，声道耗尽时丢弃音符
//! - **按键闪烁**：每个被触发的键高亮固定帧数
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use arpeggio::{InputEvent, NullMixer, Piano, PianoOptions};
//! use std::path::Path;
//!
//! let mut piano = Piano::new(NullMixer, PianoOptions::default());
//! piano.load_track(Path::new("song.mid")).ok();
//!
//! // 每帧：先转发输入，再推进回放
//! let _ = piano.handle_event(InputEvent::TogglePlayback, 0);
//! piano.tick(16);
//!
//! for event in piano.take_events() {
//!     println!("{event:?}");
//! }
//! ```

pub mod audio;
pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod flash;
pub mod options;
pub mod piano;
pub mod playback;
pub mod structure;
pub mod transport;
pub mod voices;

pub use audio::{NullMixer, RodioMixer, SoundBank, ToneConfig};
pub use catalog::{KeyId, KeySpec, NoteCatalog, VoiceClass};
pub use dispatcher::{Hand, KeyDispatcher};
pub use error::{AudioError, ConfigError, LoadError, VoiceExhausted};
pub use flash::KeyFlash;
pub use options::PianoOptions;
pub use piano::{FrameSnapshot, InputEvent, Piano, PianoEvent};
pub use playback::{Advance, PlayState, PlaybackSession, Toggle};
pub use structure::{NoteEvent, PlaybackTrack};
pub use transport::Transport;
pub use voices::{LimiterConfig, MixerBackend, MixerChannel, VoiceAllocator};

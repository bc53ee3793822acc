//! 钢琴核心
//!
//! `Piano` 拥有播放会话、声部分配器、键盘映射和闪烁状态，是输入子系统与渲染子系统
//! 唯一需要交互的对象。所有发声（鼠标、键盘、曲目回放）都经过同一个分配器。

use crate::catalog::{KeyId, NoteCatalog};
use crate::dispatcher::{Hand, KeyDispatcher};
use crate::error::{LoadError, VoiceExhausted};
use crate::flash::KeyFlash;
use crate::options::PianoOptions;
use crate::playback::{Advance, PlaybackSession, Toggle};
use crate::voices::{MixerBackend, VoiceAllocator};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// 手动演奏的音符固定使用最大力度
pub const MANUAL_VELOCITY: u8 = 127;

/// 输入子系统送来的事件
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// 已由外部命中测试解析为具体的键
    PointerHit(KeyId),
    /// 文本输入的单个字母，左右手都会检查
    Letter(char),
    TogglePlayback,
    OctaveChange { hand: Hand, delta: i32 },
    Quit,
}

/// 宿主可监听的事件
#[derive(Clone, Debug, PartialEq)]
pub enum PianoEvent {
    TrackLoaded { path: PathBuf, notes: usize },
    LoadFailed { message: String },
    PlaybackStarted { from_ms: i64 },
    PlaybackResumed { from_ms: i64 },
    PlaybackPaused { at_ms: i64 },
    PlaybackFinished,
    NoteDropped(KeyId),
    OctaveChanged { hand: Hand, octave: u8 },
}

/// 每帧提供给渲染层的只读快照
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSnapshot {
    pub active_keys: Vec<KeyId>,
    pub left_octave: u8,
    pub right_octave: u8,
    pub is_playing: bool,
    pub position_ms: i64,
    pub active_voices: usize,
}

pub struct Piano<M: MixerBackend> {
    catalog: NoteCatalog,
    options: PianoOptions,
    session: PlaybackSession,
    voices: VoiceAllocator<M>,
    dispatcher: KeyDispatcher,
    flash: KeyFlash,
    loaded_path: Option<PathBuf>,
    pending_events: Vec<PianoEvent>,
}

impl<M: MixerBackend> Piano<M> {
    pub fn new(mixer: M, options: PianoOptions) -> Self {
        let options = options.sanitized();
        let catalog = NoteCatalog::piano();
        let dispatcher = KeyDispatcher::new(options.left_octave, options.right_octave, &catalog);
        Self {
            voices: VoiceAllocator::new(mixer, options.limiter()),
            flash: KeyFlash::new(options.flash_frames),
            session: PlaybackSession::new(),
            loaded_path: None,
            pending_events: Vec::new(),
            catalog,
            dispatcher,
            options,
        }
    }

    pub fn catalog(&self) -> &NoteCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &PianoOptions {
        &self.options
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn voices(&self) -> &VoiceAllocator<M> {
        &self.voices
    }

    pub fn dispatcher(&self) -> &KeyDispatcher {
        &self.dispatcher
    }

    pub fn loaded_path(&self) -> Option<&Path> {
        self.loaded_path.as_deref()
    }

    /// 加载新曲目；失败时旧曲目保持可播放
    pub fn load_track(&mut self, path: &Path) -> Result<usize, LoadError> {
        match self.session.load(path, &self.catalog) {
            Ok(notes) => {
                self.loaded_path = Some(path.to_path_buf());
                self.emit_event(PianoEvent::TrackLoaded {
                    path: path.to_path_buf(),
                    notes,
                });
                Ok(notes)
            }
            Err(err) => {
                log::error!("{err}");
                self.emit_event(PianoEvent::LoadFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// 以限幅增益播放一个键，并点亮它
    pub fn play_key(&mut self, key: KeyId, velocity: u8) -> Result<f32, VoiceExhausted> {
        sound_key(
            &mut self.voices,
            &mut self.flash,
            &mut self.pending_events,
            key,
            velocity,
        )
    }

    pub fn handle_pointer_hit(&mut self, key: KeyId) -> bool {
        if !self.catalog.contains(key) {
            return false;
        }
        self.play_key(key, MANUAL_VELOCITY).is_ok()
    }

    pub fn handle_key_letter(&mut self, letter: char, hand: Hand) -> bool {
        match self.dispatcher.resolve(letter, hand) {
            Some(key) => self.play_key(key, MANUAL_VELOCITY).is_ok(),
            None => false,
        }
    }

    /// 文本输入：依次检查左右手
    pub fn handle_text(&mut self, letter: char) -> bool {
        match self.dispatcher.resolve_any(letter) {
            Some((_, key)) => self.play_key(key, MANUAL_VELOCITY).is_ok(),
            None => false,
        }
    }

    pub fn handle_octave_change(&mut self, hand: Hand, delta: i32) -> u8 {
        let before = self.dispatcher.octave(hand);
        let octave = self.dispatcher.shift_octave(hand, delta, &self.catalog);
        if octave != before {
            self.emit_event(PianoEvent::OctaveChanged { hand, octave });
        }
        octave
    }

    /// 播放/暂停；第一次调用时加载配置中的 MIDI 文件
    pub fn handle_toggle_playback(&mut self, now_ms: i64) {
        if self.loaded_path.is_none() {
            let Some(path) = self.options.midi_path.clone() else {
                log::warn!("No MIDI file configured, nothing to play");
                return;
            };
            log::info!("Loading {}...", path.display());
            if self.load_track(&path).is_err() {
                return;
            }
        }

        let event = match self.session.toggle(now_ms, self.options.start_offset_ms) {
            Toggle::Started { from_ms } => {
                log::info!("Starting playback from {:.2}s", from_ms as f64 / 1000.0);
                PianoEvent::PlaybackStarted { from_ms }
            }
            Toggle::Resumed { from_ms } => {
                log::info!("Resuming playback from {:.2}s", from_ms as f64 / 1000.0);
                PianoEvent::PlaybackResumed { from_ms }
            }
            Toggle::Paused { at_ms } => {
                log::info!("Pausing playback.");
                PianoEvent::PlaybackPaused { at_ms }
            }
        };
        self.emit_event(event);
    }

    pub fn seek(&mut self, now_ms: i64, target_ms: i64) {
        self.session.seek(now_ms, target_ms.max(0));
    }

    /// 分发一个输入事件；收到退出信号时返回 `Break`
    pub fn handle_event(&mut self, event: InputEvent, now_ms: i64) -> ControlFlow<()> {
        match event {
            InputEvent::PointerHit(key) => {
                self.handle_pointer_hit(key);
            }
            InputEvent::Letter(letter) => {
                self.handle_text(letter);
            }
            InputEvent::TogglePlayback => self.handle_toggle_playback(now_ms),
            InputEvent::OctaveChange { hand, delta } => {
                self.handle_octave_change(hand, delta);
            }
            InputEvent::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// 每帧调用一次：衰减闪烁、回收声部、释放到期音符
    pub fn tick(&mut self, now_ms: i64) -> Advance {
        self.flash.tick();
        self.voices.reclaim();

        let voices = &mut self.voices;
        let flash = &mut self.flash;
        let pending_events = &mut self.pending_events;
        let result = self.session.advance(now_ms, |event| {
            let _ = sound_key(voices, flash, pending_events, event.key, event.velocity);
        });

        if let Advance::Finished { .. } = result {
            self.emit_event(PianoEvent::PlaybackFinished);
        }
        result
    }

    pub fn snapshot(&self, now_ms: i64) -> FrameSnapshot {
        FrameSnapshot {
            active_keys: self.flash.active_keys(),
            left_octave: self.dispatcher.octave(Hand::Left),
            right_octave: self.dispatcher.octave(Hand::Right),
            is_playing: self.session.is_playing(),
            position_ms: self.session.position_ms(now_ms),
            active_voices: self.voices.active_count(),
        }
    }

    pub fn take_events(&mut self) -> Vec<PianoEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn emit_event(&mut self, event: PianoEvent) {
        self.pending_events.push(event);
    }
}

fn sound_key<M: MixerBackend>(
    voices: &mut VoiceAllocator<M>,
    flash: &mut KeyFlash,
    pending_events: &mut Vec<PianoEvent>,
    key: KeyId,
    velocity: u8,
) -> Result<f32, VoiceExhausted> {
    flash.trigger(key);
    voices.trigger(key, velocity).inspect_err(|_| {
        pending_events.push(PianoEvent::NoteDropped(key));
    })
}

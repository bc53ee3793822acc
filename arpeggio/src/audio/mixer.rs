//! 声道池
//!
//! 每个声道是一个 rodio `Sink`。声道按需创建，直到达到上限；
//! 播放结束（sink 为空）的声道可以被重新分配。

use crate::audio::sound_bank::SoundBank;
use crate::catalog::KeyId;
use crate::error::AudioError;
use crate::voices::{MixerBackend, MixerChannel};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::sync::Arc;

pub struct RodioMixer {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sinks: Vec<Arc<Sink>>,
    capacity: usize,
    bank: Arc<SoundBank>,
}

impl RodioMixer {
    pub fn new(capacity: usize, bank: SoundBank) -> Result<Self, AudioError> {
        let (_stream, handle) = OutputStream::try_default()?;
        log::info!("Audio output opened with up to {capacity} channels");
        Ok(Self {
            _stream,
            handle,
            sinks: Vec::new(),
            capacity,
            bank: Arc::new(bank),
        })
    }

    fn open_sink(&mut self) -> Option<usize> {
        if self.sinks.len() >= self.capacity {
            return None;
        }
        match Sink::try_new(&self.handle) {
            Ok(sink) => {
                self.sinks.push(Arc::new(sink));
                Some(self.sinks.len() - 1)
            }
            Err(err) => {
                log::warn!("{}", AudioError::from(err));
                None
            }
        }
    }
}

impl MixerBackend for RodioMixer {
    type Channel = RodioChannel;

    fn find_channel(&mut self) -> Option<RodioChannel> {
        let slot = match self.sinks.iter().position(|sink| sink.empty()) {
            Some(slot) => slot,
            None => self.open_sink()?,
        };
        Some(RodioChannel {
            slot,
            sink: Arc::clone(&self.sinks[slot]),
            bank: Arc::clone(&self.bank),
        })
    }
}

pub struct RodioChannel {
    slot: usize,
    sink: Arc<Sink>,
    bank: Arc<SoundBank>,
}

impl MixerChannel for RodioChannel {
    fn id(&self) -> usize {
        self.slot
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }

    fn play(&mut self, sound: KeyId) {
        match self.bank.get(sound) {
            Some(buffer) => self.sink.append(buffer.source()),
            None => log::warn!("No sample for {sound:?}"),
        }
    }

    fn is_busy(&self) -> bool {
        !self.sink.empty()
    }
}

/// 无声输出：没有音频设备时使用，声道永远空闲
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMixer;

#[derive(Clone, Copy, Debug, Default)]
pub struct NullChannel;

impl MixerBackend for NullMixer {
    type Channel = NullChannel;

    fn find_channel(&mut self) -> Option<NullChannel> {
        Some(NullChannel)
    }
}

impl MixerChannel for NullChannel {
    fn id(&self) -> usize {
        0
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn play(&mut self, _sound: KeyId) {}

    fn is_busy(&self) -> bool {
        false
    }
}

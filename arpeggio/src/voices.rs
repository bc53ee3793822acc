//! 声部分配与限幅
//!
//! 所有发声都经过 `VoiceAllocator::trigger`：回收已结束的声道、按当前复音数
//! 计算增益、申请空闲声道并开始播放。没有空闲声道时直接丢弃音符，不排队、不重试。

use crate::catalog::KeyId;
use crate::error::VoiceExhausted;

pub const DEFAULT_LIMITER_THRESHOLD: usize = 16;
pub const DEFAULT_BASE_VOLUME: f32 = 0.6;

/// 宿主可替换的混音层抽象。
///
/// 所有调用都必须是非阻塞的，可以每帧调用。
pub trait MixerBackend {
    type Channel: MixerChannel;

    /// 申请一个空闲声道；全部占用时返回 `None`
    fn find_channel(&mut self) -> Option<Self::Channel>;
}

/// 混音层中的单个声道
pub trait MixerChannel {
    fn id(&self) -> usize;
    fn set_volume(&mut self, volume: f32);
    fn play(&mut self, sound: KeyId);
    fn is_busy(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimiterConfig {
    /// 超过该复音数后开始衰减
    pub threshold: usize,
    /// 低复音时也保留的余量
    pub base_volume: f32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LIMITER_THRESHOLD,
            base_volume: DEFAULT_BASE_VOLUME,
        }
    }
}

impl LimiterConfig {
    /// `n <= threshold` 时为 1.0，否则为 `sqrt(threshold / n)`
    pub fn limiter_factor(&self, active_voices: usize) -> f32 {
        if active_voices <= self.threshold {
            1.0
        } else {
            (self.threshold as f32 / active_voices as f32).sqrt()
        }
    }

    pub fn gain(&self, active_voices: usize, velocity: u8) -> f32 {
        let velocity_factor = velocity.min(127) as f32 / 127.0;
        self.base_volume * self.limiter_factor(active_voices) * velocity_factor
    }
}

/// 一个正在发声的音
pub struct Voice<C> {
    sound: KeyId,
    gain: f32,
    channel: C,
}

impl<C: MixerChannel> Voice<C> {
    pub fn sound(&self) -> KeyId {
        self.sound
    }

    /// 触发时设置的增益
    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn assigned_channel(&self) -> usize {
        self.channel.id()
    }

    pub fn is_busy(&self) -> bool {
        self.channel.is_busy()
    }
}

pub struct VoiceAllocator<M: MixerBackend> {
    mixer: M,
    active: Vec<Voice<M::Channel>>,
    limiter: LimiterConfig,
    dropped: u64,
}

impl<M: MixerBackend> VoiceAllocator<M> {
    pub fn new(mixer: M, limiter: LimiterConfig) -> Self {
        Self {
            mixer,
            active: Vec::new(),
            limiter,
            dropped: 0,
        }
    }

    /// 移除已经播放完毕的声部，返回回收的数量
    pub fn reclaim(&mut self) -> usize {
        let before = self.active.len();
        self.active.retain(|voice| voice.is_busy());
        before - self.active.len()
    }

    /// 以限幅后的增益播放 `sound`，返回实际使用的增益。
    ///
    /// 现场演奏与曲目回放走同一条路径。
    pub fn trigger(&mut self, sound: KeyId, velocity: u8) -> Result<f32, VoiceExhausted> {
        self.reclaim();

        let gain = self.limiter.gain(self.active.len(), velocity);

        let Some(mut channel) = self.mixer.find_channel() else {
            self.dropped += 1;
            log::warn!(
                "No free channel for {:?} ({} voices active), note dropped",
                sound,
                self.active.len()
            );
            return Err(VoiceExhausted);
        };

        // A channel that went idle between the sweep and this call may be
        // handed out again; keep one entry per channel.
        let id = channel.id();
        self.active.retain(|voice| voice.assigned_channel() != id);

        channel.set_volume(gain);
        channel.play(sound);
        self.active.push(Voice {
            sound,
            gain,
            channel,
        });
        Ok(gain)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_voices(&self) -> impl Iterator<Item = &Voice<M::Channel>> {
        self.active.iter()
    }

    /// 因声道耗尽而丢弃的音符总数
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

//! 按键闪烁状态
//!
//! 每次触发给对应的键设置一个帧倒计时，渲染层读取快照来高亮按键。

use crate::catalog::KeyId;

pub const DEFAULT_FLASH_FRAMES: u32 = 30;

#[derive(Clone, Debug)]
pub struct KeyFlash {
    frames: u32,
    countdowns: Vec<(KeyId, u32)>,
}

impl Default for KeyFlash {
    fn default() -> Self {
        Self::new(DEFAULT_FLASH_FRAMES)
    }
}

impl KeyFlash {
    pub fn new(frames: u32) -> Self {
        Self {
            frames,
            countdowns: Vec::new(),
        }
    }

    /// Re-triggering a lit key restarts its countdown.
    pub fn trigger(&mut self, key: KeyId) {
        match self.countdowns.iter_mut().find(|(k, _)| *k == key) {
            Some((_, remaining)) => *remaining = self.frames,
            None => self.countdowns.push((key, self.frames)),
        }
    }

    /// 每帧调用一次
    pub fn tick(&mut self) {
        for (_, remaining) in &mut self.countdowns {
            *remaining = remaining.saturating_sub(1);
        }
        self.countdowns.retain(|(_, remaining)| *remaining > 0);
    }

    pub fn is_lit(&self, key: KeyId) -> bool {
        self.countdowns.iter().any(|(k, _)| *k == key)
    }

    pub fn active_keys(&self) -> Vec<KeyId> {
        self.countdowns.iter().map(|(key, _)| *key).collect()
    }
}

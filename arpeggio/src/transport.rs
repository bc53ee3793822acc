//! 传输时钟
//!
//! 以墙钟毫秒为基准记录播放位置。调度器只读取它，不修改它。

/// 播放位置 = `now - anchor_wallclock_ms`（运行时），暂停时冻结。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transport {
    active: bool,
    anchor_wallclock_ms: i64,
    position_at_anchor_ms: i64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 `at_position_ms` 开始播放
    pub fn start(&mut self, now_ms: i64, at_position_ms: i64) {
        self.anchor_wallclock_ms = now_ms - at_position_ms;
        self.position_at_anchor_ms = at_position_ms;
        self.active = true;
    }

    /// 暂停并冻结当前位置
    pub fn pause(&mut self, now_ms: i64) {
        if !self.active {
            return;
        }
        let position = self.elapsed_ms(now_ms);
        self.anchor_wallclock_ms = now_ms - position;
        self.position_at_anchor_ms = position;
        self.active = false;
    }

    /// 从指定位置继续播放，与 `start` 的锚点计算完全相同
    pub fn resume_from(&mut self, now_ms: i64, position_ms: i64) {
        self.start(now_ms, position_ms);
    }

    /// 只移动锚点；游标的重定位由调度器负责。
    pub fn seek(&mut self, now_ms: i64, target_ms: i64) {
        self.anchor_wallclock_ms = now_ms - target_ms;
        self.position_at_anchor_ms = target_ms;
    }

    /// 停止并回到起点
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        if self.active {
            (now_ms - self.anchor_wallclock_ms).max(self.position_at_anchor_ms)
        } else {
            self.position_at_anchor_ms
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_anchors_position_to_wallclock() {
        let mut transport = Transport::new();
        transport.start(10_000, 2_500);
        assert!(transport.is_active());
        assert_eq!(transport.elapsed_ms(10_000), 2_500);
        assert_eq!(transport.elapsed_ms(10_750), 3_250);
    }

    #[test]
    fn pause_freezes_elapsed() {
        let mut transport = Transport::new();
        transport.start(1_000, 0);
        transport.pause(1_400);
        assert!(!transport.is_active());
        assert_eq!(transport.elapsed_ms(1_400), 400);
        assert_eq!(transport.elapsed_ms(9_999), 400);

        transport.resume_from(5_000, transport.elapsed_ms(5_000));
        assert_eq!(transport.elapsed_ms(5_100), 500);
    }

    #[test]
    fn elapsed_is_monotonic_while_active() {
        let mut transport = Transport::new();
        transport.start(100, 50);
        let mut last = transport.elapsed_ms(100);
        for now in (100..2_000).step_by(16) {
            let elapsed = transport.elapsed_ms(now);
            assert!(elapsed >= last);
            last = elapsed;
        }
        // A stale timestamp never moves the position backwards.
        assert_eq!(transport.elapsed_ms(0), 50);
    }

    #[test]
    fn seek_repositions_anchor_in_both_states() {
        let mut transport = Transport::new();
        transport.start(1_000, 0);
        transport.seek(2_000, 30_000);
        assert_eq!(transport.elapsed_ms(2_016), 30_016);

        transport.pause(2_016);
        transport.seek(3_000, 500);
        assert!(!transport.is_active());
        assert_eq!(transport.elapsed_ms(4_000), 500);
    }

    #[test]
    fn negative_anchor_is_allowed() {
        let mut transport = Transport::new();
        transport.start(1_000, 135_000);
        assert_eq!(transport.elapsed_ms(1_000), 135_000);
        transport.stop();
        assert_eq!(transport, Transport::default());
    }
}

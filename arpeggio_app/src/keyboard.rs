//! 琴键布局、命中测试与绘制

use arpeggio::{FrameSnapshot, Hand, KeyDispatcher, KeyId, NoteCatalog};
use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Rounding, Stroke, Vec2};

pub const WHITE_KEY_WIDTH: f32 = 35.0;
pub const WHITE_KEY_HEIGHT: f32 = 200.0;
pub const BLACK_KEY_WIDTH: f32 = 22.0;
pub const BLACK_KEY_HEIGHT: f32 = 125.0;

const WHITE_FILL: Color32 = Color32::from_rgb(250, 250, 245);
const WHITE_LIT: Color32 = Color32::from_rgb(140, 200, 255);
const BLACK_FILL: Color32 = Color32::from_rgb(25, 25, 30);
const BLACK_LIT: Color32 = Color32::from_rgb(40, 120, 220);
const LEFT_HAND_COLOR: Color32 = Color32::from_rgb(230, 140, 60);
const RIGHT_HAND_COLOR: Color32 = Color32::from_rgb(90, 180, 90);

/// 一帧内所有键的屏幕矩形
pub struct KeyboardLayout {
    whites: Vec<(KeyId, Rect)>,
    blacks: Vec<(KeyId, Rect)>,
}

impl KeyboardLayout {
    pub fn new(catalog: &NoteCatalog, origin: Pos2) -> Self {
        let whites: Vec<(KeyId, Rect)> = catalog
            .white_keys()
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let min = origin + Vec2::new(i as f32 * WHITE_KEY_WIDTH, 0.0);
                (spec.key, Rect::from_min_size(min, Vec2::new(WHITE_KEY_WIDTH, WHITE_KEY_HEIGHT)))
            })
            .collect();

        // A black key straddles the boundary after the white key one semitone below it.
        let blacks = catalog
            .black_keys()
            .iter()
            .filter_map(|spec| {
                let below = catalog.lookup_pitch(spec.pitch as i32 - 1)?;
                let (_, white_rect) = whites.get(below.index)?;
                let center_x = white_rect.right();
                let min = Pos2::new(center_x - BLACK_KEY_WIDTH / 2.0, origin.y);
                Some((spec.key, Rect::from_min_size(min, Vec2::new(BLACK_KEY_WIDTH, BLACK_KEY_HEIGHT))))
            })
            .collect();

        Self { whites, blacks }
    }

    pub fn size(catalog: &NoteCatalog) -> Vec2 {
        Vec2::new(catalog.white_keys().len() as f32 * WHITE_KEY_WIDTH, WHITE_KEY_HEIGHT)
    }

    /// 黑键覆盖在白键之上，先检查黑键
    pub fn hit_test(&self, pos: Pos2) -> Option<KeyId> {
        self.blacks
            .iter()
            .chain(self.whites.iter())
            .find(|(_, rect)| rect.contains(pos))
            .map(|(key, _)| *key)
    }

    pub fn rect(&self, key: KeyId) -> Option<Rect> {
        self.whites
            .iter()
            .chain(self.blacks.iter())
            .find(|(k, _)| *k == key)
            .map(|(_, rect)| *rect)
    }

    pub fn paint(
        &self,
        painter: &Painter,
        catalog: &NoteCatalog,
        dispatcher: &KeyDispatcher,
        snapshot: &FrameSnapshot,
    ) {
        let outline = Stroke::new(1.0, Color32::from_gray(60));

        for (key, rect) in &self.whites {
            let fill = if snapshot.active_keys.contains(key) {
                WHITE_LIT
            } else {
                WHITE_FILL
            };
            painter.rect_filled(*rect, Rounding::same(3.0), fill);
            painter.rect_stroke(*rect, Rounding::same(3.0), outline);

            // Only the C keys carry a note name.
            if let Some(spec) = catalog.spec(*key) {
                if spec.label.starts_with('C') {
                    painter.text(
                        rect.center_bottom() - Vec2::new(0.0, 6.0),
                        Align2::CENTER_BOTTOM,
                        &spec.label,
                        FontId::proportional(11.0),
                        Color32::from_gray(110),
                    );
                }
            }
        }

        for (key, rect) in &self.blacks {
            let fill = if snapshot.active_keys.contains(key) {
                BLACK_LIT
            } else {
                BLACK_FILL
            };
            painter.rect_filled(*rect, Rounding::same(2.0), fill);
        }

        self.paint_hand(painter, dispatcher, Hand::Left, LEFT_HAND_COLOR);
        self.paint_hand(painter, dispatcher, Hand::Right, RIGHT_HAND_COLOR);
    }

    /// 在该手映射到的键上标出对应的字母
    fn paint_hand(&self, painter: &Painter, dispatcher: &KeyDispatcher, hand: Hand, color: Color32) {
        for (letter, key) in dispatcher.hand_map(hand).entries() {
            let Some(rect) = key.and_then(|key| self.rect(key)) else {
                continue;
            };
            let anchor = rect.center_bottom() - Vec2::new(0.0, 24.0);
            painter.text(
                anchor,
                Align2::CENTER_BOTTOM,
                letter.to_string(),
                FontId::monospace(13.0),
                color,
            );
        }
    }
}

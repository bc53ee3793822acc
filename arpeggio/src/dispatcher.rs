//! 电脑键盘 → 琴键映射
//!
//! 左右手各有 12 个字母，对应该手所在八度的 12 个半音。映射表只在八度变化时重建。

use crate::catalog::{KeyId, NoteCatalog, NOTE_NAMES};

pub const MIN_OCTAVE: u8 = 0;
pub const MAX_OCTAVE: u8 = 8;

/// 左手字母，按半音顺序（C, C#, D, ... B）
pub const LEFT_HAND_LETTERS: [char; 12] =
    ['Z', 'S', 'X', 'D', 'C', 'V', 'G', 'B', 'H', 'N', 'J', 'M'];
/// 右手字母，按半音顺序
pub const RIGHT_HAND_LETTERS: [char; 12] =
    ['R', '5', 'T', '6', 'Y', 'U', '8', 'I', '9', 'O', '0', 'P'];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn letters(self) -> &'static [char; 12] {
        match self {
            Hand::Left => &LEFT_HAND_LETTERS,
            Hand::Right => &RIGHT_HAND_LETTERS,
        }
    }
}

/// 单手的字母映射表
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandMap {
    hand: Hand,
    octave: u8,
    keys: [Option<KeyId>; 12],
}

impl HandMap {
    pub fn new(hand: Hand, octave: u8, catalog: &NoteCatalog) -> Self {
        let octave = octave.clamp(MIN_OCTAVE, MAX_OCTAVE);
        let keys = std::array::from_fn(|semitone| {
            catalog.lookup(&format!("{}{}", NOTE_NAMES[semitone], octave))
        });
        Self { hand, octave, keys }
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// 大小写不敏感；字母不属于该手，或音符超出音域时返回 `None`
    pub fn resolve(&self, letter: char) -> Option<KeyId> {
        let letter = letter.to_ascii_uppercase();
        let semitone = self.hand.letters().iter().position(|&l| l == letter)?;
        self.keys[semitone]
    }

    /// 用于显示：每个字母及其对应的键
    pub fn entries(&self) -> impl Iterator<Item = (char, Option<KeyId>)> + '_ {
        self.hand
            .letters()
            .iter()
            .copied()
            .zip(self.keys.iter().copied())
    }
}

#[derive(Clone, Debug)]
pub struct KeyDispatcher {
    left: HandMap,
    right: HandMap,
}

impl KeyDispatcher {
    pub fn new(left_octave: u8, right_octave: u8, catalog: &NoteCatalog) -> Self {
        Self {
            left: HandMap::new(Hand::Left, left_octave, catalog),
            right: HandMap::new(Hand::Right, right_octave, catalog),
        }
    }

    pub fn hand_map(&self, hand: Hand) -> &HandMap {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    pub fn octave(&self, hand: Hand) -> u8 {
        self.hand_map(hand).octave()
    }

    pub fn resolve(&self, letter: char, hand: Hand) -> Option<KeyId> {
        self.hand_map(hand).resolve(letter)
    }

    /// 文本输入同时检查左右手，两边的字母互不重叠
    pub fn resolve_any(&self, letter: char) -> Option<(Hand, KeyId)> {
        [Hand::Left, Hand::Right]
            .into_iter()
            .find_map(|hand| self.resolve(letter, hand).map(|key| (hand, key)))
    }

    /// 调整八度并在变化时重建映射表；返回新的八度
    pub fn shift_octave(&mut self, hand: Hand, delta: i32, catalog: &NoteCatalog) -> u8 {
        let current = self.octave(hand);
        let target = (current as i32)
            .saturating_add(delta)
            .clamp(MIN_OCTAVE as i32, MAX_OCTAVE as i32) as u8;
        if target != current {
            let map = HandMap::new(hand, target, catalog);
            match hand {
                Hand::Left => self.left = map,
                Hand::Right => self.right = map,
            }
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_chromatic_notes_of_the_octave() {
        let catalog = NoteCatalog::piano();
        let dispatcher = KeyDispatcher::new(4, 5, &catalog);
        assert_eq!(dispatcher.resolve('Z', Hand::Left), catalog.lookup("C4"));
        assert_eq!(dispatcher.resolve('s', Hand::Left), catalog.lookup("C#4"));
        assert_eq!(dispatcher.resolve('M', Hand::Left), catalog.lookup("B4"));
        assert_eq!(dispatcher.resolve('r', Hand::Right), catalog.lookup("C5"));
        assert_eq!(dispatcher.resolve('0', Hand::Right), catalog.lookup("A#5"));
        assert_eq!(dispatcher.resolve('Z', Hand::Right), None);
    }

    #[test]
    fn resolve_any_checks_both_hands() {
        let catalog = NoteCatalog::piano();
        let dispatcher = KeyDispatcher::new(2, 6, &catalog);
        assert_eq!(
            dispatcher.resolve_any('x'),
            Some((Hand::Left, catalog.lookup("D2").unwrap()))
        );
        assert_eq!(
            dispatcher.resolve_any('P'),
            Some((Hand::Right, catalog.lookup("B6").unwrap()))
        );
        assert_eq!(dispatcher.resolve_any('q'), None);
    }

    #[test]
    fn octave_is_clamped_to_valid_range() {
        let catalog = NoteCatalog::piano();
        let mut dispatcher = KeyDispatcher::new(4, 5, &catalog);
        for _ in 0..20 {
            dispatcher.shift_octave(Hand::Right, 1, &catalog);
        }
        assert_eq!(dispatcher.octave(Hand::Right), MAX_OCTAVE);
        assert_eq!(dispatcher.shift_octave(Hand::Left, -100, &catalog), MIN_OCTAVE);
        assert_eq!(KeyDispatcher::new(42, 5, &catalog).octave(Hand::Left), MAX_OCTAVE);
    }

    #[test]
    fn extreme_octave_deltas_saturate() {
        let catalog = NoteCatalog::piano();
        let mut dispatcher = KeyDispatcher::new(4, 5, &catalog);
        assert_eq!(dispatcher.shift_octave(Hand::Left, i32::MAX, &catalog), MAX_OCTAVE);
        assert_eq!(dispatcher.resolve('z', Hand::Left), catalog.lookup("C8"));
        assert_eq!(dispatcher.shift_octave(Hand::Left, i32::MIN, &catalog), MIN_OCTAVE);
        assert_eq!(dispatcher.shift_octave(Hand::Right, i32::MIN, &catalog), MIN_OCTAVE);
        assert_eq!(dispatcher.octave(Hand::Right), MIN_OCTAVE);
    }

    #[test]
    fn notes_outside_keyboard_resolve_to_nothing() {
        let catalog = NoteCatalog::piano();
        let dispatcher = KeyDispatcher::new(0, 8, &catalog);
        // Octave 0 only has A0, A#0 and B0.
        assert_eq!(dispatcher.resolve('Z', Hand::Left), None);
        assert_eq!(dispatcher.resolve('N', Hand::Left), catalog.lookup("A0"));
        // Octave 8 only has C8.
        assert_eq!(dispatcher.resolve('R', Hand::Right), catalog.lookup("C8"));
        assert_eq!(dispatcher.resolve('5', Hand::Right), None);
    }

    #[test]
    fn octave_change_only_affects_future_lookups() {
        let catalog = NoteCatalog::piano();
        let mut dispatcher = KeyDispatcher::new(4, 5, &catalog);
        let before = dispatcher.resolve('z', Hand::Left);
        dispatcher.shift_octave(Hand::Left, 1, &catalog);
        assert_eq!(before, catalog.lookup("C4"));
        assert_eq!(dispatcher.resolve('z', Hand::Left), catalog.lookup("C5"));
        assert_eq!(dispatcher.resolve('r', Hand::Right), catalog.lookup("C5"));
    }
}

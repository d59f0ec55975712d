//! Piano key layout.
//!
//! Maps a chromatic index onto contiguous white-key numbers. Black keys sit
//! between two adjacent white keys and report both neighbours.

/// Pitch classes that fall on white keys.
pub const WHITE_PITCH_CLASSES: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Position of each pitch class among the seven white keys of an octave.
/// Black pitch classes hold the position of the white key below them.
const WHITE_RANK: [i32; 12] = [0, 0, 1, 1, 2, 3, 3, 4, 4, 5, 5, 6];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPosition {
    White(i32),
    /// Sharp of `below`, flat of `above`; `above == below + 1`.
    Black { below: i32, above: i32 },
}

impl KeyPosition {
    #[inline]
    pub fn is_white(&self) -> bool {
        matches!(self, KeyPosition::White(_))
    }
}

#[inline]
pub fn is_white_key(index: i32) -> bool {
    WHITE_PITCH_CLASSES.contains(&(index.rem_euclid(12) as u8))
}

/// White-key numbering for a chromatic index. Index 0 is white key 0;
/// negative indices extend the pattern downwards.
pub fn key_position(index: i32) -> KeyPosition {
    let octave = index.div_euclid(12);
    let pitch_class = index.rem_euclid(12);
    let below = octave * 7 + WHITE_RANK[pitch_class as usize];
    if is_white_key(index) {
        KeyPosition::White(below)
    } else {
        KeyPosition::Black {
            below,
            above: below + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_octave() {
        let expected = [
            KeyPosition::White(0),
            KeyPosition::Black { below: 0, above: 1 },
            KeyPosition::White(1),
            KeyPosition::Black { below: 1, above: 2 },
            KeyPosition::White(2),
            KeyPosition::White(3),
            KeyPosition::Black { below: 3, above: 4 },
            KeyPosition::White(4),
            KeyPosition::Black { below: 4, above: 5 },
            KeyPosition::White(5),
            KeyPosition::Black { below: 5, above: 6 },
            KeyPosition::White(6),
        ];
        for (index, want) in expected.iter().enumerate() {
            assert_eq!(key_position(index as i32), *want, "index {index}");
        }
    }

    #[test]
    fn test_octaves_repeat_every_seven_white_keys() {
        assert_eq!(key_position(12), KeyPosition::White(7));
        assert_eq!(key_position(60), KeyPosition::White(35));
        assert_eq!(key_position(61), KeyPosition::Black { below: 35, above: 36 });
    }

    #[test]
    fn test_negative_indices() {
        assert_eq!(key_position(-1), KeyPosition::White(-1));
        assert_eq!(key_position(-2), KeyPosition::Black { below: -2, above: -1 });
        assert_eq!(key_position(-12), KeyPosition::White(-7));
    }

    #[test]
    fn test_white_keys_are_contiguous() {
        let whites: Vec<i32> = (0..128)
            .filter_map(|i| match key_position(i) {
                KeyPosition::White(n) => Some(n),
                KeyPosition::Black { .. } => None,
            })
            .collect();
        assert_eq!(whites, (0..whites.len() as i32).collect::<Vec<_>>());
        assert_eq!((0..12).filter(|i| is_white_key(*i)).count(), 7);
    }
}

// THEORY:
// Every grid cell owns one fixed pitch. The mapping is a pure lookup:
// - the column picks a note letter from a 16-slot palette. Seven natural notes
//   are spread over sixteen columns, some repeated, so neighbouring columns
//   often share a letter and the whole grid stays in a consonant C-major space;
// - the row picks the octave, two rows per octave, starting at octave 2 at the
//   top of the grid and capped at octave 7 at the bottom.
// The palette is a deliberate table, not a formula. Do not "fix" it.

use std::fmt;

/// Note letter for each column. Columns past the end wrap around.
pub const NOTE_PALETTE: [char; 16] = [
    'c', 'c', 'c', 'd', 'd', 'e', 'e', 'f', 'f', 'g', 'g', 'a', 'a', 'a', 'b', 'b',
];

pub const MIN_OCTAVE: u8 = 2;
pub const MAX_OCTAVE: u8 = 7;

/// Every key the sound assets are recorded for, in chromatic order. A `-`
/// suffix marks the sharp.
pub const SOUND_KEYS: [&str; 12] = ["c", "c-", "d", "d-", "e", "f", "f-", "g", "g-", "a", "a-", "b"];

pub const SOUND_EXTENSION: &str = "ogg";

/// A note letter plus an octave, e.g. `c4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PitchName {
    letter: char,
    octave: u8,
}

impl PitchName {
    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// File name of the recorded sample for this pitch.
    pub fn asset_file_name(&self) -> String {
        format!("{self}.{SOUND_EXTENSION}")
    }
}

impl fmt::Display for PitchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.octave)
    }
}

/// Octave for a row: two rows per octave, clamped to the recorded range.
pub fn octave_for_row(row: usize) -> u8 {
    let octave = (row + 3).div_ceil(2);
    octave.clamp(MIN_OCTAVE as usize, MAX_OCTAVE as usize) as u8
}

pub fn letter_for_column(column: usize) -> char {
    NOTE_PALETTE[column % NOTE_PALETTE.len()]
}

pub fn pitch_for(row: usize, column: usize) -> PitchName {
    PitchName {
        letter: letter_for_column(column),
        octave: octave_for_row(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_left_cell_is_c2() {
        assert_eq!(pitch_for(0, 0).to_string(), "c2");
    }

    #[test]
    fn octaves_climb_every_two_rows_and_cap() {
        let octaves: Vec<u8> = (0..14).map(octave_for_row).collect();
        assert_eq!(octaves, vec![2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 7, 7]);
    }

    #[test]
    fn palette_is_read_verbatim() {
        let letters: String = (0..16).map(letter_for_column).collect();
        assert_eq!(letters, "cccddeeffggaaabb");
    }

    #[test]
    fn wide_grids_wrap_the_palette() {
        assert_eq!(letter_for_column(16), 'c');
        assert_eq!(letter_for_column(31), 'b');
    }

    #[test]
    fn mapping_is_deterministic() {
        for row in 0..12 {
            for column in 0..16 {
                assert_eq!(pitch_for(row, column), pitch_for(row, column));
            }
        }
        assert_eq!(pitch_for(5, 11).to_string(), "a4");
    }

    #[test]
    fn every_grid_pitch_has_a_recorded_key() {
        for row in 0..12 {
            for column in 0..16 {
                let pitch = pitch_for(row, column);
                let key = pitch.letter().to_string();
                assert!(SOUND_KEYS.contains(&key.as_str()));
                assert!((MIN_OCTAVE..=MAX_OCTAVE).contains(&pitch.octave()));
            }
        }
    }

    #[test]
    fn asset_names_follow_letter_octave_ogg() {
        assert_eq!(pitch_for(4, 7).asset_file_name(), "f4.ogg");
    }
}

use itertools::Itertools;

pub const LAYOUT_COUNT: usize = 4;
pub const FLOORS_PER_LAYOUT: usize = 12;
const PAIRS_PER_LAYOUT: u8 = (FLOORS_PER_LAYOUT / 2) as u8;

/// One of the four fixed button orderings. Floors are stored row by row:
/// each consecutive pair is one row of the two-column button grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    floors: [u8; FLOORS_PER_LAYOUT],
}

type PairRule = fn(u8) -> (u8, u8);

fn ascending_halves(i: u8) -> (u8, u8) {
    (i + 1, i + 7)
}

fn descending_halves(i: u8) -> (u8, u8) {
    (6 - i, 12 - i)
}

fn converging(i: u8) -> (u8, u8) {
    (i + 1, 12 - i)
}

fn diverging(i: u8) -> (u8, u8) {
    (6 - i, i + 7)
}

/// Pairing rule for row `i` of each layout, in traversal order.
const PAIR_RULES: [PairRule; LAYOUT_COUNT] =
    [ascending_halves, descending_halves, converging, diverging];

impl Layout {
    /// Builds the layout for `rule`, or `None` if there is no such rule.
    pub fn generate(rule: usize) -> Option<Self> {
        PAIR_RULES.get(rule).map(|&pair| Self::from_rule(pair))
    }

    fn from_rule(pair: PairRule) -> Self {
        let mut floors = [0u8; FLOORS_PER_LAYOUT];
        for i in 0..PAIRS_PER_LAYOUT {
            let (left, right) = pair(i);
            floors[2 * i as usize] = left;
            floors[2 * i as usize + 1] = right;
        }
        Self { floors }
    }

    pub fn floors(&self) -> &[u8] {
        &self.floors
    }

    pub fn contains(&self, floor: u8) -> bool {
        self.floors.contains(&floor)
    }

    pub fn position(&self, floor: u8) -> Option<usize> {
        self.floors.iter().position(|&f| f == floor)
    }

    /// Grid rows, left button first.
    pub fn rows(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.floors.iter().copied().tuples()
    }
}

pub fn generate_layouts() -> [Layout; LAYOUT_COUNT] {
    PAIR_RULES.map(Layout::from_rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn first_layout_interleaves_low_and_high_floors() {
        let layout = Layout::generate(0).unwrap();
        assert_eq!(layout.floors(), &[1, 7, 2, 8, 3, 9, 4, 10, 5, 11, 6, 12]);
    }

    #[test]
    fn remaining_layouts_follow_their_rules() {
        assert_eq!(
            Layout::generate(1).unwrap().floors(),
            &[6, 12, 5, 11, 4, 10, 3, 9, 2, 8, 1, 7]
        );
        assert_eq!(
            Layout::generate(2).unwrap().floors(),
            &[1, 12, 2, 11, 3, 10, 4, 9, 5, 8, 6, 7]
        );
        assert_eq!(
            Layout::generate(3).unwrap().floors(),
            &[6, 7, 5, 8, 4, 9, 3, 10, 2, 11, 1, 12]
        );
    }

    #[test]
    fn every_layout_is_a_permutation_of_twelve_floors() {
        let all: BTreeSet<u8> = (1..=12).collect();
        for layout in generate_layouts() {
            let floors: BTreeSet<u8> = layout.floors().iter().copied().collect();
            assert_eq!(layout.floors().len(), FLOORS_PER_LAYOUT);
            assert_eq!(floors, all);
        }
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(generate_layouts(), generate_layouts());
        for rule in 0..LAYOUT_COUNT {
            assert_eq!(Layout::generate(rule), Layout::generate(rule));
        }
    }

    #[test]
    fn unknown_rule_yields_nothing() {
        assert!(Layout::generate(LAYOUT_COUNT).is_none());
    }

    #[test]
    fn rows_pair_up_floors() {
        let layout = Layout::generate(2).unwrap();
        let rows: Vec<(u8, u8)> = layout.rows().collect();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0], (1, 12));
        assert_eq!(rows[5], (6, 7));
    }

    #[test]
    fn position_and_contains() {
        let layout = Layout::generate(3).unwrap();
        assert!(layout.contains(9));
        assert!(!layout.contains(13));
        assert_eq!(layout.position(6), Some(0));
        assert_eq!(layout.position(12), Some(11));
        assert_eq!(layout.position(0), None);
    }
}

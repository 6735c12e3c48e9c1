use std::collections::BTreeSet;
use std::time::Instant;

/// Mutable state of one run through all layouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub layout_index: usize,
    /// Floors already used as targets in the current layout
    pub used_floors: BTreeSet<u8>,
    pub target_floor: Option<u8>,
    pub round_started_at: Option<Instant>,
    /// Seconds per completed layout, in layout order
    pub elapsed: Vec<f64>,
}

impl Session {
    pub fn completed_layouts(&self) -> usize {
        self.elapsed.len()
    }

    /// Moves on to the next layout; used floors never carry over.
    pub fn advance_layout(&mut self) {
        self.layout_index += 1;
        self.used_floors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_is_empty() {
        let session = Session::default();
        assert_eq!(session.layout_index, 0);
        assert!(session.used_floors.is_empty());
        assert_eq!(session.target_floor, None);
        assert_eq!(session.round_started_at, None);
        assert_eq!(session.completed_layouts(), 0);
    }

    #[test]
    fn advancing_clears_used_floors() {
        let mut session = Session::default();
        session.used_floors.insert(4);
        session.used_floors.insert(9);

        session.advance_layout();

        assert_eq!(session.layout_index, 1);
        assert!(session.used_floors.is_empty());
    }
}

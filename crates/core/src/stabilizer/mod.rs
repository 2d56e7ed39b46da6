use std::collections::VecDeque;

use crate::gesture::ModeLabel;

pub const DEFAULT_WINDOW: usize = 5;

/// Majority vote over the most recent raw mode labels.
///
/// Ties go to the label whose first occurrence in the window is oldest, so
/// a mode that has been held longer wins over one that just appeared.
#[derive(Debug, Clone)]
pub struct ModeStabilizer {
    window: VecDeque<ModeLabel>,
    capacity: usize,
}

impl Default for ModeStabilizer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ModeStabilizer {
    /// Creates an empty stabilizer. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Labels currently in the window, oldest first.
    pub fn window(&self) -> impl Iterator<Item = ModeLabel> + '_ {
        self.window.iter().copied()
    }

    /// Records `raw` and returns the stabilised mode.
    pub fn push(&mut self, raw: ModeLabel) -> ModeLabel {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(raw);
        self.majority().unwrap_or(raw)
    }

    /// Most frequent label in the window, or `None` while it is empty.
    pub fn majority(&self) -> Option<ModeLabel> {
        // Candidates in first-seen order; strict `>` keeps the earliest on ties.
        let mut counts: Vec<(ModeLabel, usize)> = Vec::with_capacity(4);
        for label in &self.window {
            match counts.iter_mut().find(|(seen, _)| seen == label) {
                Some((_, count)) => *count += 1,
                None => counts.push((*label, 1)),
            }
        }

        let mut best: Option<(ModeLabel, usize)> = None;
        for (label, count) in counts {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ModeLabel::*;

    fn feed(stabilizer: &mut ModeStabilizer, labels: &[ModeLabel]) -> ModeLabel {
        let mut last = Navigation;
        for &label in labels {
            last = stabilizer.push(label);
        }
        last
    }

    #[test]
    fn majority_absorbs_single_frame_flicker() {
        let mut stabilizer = ModeStabilizer::default();
        let result = feed(
            &mut stabilizer,
            &[Drawing, Drawing, Navigation, Drawing, Drawing],
        );
        assert_eq!(result, Drawing);
    }

    #[test]
    fn first_push_returns_the_raw_label() {
        let mut stabilizer = ModeStabilizer::default();
        assert_eq!(stabilizer.push(Eraser), Eraser);
        assert_eq!(stabilizer.len(), 1);
    }

    #[test]
    fn oldest_label_is_evicted_once_full() {
        let mut stabilizer = ModeStabilizer::new(5);
        feed(
            &mut stabilizer,
            &[Navigation, Navigation, Navigation, Drawing, Drawing],
        );
        assert_eq!(stabilizer.majority(), Some(Navigation));

        assert_eq!(stabilizer.push(Drawing), Drawing);
        assert_eq!(stabilizer.len(), 5);
        assert_eq!(
            stabilizer.window().collect::<Vec<_>>(),
            vec![Navigation, Navigation, Drawing, Drawing, Drawing]
        );
    }

    #[test]
    fn repeated_label_after_a_mixed_window_takes_over() {
        let mut stabilizer = ModeStabilizer::new(4);
        // Four distinct labels: a four-way tie, broken toward the oldest.
        assert_eq!(
            feed(&mut stabilizer, &[Navigation, Drawing, Eraser, Selection]),
            Navigation
        );
        // Navigation is evicted and Selection now holds two of four slots.
        assert_eq!(stabilizer.push(Selection), Selection);
    }

    #[test]
    fn ties_prefer_the_label_seen_first_in_the_window() {
        let mut stabilizer = ModeStabilizer::new(4);
        assert_eq!(
            feed(&mut stabilizer, &[Eraser, Drawing, Drawing, Eraser]),
            Eraser
        );
        assert_eq!(stabilizer.push(Drawing), Drawing);
    }

    #[test]
    fn clear_empties_the_window() {
        let mut stabilizer = ModeStabilizer::default();
        feed(&mut stabilizer, &[Drawing, Drawing, Drawing]);
        stabilizer.clear();
        assert!(stabilizer.is_empty());
        assert_eq!(stabilizer.majority(), None);
        assert_eq!(stabilizer.push(Eraser), Eraser);
    }
}

use std::iter::FusedIterator;

use crate::bitmap::Coordinate;

/// Обход прямоугольной сетки по строкам: слева направо, сверху вниз
///
/// Каждый вызов [`GridIter::new`] начинает обход заново с `(0, 0)`.
#[derive(Debug, Clone)]
pub struct GridIter {
    row: u32,
    col: u32,
    width: u32,
    height: u32,
}

impl GridIter {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        // Сетка без столбцов пуста: сразу встаём за последнюю строку
        let row = if width == 0 { height } else { 0 };
        Self {
            row,
            col: 0,
            width,
            height,
        }
    }

    /// Остались ли ещё координаты
    ///
    /// Линейный индекс и номер строки дают один и тот же ответ; расхождение означает
    /// сломанный инвариант итератора.
    #[must_use]
    pub fn has_next(&self) -> bool {
        let by_index = self.linear_index() < self.total();
        let by_row = self.row < self.height;
        debug_assert_eq!(
            by_index, by_row,
            "grid iterator diverged at ({}, {}) in {}×{}",
            self.row, self.col, self.width, self.height
        );
        by_index && by_row
    }

    fn linear_index(&self) -> u64 {
        u64::from(self.col) + u64::from(self.row) * u64::from(self.width)
    }

    fn total(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl Iterator for GridIter {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Coordinate> {
        if !self.has_next() {
            return None;
        }

        let point = Coordinate::new(self.row, self.col);
        self.col += 1;
        if self.col == self.width {
            self.col = 0;
            self.row += 1;
        }
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.total().saturating_sub(self.linear_index()))
            .unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter {}

impl FusedIterator for GridIter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_rows_left_to_right() {
        let points: Vec<(u32, u32)> = GridIter::new(3, 2).map(Into::into).collect();
        assert_eq!(points, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn reports_exact_length() {
        let mut iter = GridIter::new(4, 3);
        assert_eq!(iter.len(), 12);
        iter.next();
        iter.next();
        assert_eq!(iter.len(), 10);
        assert_eq!(iter.by_ref().count(), 10);
        assert_eq!(iter.len(), 0);
    }

    #[test]
    fn stays_exhausted() {
        let mut iter = GridIter::new(1, 1);
        assert_eq!(iter.next(), Some(Coordinate::new(0, 0)));
        assert!(!iter.has_next());
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn degenerate_grids_are_empty() {
        assert_eq!(GridIter::new(0, 5).count(), 0);
        assert_eq!(GridIter::new(5, 0).count(), 0);
        assert_eq!(GridIter::new(0, 0).count(), 0);
    }

    #[test]
    fn huge_grid_length_saturates() {
        let iter = GridIter::new(u32::MAX, u32::MAX);
        let total = u64::from(u32::MAX) * u64::from(u32::MAX);
        let expected = usize::try_from(total).unwrap_or(usize::MAX);
        assert_eq!(iter.size_hint(), (expected, Some(expected)));
        assert!(iter.len() >= u32::MAX as usize);
    }

    #[test]
    fn single_column() {
        let rows: Vec<u32> = GridIter::new(1, 4).map(|p| p.row).collect();
        assert_eq!(rows, vec![0, 1, 2, 3]);
    }
}

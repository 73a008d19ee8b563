//! Sparse storage for the constraint matrix A paired with the preference
//! matrix P over the same pattern. Every non-zero owns one slot in a flat
//! value array; the row and column views both carry the slot id so a cell
//! can be reached from either direction with one indirection.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Column index in a row view, row index in a column view.
    pub position: usize,
    /// Index into the shared value arrays.
    pub slot: usize,
}

pub struct PairedMatrix {
    row_ptr: Vec<usize>,
    row_cells: Vec<Cell>,
    col_ptr: Vec<usize>,
    col_cells: Vec<Cell>,
    a: Vec<i32>,
    p: Vec<f64>,
}

impl PairedMatrix {
    /// Builds the matrix from the exact set of non-zeros `(row, column,
    /// coefficient)`. The pattern is fixed from here on.
    pub fn new(m: usize, n: usize, entries: &[(usize, usize, i32)]) -> PairedMatrix {
        let mut row_counts = vec![0usize; m];
        let mut col_counts = vec![0usize; n];
        for &(k, j, _) in entries {
            assert!(k < m && j < n);
            row_counts[k] += 1;
            col_counts[j] += 1;
        }

        let mut row_ptr = vec![0usize; m + 1];
        let mut col_ptr = vec![0usize; n + 1];
        for k in 0..m {
            row_ptr[k + 1] = row_ptr[k] + row_counts[k];
        }
        for j in 0..n {
            col_ptr[j + 1] = col_ptr[j] + col_counts[j];
        }

        let nnz = entries.len();
        let placeholder = Cell {
            position: usize::MAX,
            slot: usize::MAX,
        };
        let mut matrix = PairedMatrix {
            row_cells: vec![placeholder; nnz],
            col_cells: vec![placeholder; nnz],
            row_ptr,
            col_ptr,
            a: vec![0; nnz],
            p: vec![0.0; nnz],
        };

        let mut row_fill = vec![0usize; m];
        let mut col_fill = vec![0usize; n];
        for (slot, &(k, j, factor)) in entries.iter().enumerate() {
            matrix.row_cells[matrix.row_ptr[k] + row_fill[k]] = Cell { position: j, slot };
            matrix.col_cells[matrix.col_ptr[j] + col_fill[j]] = Cell { position: k, slot };
            row_fill[k] += 1;
            col_fill[j] += 1;
            matrix.a[slot] = factor;
        }

        matrix.sort();
        matrix
    }

    /// Orders every row view by column and every column view by row. Must
    /// hold before any row update; `new` leaves the matrix sorted.
    pub fn sort(&mut self) {
        for k in 0..self.rows() {
            let range = self.row_ptr[k]..self.row_ptr[k + 1];
            self.row_cells[range].sort_unstable_by_key(|c| c.position);
        }
        for j in 0..self.cols() {
            let range = self.col_ptr[j]..self.col_ptr[j + 1];
            self.col_cells[range].sort_unstable_by_key(|c| c.position);
        }
    }

    pub fn rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    pub fn cols(&self) -> usize {
        self.col_ptr.len() - 1
    }

    pub fn row(&self, k: usize) -> &[Cell] {
        &self.row_cells[self.row_ptr[k]..self.row_ptr[k + 1]]
    }

    pub fn column(&self, j: usize) -> &[Cell] {
        &self.col_cells[self.col_ptr[j]..self.col_ptr[j + 1]]
    }

    pub fn a(&self) -> &[i32] {
        &self.a
    }

    pub fn p(&self) -> &[f64] {
        &self.p
    }

    pub fn clear_p(&mut self) {
        self.p.iter_mut().for_each(|v| *v = 0.0);
    }

    fn slot_of(&self, k: usize, j: usize) -> usize {
        let cells = self.row(k);
        let at = cells
            .binary_search_by_key(&j, |c| c.position)
            .expect("access outside the sparsity pattern");
        cells[at].slot
    }

    pub fn a_at(&self, k: usize, j: usize) -> i32 {
        self.a[self.slot_of(k, j)]
    }

    /// Flips the sign of both A and P at `(k, j)` and returns the new
    /// coefficient.
    pub fn invert_p(&mut self, k: usize, j: usize) -> i32 {
        let slot = self.slot_of(k, j);
        self.a[slot] = -self.a[slot];
        self.p[slot] = -self.p[slot];
        self.a[slot]
    }

    pub fn add_p(&mut self, k: usize, j: usize, delta: f64) {
        let slot = self.slot_of(k, j);
        self.p[slot] += delta;
    }

    pub fn scale_row_p(&mut self, k: usize, factor: f64) {
        for at in self.row_ptr[k]..self.row_ptr[k + 1] {
            let slot = self.row_cells[at].slot;
            self.p[slot] *= factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PairedMatrix {
        // 2 x 3:  [ 1 -1  0 ]
        //         [ 0  1  2 ]
        PairedMatrix::new(2, 3, &[(0, 1, -1), (1, 2, 2), (0, 0, 1), (1, 1, 1)])
    }

    #[test]
    fn row_and_column_views_share_slots() {
        let m = sample();
        for k in 0..m.rows() {
            for cell in m.row(k) {
                let mirrored = m
                    .column(cell.position)
                    .iter()
                    .find(|c| c.position == k)
                    .unwrap();
                assert_eq!(mirrored.slot, cell.slot);
            }
        }
    }

    #[test]
    fn views_are_sorted_by_position() {
        let m = sample();
        assert!(m.row(0).windows(2).all(|w| w[0].position < w[1].position));
        assert!(m.column(1).windows(2).all(|w| w[0].position < w[1].position));
        assert_eq!(m.row(0).iter().map(|c| m.a()[c.slot]).collect::<Vec<_>>(), vec![1, -1]);
    }

    #[test]
    fn invert_p_flips_both_values() {
        let mut m = sample();
        m.add_p(0, 1, 0.25);
        m.invert_p(0, 1);

        let slot = m.row(0)[1].slot;
        assert_eq!(m.a()[slot], 1);
        assert_eq!(m.p()[slot], -0.25);

        m.invert_p(0, 1);
        assert_eq!(m.a()[slot], -1);
        assert_eq!(m.p()[slot], 0.25);
    }

    #[test]
    fn scale_row_p_touches_one_row() {
        let mut m = sample();
        m.add_p(0, 0, 1.0);
        m.add_p(1, 1, 1.0);
        m.scale_row_p(0, 0.5);

        assert_eq!(m.p()[m.row(0)[0].slot], 0.5);
        assert_eq!(m.p()[m.row(1)[0].slot], 1.0);
    }

    #[test]
    #[should_panic(expected = "outside the sparsity pattern")]
    fn access_outside_pattern_panics() {
        let mut m = sample();
        m.add_p(0, 2, 1.0);
    }
}

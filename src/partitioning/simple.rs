//! Geometric equal-count block split.

use crate::topology::Point;
use itertools::Itertools;

/// Assign each cell centre to one of `n[0] * n[1] * n[2]` blocks.
///
/// Cells are sorted by x and cut into `n[0]` equal-count slabs, each slab is
/// sorted by y and cut into `n[1]` columns, each column by z into `n[2]`
/// blocks. Ties are broken by cell index, so the result is deterministic.
/// Block `(ix, iy, iz)` becomes processor `ix + n[0] * (iy + n[1] * iz)`.
pub fn simple_decomposition(centres: &[Point], n: [usize; 3]) -> Vec<usize> {
    let mut cell_to_proc = vec![0usize; centres.len()];
    let all: Vec<usize> = (0..centres.len()).collect();
    for (ix, slab) in split_axis(all, centres, 0, n[0]).into_iter().enumerate() {
        for (iy, column) in split_axis(slab, centres, 1, n[1]).into_iter().enumerate() {
            for (iz, block) in split_axis(column, centres, 2, n[2]).into_iter().enumerate() {
                let proc = ix + n[0] * (iy + n[1] * iz);
                for c in block {
                    cell_to_proc[c] = proc;
                }
            }
        }
    }
    cell_to_proc
}

/// Sort `cells` along `axis` and cut them into `parts` runs whose lengths
/// differ by at most one.
fn split_axis(cells: Vec<usize>, centres: &[Point], axis: usize, parts: usize) -> Vec<Vec<usize>> {
    let sorted: Vec<usize> = cells
        .into_iter()
        .sorted_by(|&a, &b| centres[a][axis].total_cmp(&centres[b][axis]).then(a.cmp(&b)))
        .collect();
    let m = sorted.len();
    (0..parts)
        .map(|i| sorted[i * m / parts..(i + 1) * m / parts].to_vec())
        .collect()
}

//! Cell ownership: which processor each global cell is assigned to.
//!
//! The [`CellOwnership`] map validates a cell→processor list once and
//! precomputes the per-processor cell lists and the local index of every
//! global cell on its processor, so decomposition never re-scans the map.

use crate::mesh_error::MeshError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellOwnership {
    cell_to_proc: Vec<usize>,
    proc_cells: Vec<Vec<usize>>,
    local_index: Vec<usize>,
}

impl CellOwnership {
    /// Validate `cell_to_proc` against `n_procs` and index it.
    ///
    /// # Errors
    /// - [`MeshError::NoProcessors`] if `n_procs == 0`.
    /// - [`MeshError::ProcessorOutOfRange`] naming the first offending cell.
    pub fn new(cell_to_proc: Vec<usize>, n_procs: usize) -> Result<Self, MeshError> {
        if n_procs == 0 {
            return Err(MeshError::NoProcessors);
        }
        let mut proc_cells = vec![Vec::new(); n_procs];
        let mut local_index = Vec::with_capacity(cell_to_proc.len());
        for (cell, &proc) in cell_to_proc.iter().enumerate() {
            let cells = proc_cells
                .get_mut(proc)
                .ok_or(MeshError::ProcessorOutOfRange {
                    cell,
                    proc,
                    n_procs,
                })?;
            local_index.push(cells.len());
            cells.push(cell);
        }
        Ok(Self {
            cell_to_proc,
            proc_cells,
            local_index,
        })
    }

    /// Like [`new`](Self::new), additionally checking the map covers `n_cells` cells.
    pub fn for_cells(
        cell_to_proc: Vec<usize>,
        n_procs: usize,
        n_cells: usize,
    ) -> Result<Self, MeshError> {
        if cell_to_proc.len() != n_cells {
            return Err(MeshError::CellMapLengthMismatch {
                expected: n_cells,
                found: cell_to_proc.len(),
            });
        }
        Self::new(cell_to_proc, n_procs)
    }

    pub fn n_procs(&self) -> usize {
        self.proc_cells.len()
    }

    pub fn n_cells(&self) -> usize {
        self.cell_to_proc.len()
    }

    /// The raw cell→processor list.
    pub fn cell_to_proc(&self) -> &[usize] {
        &self.cell_to_proc
    }

    /// Processor owning `cell`. Panics if `cell` is out of range.
    #[inline]
    pub fn proc_of(&self, cell: usize) -> usize {
        self.cell_to_proc[cell]
    }

    /// Processor owning `cell`, or `None` if the cell does not exist.
    pub fn try_proc_of(&self, cell: usize) -> Option<usize> {
        self.cell_to_proc.get(cell).copied()
    }

    /// Ascending global cells of `proc`.
    pub fn proc_cells(&self, proc: usize) -> &[usize] {
        &self.proc_cells[proc]
    }

    /// Index of global `cell` within its processor's cell list.
    #[inline]
    pub fn local_index(&self, cell: usize) -> usize {
        self.local_index[cell]
    }

    /// Processors with no cells assigned.
    pub fn empty_procs(&self) -> impl Iterator<Item = usize> + '_ {
        self.proc_cells
            .iter()
            .enumerate()
            .filter(|(_, cells)| cells.is_empty())
            .map(|(p, _)| p)
    }

    /// Whether `cell` is owned by `proc`.
    pub fn is_owned_by(&self, cell: usize, proc: usize) -> bool {
        self.try_proc_of(cell).is_some_and(|owner| owner == proc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_cells_per_processor() {
        let own = CellOwnership::new(vec![1, 0, 1, 2, 0], 4).unwrap();
        assert_eq!(own.proc_cells(0), &[1, 4]);
        assert_eq!(own.proc_cells(1), &[0, 2]);
        assert_eq!(own.proc_cells(2), &[3]);
        assert_eq!(own.local_index(4), 1);
        assert_eq!(own.local_index(3), 0);
        assert_eq!(own.empty_procs().collect::<Vec<_>>(), vec![3]);
        assert!(own.is_owned_by(2, 1));
        assert!(!own.is_owned_by(9, 1));
    }

    #[test]
    fn out_of_range_processor_names_cell() {
        let err = CellOwnership::new(vec![0, 1, 5], 2).unwrap_err();
        assert_eq!(
            err,
            MeshError::ProcessorOutOfRange {
                cell: 2,
                proc: 5,
                n_procs: 2
            }
        );
    }

    #[test]
    fn zero_processors_rejected() {
        assert_eq!(CellOwnership::new(vec![], 0), Err(MeshError::NoProcessors));
    }

    #[test]
    fn length_mismatch_rejected() {
        assert_eq!(
            CellOwnership::for_cells(vec![0, 0], 1, 3),
            Err(MeshError::CellMapLengthMismatch {
                expected: 3,
                found: 2
            })
        );
    }
}

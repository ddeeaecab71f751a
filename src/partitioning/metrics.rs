//! Decomposition quality metrics.
//!
//! Counts per processor plus the two numbers that matter for parallel
//! efficiency: cell imbalance and the size of the processor interfaces
//! (cut faces and shared points).

use crate::algs::ProcMesh;
use hashbrown::HashMap;
use itertools::Itertools;
use log::info;
use std::collections::BTreeMap;

/// Sizes of one processor piece.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcStats {
    pub cells: usize,
    pub faces: usize,
    pub internal_faces: usize,
    pub points: usize,
    pub processor_patches: usize,
    pub processor_faces: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecompositionStats {
    pub procs: Vec<ProcStats>,
    /// Distinct global faces cut between processors.
    pub cut_faces: usize,
    /// Largest deviation of a processor's cell count from the mean, in percent.
    pub max_imbalance_percent: f64,
    /// Global points present on more than one processor.
    pub shared_points: usize,
    /// Shared points per processor pair `(p, q)` with `p < q`.
    pub shared_point_pairs: BTreeMap<(usize, usize), usize>,
}

impl DecompositionStats {
    pub fn compute(procs: &[ProcMesh]) -> Self {
        let stats: Vec<ProcStats> = procs
            .iter()
            .map(|piece| {
                let mesh = &piece.mesh;
                let processor_faces = mesh
                    .processor_patches()
                    .map(|i| mesh.patches()[i].size)
                    .sum();
                ProcStats {
                    cells: mesh.n_cells(),
                    faces: mesh.n_faces(),
                    internal_faces: mesh.n_internal_faces(),
                    points: mesh.n_points(),
                    processor_patches: mesh.processor_patches().count(),
                    processor_faces,
                }
            })
            .collect();

        let cut_faces = stats.iter().map(|s| s.processor_faces).sum::<usize>() / 2;
        let max_imbalance_percent = imbalance(&stats);

        let mut holders: HashMap<usize, Vec<usize>> = HashMap::new();
        for piece in procs {
            for &g in piece.addressing.point() {
                holders.entry(g).or_default().push(piece.proc_id());
            }
        }
        let mut shared_points = 0;
        let mut shared_point_pairs = BTreeMap::new();
        for ranks in holders.values().filter(|r| r.len() > 1) {
            shared_points += 1;
            for (p, q) in ranks.iter().copied().sorted_unstable().tuple_combinations() {
                *shared_point_pairs.entry((p, q)).or_insert(0) += 1;
            }
        }

        Self {
            procs: stats,
            cut_faces,
            max_imbalance_percent,
            shared_points,
            shared_point_pairs,
        }
    }

    pub fn n_procs(&self) -> usize {
        self.procs.len()
    }

    /// Emit the summary through the `log` facade.
    pub fn log_summary(&self) {
        for (p, s) in self.procs.iter().enumerate() {
            info!(
                "processor {p}: {} cells, {} faces ({} internal), {} points, \
                 {} processor patches with {} faces",
                s.cells, s.faces, s.internal_faces, s.points, s.processor_patches, s.processor_faces
            );
        }
        info!(
            "{} processors: {} cut faces, {} shared points, max cell imbalance {:.1}%",
            self.n_procs(),
            self.cut_faces,
            self.shared_points,
            self.max_imbalance_percent
        );
    }
}

fn imbalance(stats: &[ProcStats]) -> f64 {
    if stats.is_empty() {
        return 0.0;
    }
    let total: usize = stats.iter().map(|s| s.cells).sum();
    let mean = total as f64 / stats.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    stats
        .iter()
        .map(|s| (s.cells as f64 - mean).abs() / mean * 100.0)
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::decompose_mesh_with;
    use crate::topology::{CellOwnership, hex_lattice};
    use approx::assert_relative_eq;

    #[test]
    fn two_slabs_share_one_plane() {
        let mesh = hex_lattice(2, 2, 2).unwrap();
        let own = CellOwnership::new((0..8).map(|c| usize::from(c >= 4)).collect(), 2).unwrap();
        let procs = decompose_mesh_with(&mesh, &own, false).unwrap();
        let stats = DecompositionStats::compute(&procs);
        assert_eq!(stats.cut_faces, 4);
        assert_eq!(stats.shared_points, 9);
        assert_eq!(stats.shared_point_pairs.get(&(0, 1)), Some(&9));
        assert_relative_eq!(stats.max_imbalance_percent, 0.0);
        assert_eq!(stats.procs[0].processor_patches, 1);
        assert_eq!(stats.procs[1].internal_faces, 4);
    }

    #[test]
    fn imbalance_is_relative_to_mean() {
        let mesh = hex_lattice(4, 1, 1).unwrap();
        let own = CellOwnership::new(vec![0, 0, 0, 1], 2).unwrap();
        let procs = decompose_mesh_with(&mesh, &own, false).unwrap();
        let stats = DecompositionStats::compute(&procs);
        assert_relative_eq!(stats.max_imbalance_percent, 50.0);
        assert_eq!(stats.shared_points, 4);
    }
}

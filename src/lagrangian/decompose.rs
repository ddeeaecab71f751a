//! Split clouds by the processor of each particle's cell, and gather them back.
//!
//! Particles keep their relative storage order on every processor, so a
//! cloud is reconstructed by a stable gather through `particle_indices`.

use crate::algs::map_procs;
use crate::lagrangian::{CellParticles, Cloud, ParticleField, ParticleStorage};
use crate::mesh_error::MeshError;
use crate::topology::{CellOwnership, Point};
use log::debug;
use std::collections::BTreeSet;

/// One processor's part of a cloud.
///
/// `cloud.cells()` holds local cell indices; `particle_indices[i]` is the
/// storage index of local particle `i` in the global cloud.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcCloud {
    pub cloud: Cloud,
    pub particle_indices: Vec<usize>,
}

/// Selects one processor's particles from a global cloud.
#[derive(Clone, Debug)]
pub struct LagrangianDecomposer<'a> {
    proc_id: usize,
    cloud: &'a Cloud,
    particle_indices: Vec<usize>,
}

impl<'a> LagrangianDecomposer<'a> {
    /// Collect the particles of `proc_id`'s cells in storage order.
    pub fn new(
        ownership: &CellOwnership,
        groups: &CellParticles,
        cloud: &'a Cloud,
        proc_id: usize,
    ) -> Self {
        let mut particle_indices: Vec<usize> = ownership
            .proc_cells(proc_id)
            .iter()
            .flat_map(|&c| groups.in_cell(c).iter().copied())
            .collect();
        particle_indices.sort_unstable();
        Self {
            proc_id,
            cloud,
            particle_indices,
        }
    }

    pub fn proc_id(&self) -> usize {
        self.proc_id
    }

    pub fn particle_indices(&self) -> &[usize] {
        &self.particle_indices
    }

    pub fn decompose_positions(&self) -> Vec<Point> {
        let positions = self.cloud.positions();
        self.particle_indices.iter().map(|&i| positions[i]).collect()
    }

    pub fn decompose_field(&self, field: &ParticleField) -> ParticleField {
        field.select(&self.particle_indices)
    }

    /// Build this processor's cloud with local cell indices.
    pub fn decompose(&self, ownership: &CellOwnership) -> Result<ProcCloud, MeshError> {
        let cells = self
            .particle_indices
            .iter()
            .map(|&i| ownership.local_index(self.cloud.cells()[i]))
            .collect();
        let mut cloud = Cloud::new(self.cloud.name.clone(), self.decompose_positions(), cells)?;
        for (name, field) in self.cloud.fields() {
            cloud.insert_field(name.clone(), self.decompose_field(field))?;
        }
        debug!(
            "cloud `{}`: processor {} receives {} of {} particles",
            cloud.name,
            self.proc_id,
            cloud.n_particles(),
            self.cloud.n_particles()
        );
        Ok(ProcCloud {
            cloud,
            particle_indices: self.particle_indices.clone(),
        })
    }
}

/// Decompose `cloud` onto every processor of `ownership`.
///
/// A particle whose cell does not exist is fatal: the cloud and the mesh
/// come from different states.
pub fn decompose_cloud(
    ownership: &CellOwnership,
    cloud: &Cloud,
    parallel: bool,
) -> Result<Vec<ProcCloud>, MeshError> {
    let groups = CellParticles::build(cloud, ownership.n_cells())?;
    map_procs(ownership.n_procs(), parallel, |p| {
        LagrangianDecomposer::new(ownership, &groups, cloud, p).decompose(ownership)
    })
}

/// Reassemble a cloud from its processor pieces.
///
/// `cell_addressing[p]` maps processor `p`'s local cells to global cells.
/// Missing pieces contribute nothing. The particle indices of all pieces
/// must form a permutation of the global storage order.
pub fn reconstruct_cloud(
    name: &str,
    cell_addressing: &[&[usize]],
    pieces: &[Option<ProcCloud>],
) -> Result<Cloud, MeshError> {
    if cell_addressing.len() != pieces.len() {
        return Err(MeshError::ProcessorCountMismatch {
            expected: cell_addressing.len(),
            found: pieces.len(),
        });
    }
    let present: Vec<(usize, &ProcCloud)> = pieces
        .iter()
        .enumerate()
        .filter_map(|(p, piece)| piece.as_ref().map(|c| (p, c)))
        .collect();

    let total: usize = present.iter().map(|(_, c)| c.cloud.n_particles()).sum();
    let mut seen = vec![false; total];
    for (_, piece) in &present {
        if piece.particle_indices.len() != piece.cloud.n_particles() {
            return Err(MeshError::FieldLengthMismatch {
                field: format!("{}.particleIndices", piece.cloud.name),
                expected: piece.cloud.n_particles(),
                found: piece.particle_indices.len(),
            });
        }
        for &index in &piece.particle_indices {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => return Err(MeshError::ParticleIndexConflict { index, total }),
            }
        }
    }

    let positions: Vec<(&Vec<Point>, &[usize])> = present
        .iter()
        .map(|(_, c)| (&c.cloud.positions, c.particle_indices.as_slice()))
        .collect();
    let positions: Vec<Point> = ParticleStorage::scatter(&positions, total);

    let mut global_cells = Vec::with_capacity(present.len());
    for &(p, piece) in &present {
        let addressing = cell_addressing[p];
        let cells = piece
            .cloud
            .cells()
            .iter()
            .zip(&piece.particle_indices)
            .map(|(&lc, &particle)| {
                addressing
                    .get(lc)
                    .copied()
                    .ok_or(MeshError::StaleParticleCell {
                        particle,
                        cell: lc,
                        n_cells: addressing.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        global_cells.push(cells);
    }
    let cells: Vec<(&Vec<usize>, &[usize])> = global_cells
        .iter()
        .zip(&present)
        .map(|(cells, (_, c))| (cells, c.particle_indices.as_slice()))
        .collect();
    let cells: Vec<usize> = ParticleStorage::scatter(&cells, total);

    let mut cloud = Cloud::new(name, positions, cells)?;
    let names: BTreeSet<&String> = present
        .iter()
        .flat_map(|(_, c)| c.cloud.fields().keys())
        .collect();
    for field_name in names {
        let mut parts = Vec::with_capacity(present.len());
        for (_, piece) in &present {
            match piece.cloud.field(field_name) {
                Some(field) => parts.push((field, piece.particle_indices.as_slice())),
                None if piece.cloud.n_particles() == 0 => {}
                None => {
                    return Err(MeshError::FieldLengthMismatch {
                        field: format!("{name}.{field_name}"),
                        expected: piece.cloud.n_particles(),
                        found: 0,
                    });
                }
            }
        }
        let field = ParticleField::scatter(field_name, &parts, total)?;
        cloud.insert_field(field_name.clone(), field)?;
    }
    Ok(cloud)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lagrangian::CompactField;

    fn sample_cloud() -> Cloud {
        let cells = vec![2, 0, 1, 2, 3, 0];
        let positions = (0..cells.len()).map(|i| [i as f64, 0.0, 0.0]).collect();
        let mut cloud = Cloud::new("spray", positions, cells).unwrap();
        cloud
            .insert_field("d", ParticleField::Scalar(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]))
            .unwrap();
        cloud
            .insert_field(
                "hits",
                ParticleField::LabelList(CompactField::from_lists(vec![
                    vec![1],
                    vec![],
                    vec![2, 3],
                    vec![4],
                    vec![],
                    vec![5, 6, 7],
                ])),
            )
            .unwrap();
        cloud
    }

    #[test]
    fn particles_keep_storage_order() {
        let own = CellOwnership::new(vec![0, 1, 0, 1], 2).unwrap();
        let procs = decompose_cloud(&own, &sample_cloud(), false).unwrap();
        assert_eq!(procs[0].particle_indices, vec![0, 1, 3, 5]);
        assert_eq!(procs[1].particle_indices, vec![2, 4]);
        // global cells 2, 0, 2, 0 are local cells 1, 0, 1, 0 on processor 0
        assert_eq!(procs[0].cloud.cells(), &[1, 0, 1, 0]);
        assert_eq!(
            procs[1].cloud.field("hits"),
            Some(&ParticleField::LabelList(CompactField::from_lists(vec![
                vec![2, 3],
                vec![]
            ])))
        );
    }

    #[test]
    fn reconstruction_restores_cloud() {
        let own = CellOwnership::new(vec![1, 0, 1, 2], 3).unwrap();
        let cloud = sample_cloud();
        let procs = decompose_cloud(&own, &cloud, false).unwrap();
        let addressing: Vec<&[usize]> = (0..3).map(|p| own.proc_cells(p)).collect();
        let pieces: Vec<Option<ProcCloud>> = procs.into_iter().map(Some).collect();
        assert_eq!(reconstruct_cloud("spray", &addressing, &pieces).unwrap(), cloud);
    }

    #[test]
    fn stale_cell_is_fatal() {
        let own = CellOwnership::new(vec![0, 0, 0], 1).unwrap();
        assert!(matches!(
            decompose_cloud(&own, &sample_cloud(), false),
            Err(MeshError::StaleParticleCell { particle: 4, cell: 3, .. })
        ));
    }

    #[test]
    fn duplicated_index_is_rejected() {
        let own = CellOwnership::new(vec![0, 1, 0, 1], 2).unwrap();
        let mut procs = decompose_cloud(&own, &sample_cloud(), false).unwrap();
        procs[1].particle_indices[0] = 0;
        let addressing: Vec<&[usize]> = (0..2).map(|p| own.proc_cells(p)).collect();
        let pieces: Vec<Option<ProcCloud>> = procs.into_iter().map(Some).collect();
        assert_eq!(
            reconstruct_cloud("spray", &addressing, &pieces).unwrap_err(),
            MeshError::ParticleIndexConflict { index: 0, total: 6 }
        );
    }
}

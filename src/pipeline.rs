//! Case-level drivers: decompose a case into processor directories and
//! reconstruct it back.
//!
//! Both directions compute everything in memory first and queue every file
//! in one [`WriteBatch`]; nothing is written unless the whole run succeeds.

use crate::algs::{
    FieldDecomposer, FieldReconstructor, ProcMesh, decompose_mesh_with, map_procs, reconstruct_mesh,
};
use crate::config::{DICT_PATH, DecomposeConfig};
use crate::field::{
    FaceOrientation, Label, PointField, Scalar, SurfaceField, Vector, VolField,
};
use crate::io::field_store::{FieldHeader, FieldStore};
use crate::io::mesh_io::{has_poly_mesh, push_poly_mesh, read_poly_mesh};
use crate::io::{
    WriteBatch, count_processor_dirs, processor_dir, push_processor_mesh, read_processor_mesh,
};
use crate::lagrangian::{
    Cloud, CompactField, ParticleField, ProcCloud, decompose_cloud, reconstruct_cloud,
};
use crate::mesh_error::{FieldCategory, MeshError};
use crate::partitioning::{DecompositionStats, assign_cells};
use crate::topology::{CellOwnership, MeshConnectivity, MeshGeometry, PolyMesh, hex_lattice};
use crate::with_value_type;
use itertools::Itertools;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::Path;

/// Where the cell→processor map is recorded on decomposition.
pub const CELL_DECOMPOSITION_PATH: &str = "constant/cellDecomposition.json";

/// What a decomposition run produced.
#[derive(Clone, Debug)]
pub struct DecomposeSummary {
    pub n_procs: usize,
    pub times: Vec<String>,
    pub fields: usize,
    pub clouds: usize,
    pub files_written: usize,
    pub stats: DecompositionStats,
}

/// What a reconstruction run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconstructSummary {
    pub n_procs: usize,
    pub mesh_reconstructed: bool,
    pub times: Vec<String>,
    pub fields: usize,
    pub clouds: usize,
    pub files_written: usize,
}

/// Split the mesh, every field of every time, and every cloud of `case`
/// into `processor<N>` directories.
pub fn decompose_case(
    case: impl AsRef<Path>,
    config: &DecomposeConfig,
) -> Result<DecomposeSummary, MeshError> {
    let case = case.as_ref();
    config.validate()?;
    let mesh = read_poly_mesh(case)?;
    info!(
        "decomposing {} cells, {} faces, {} points into {} processors",
        mesh.n_cells(),
        mesh.n_faces(),
        mesh.n_points(),
        config.number_of_subdomains
    );
    let ownership = assign_cells(config, &mesh, case)?;
    let procs = decompose_mesh_with(&mesh, &ownership, config.parallel)?;
    let stats = DecompositionStats::compute(&procs);
    stats.log_summary();

    let decomposers = procs
        .iter()
        .map(|piece| FieldDecomposer::new(&mesh, piece, config.processor_patch_values))
        .collect::<Result<Vec<_>, _>>()?;
    let proc_stores: Vec<FieldStore> = (0..procs.len())
        .map(|p| FieldStore::new(processor_dir(case, p)))
        .collect();

    let mut batch = WriteBatch::new();
    batch.push_json(case.join(CELL_DECOMPOSITION_PATH), ownership.cell_to_proc())?;
    for piece in &procs {
        push_processor_mesh(&mut batch, case, piece, procs.len())?;
    }

    let store = FieldStore::new(case);
    let times = store.times()?;
    let split = Splitter {
        decomposers: &decomposers,
        proc_stores: &proc_stores,
        parallel: config.parallel,
    };
    let mut n_fields = 0;
    let mut n_clouds = 0;
    for time in &times {
        for header in store.fields(time)? {
            debug!("decomposing {} field `{}` at time {time}", header.category, header.name);
            split.field(&store, time, &header, &mut batch)?;
            n_fields += 1;
        }
        if config.write_cell_dist {
            let dist = cell_dist(&mesh, &ownership)?;
            store.push_vol(&mut batch, time, &dist)?;
        }
        for name in store.clouds(time)? {
            debug!("decomposing cloud `{name}` at time {time}");
            let cloud = store.read_cloud(time, &name)?;
            for (piece, proc_store) in decompose_cloud(&ownership, &cloud, config.parallel)?
                .iter()
                .zip(&proc_stores)
            {
                proc_store.push_proc_cloud(&mut batch, time, piece)?;
            }
            n_clouds += 1;
        }
    }

    let files_written = batch.commit()?;
    info!(
        "wrote {} processor directories ({files_written} files): {n_fields} fields, \
         {n_clouds} clouds over {} times",
        procs.len(),
        times.len()
    );
    Ok(DecomposeSummary {
        n_procs: procs.len(),
        times,
        fields: n_fields,
        clouds: n_clouds,
        files_written,
        stats,
    })
}

/// The cell→processor map as a label field.
fn cell_dist(mesh: &PolyMesh, ownership: &CellOwnership) -> Result<VolField<Label>, MeshError> {
    let values = ownership.cell_to_proc().iter().map(|&p| p as Label).collect();
    VolField::from_cell_values("cellDist", mesh, values)
}

struct Splitter<'s, 'a> {
    decomposers: &'s [FieldDecomposer<'a>],
    proc_stores: &'s [FieldStore],
    parallel: bool,
}

impl Splitter<'_, '_> {
    fn field(
        &self,
        store: &FieldStore,
        time: &str,
        header: &FieldHeader,
        batch: &mut WriteBatch,
    ) -> Result<(), MeshError> {
        let n = self.decomposers.len();
        let name = header.name.as_str();
        with_value_type!(header.value_type, T => match header.category {
            FieldCategory::Vol => {
                let field = store.read_vol::<T>(time, name)?;
                let pieces = map_procs(n, self.parallel, |p| self.decomposers[p].decompose_vol(&field))?;
                for (piece, proc_store) in pieces.iter().zip(self.proc_stores) {
                    proc_store.push_vol(batch, time, piece)?;
                }
            }
            FieldCategory::Surface => {
                let field = store.read_surface::<T>(time, name)?;
                let pieces =
                    map_procs(n, self.parallel, |p| self.decomposers[p].decompose_surface(&field))?;
                for (piece, proc_store) in pieces.iter().zip(self.proc_stores) {
                    proc_store.push_surface(batch, time, piece)?;
                }
            }
            FieldCategory::Point => {
                let field = store.read_point::<T>(time, name)?;
                let pieces =
                    map_procs(n, self.parallel, |p| self.decomposers[p].decompose_point(&field))?;
                for (piece, proc_store) in pieces.iter().zip(self.proc_stores) {
                    proc_store.push_point(batch, time, piece)?;
                }
            }
        });
        Ok(())
    }
}

/// Gather every processor directory of `case` back into the case.
///
/// The global mesh is read when present and rebuilt from the processor
/// meshes otherwise. Fields and clouds are the union over processors; a
/// processor lacking one contributes nothing to it.
pub fn reconstruct_case(
    case: impl AsRef<Path>,
    config: &DecomposeConfig,
) -> Result<ReconstructSummary, MeshError> {
    let case = case.as_ref();
    let n_procs = count_processor_dirs(case)?;
    if n_procs != config.number_of_subdomains {
        return Err(MeshError::ProcessorCountMismatch {
            expected: config.number_of_subdomains,
            found: n_procs,
        });
    }
    let procs = map_procs(n_procs, config.parallel, |p| read_processor_mesh(case, p, n_procs))?;

    let mut batch = WriteBatch::new();
    let mesh_reconstructed = !has_poly_mesh(case);
    let mesh = if mesh_reconstructed {
        info!("no global mesh in {}; rebuilding it from {n_procs} processors", case.display());
        let mesh = reconstruct_mesh(&procs)?;
        push_poly_mesh(&mut batch, case, &mesh)?;
        mesh
    } else {
        read_poly_mesh(case)?
    };

    let reconstructor = FieldReconstructor::new(&mesh, &procs, config.point_arbitration)?;
    let proc_stores: Vec<FieldStore> = (0..n_procs)
        .map(|p| FieldStore::new(processor_dir(case, p)))
        .collect();
    let store = FieldStore::new(case);
    let gather = Gatherer {
        reconstructor: &reconstructor,
        proc_stores: &proc_stores,
        store: &store,
    };

    let times = union_times(&proc_stores)?;
    let mut n_fields = 0;
    let mut n_clouds = 0;
    for time in &times {
        let mut headers: BTreeMap<String, FieldHeader> = BTreeMap::new();
        for proc_store in &proc_stores {
            for header in proc_store.fields(time)? {
                headers.entry(header.name.clone()).or_insert(header);
            }
        }
        for header in headers.values() {
            debug!("reconstructing {} field `{}` at time {time}", header.category, header.name);
            gather.field(time, header, &mut batch)?;
            n_fields += 1;
        }

        let mut clouds = Vec::new();
        for proc_store in &proc_stores {
            clouds.extend(proc_store.clouds(time)?);
        }
        for name in clouds.into_iter().sorted_unstable().dedup() {
            debug!("reconstructing cloud `{name}` at time {time}");
            gather.cloud(time, &name, &procs, &mut batch)?;
            n_clouds += 1;
        }
    }

    let files_written = batch.commit()?;
    info!(
        "reconstructed {n_fields} fields and {n_clouds} clouds over {} times from {n_procs} \
         processors ({files_written} files)",
        times.len()
    );
    Ok(ReconstructSummary {
        n_procs,
        mesh_reconstructed,
        times,
        fields: n_fields,
        clouds: n_clouds,
        files_written,
    })
}

/// Every time present on any processor, in ascending time.
fn union_times(stores: &[FieldStore]) -> Result<Vec<String>, MeshError> {
    let mut times = Vec::new();
    for store in stores {
        times.extend(store.times()?);
    }
    Ok(times
        .into_iter()
        .unique()
        .filter_map(|t| t.parse::<f64>().ok().map(|v| (v, t)))
        .sorted_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, t)| t)
        .collect())
}

struct Gatherer<'s, 'a> {
    reconstructor: &'s FieldReconstructor<'a>,
    proc_stores: &'s [FieldStore],
    store: &'s FieldStore,
}

impl Gatherer<'_, '_> {
    /// One optional piece per processor: `None` where the file is absent.
    fn pieces<F>(
        &self,
        time: &str,
        name: &str,
        read: impl Fn(&FieldStore) -> Result<F, MeshError>,
    ) -> Result<Vec<Option<F>>, MeshError> {
        self.proc_stores
            .iter()
            .map(|s| s.has_field(time, name).then(|| read(s)).transpose())
            .collect()
    }

    fn field(&self, time: &str, header: &FieldHeader, batch: &mut WriteBatch) -> Result<(), MeshError> {
        let name = header.name.as_str();
        with_value_type!(header.value_type, T => match header.category {
            FieldCategory::Vol => {
                let pieces = self.pieces(time, name, |s| s.read_vol::<T>(time, name))?;
                let field = self.reconstructor.reconstruct_vol(name, &pieces)?;
                self.store.push_vol(batch, time, &field)?;
            }
            FieldCategory::Surface => {
                let pieces = self.pieces(time, name, |s| s.read_surface::<T>(time, name))?;
                let field = self.reconstructor.reconstruct_surface(name, &pieces)?;
                self.store.push_surface(batch, time, &field)?;
            }
            FieldCategory::Point => {
                let pieces = self.pieces(time, name, |s| s.read_point::<T>(time, name))?;
                let field = self.reconstructor.reconstruct_point(name, &pieces)?;
                self.store.push_point(batch, time, &field)?;
            }
        });
        Ok(())
    }

    fn cloud(
        &self,
        time: &str,
        name: &str,
        procs: &[ProcMesh],
        batch: &mut WriteBatch,
    ) -> Result<(), MeshError> {
        let pieces: Vec<Option<ProcCloud>> = self
            .proc_stores
            .iter()
            .map(|s| s.has_cloud(time, name).then(|| s.read_proc_cloud(time, name)).transpose())
            .collect::<Result<_, _>>()?;
        let cell_addressing: Vec<&[usize]> = procs.iter().map(|p| p.addressing.cell()).collect();
        let cloud = reconstruct_cloud(name, &cell_addressing, &pieces)?;
        self.store.push_cloud(batch, time, &cloud)
    }
}

/// Write a structured demo case: an `nx × ny × nz` hex lattice with a few
/// fields of every category at time `0`, one particle cloud, and settings
/// for a simple split into `n_procs` slabs along x.
pub fn write_lattice_case(
    case: impl AsRef<Path>,
    n: [usize; 3],
    n_procs: usize,
) -> Result<(), MeshError> {
    let case = case.as_ref();
    let mesh = hex_lattice(n[0], n[1], n[2])?;
    let connectivity = MeshConnectivity::build(&mesh);
    let geometry = MeshGeometry::build(&mesh, &connectivity);
    let config = DecomposeConfig::simple_x(n_procs);
    config.validate()?;

    let mut batch = WriteBatch::new();
    push_poly_mesh(&mut batch, case, &mesh)?;
    batch.push_json(case.join(DICT_PATH), &config)?;

    let store = FieldStore::new(case);
    let temperature: Vec<Scalar> = geometry
        .cell_centres()
        .iter()
        .map(|c| 300.0 + 10.0 * c[0])
        .collect();
    store.push_vol(&mut batch, "0", &VolField::from_cell_values("T", &mesh, temperature)?)?;
    store.push_vol(&mut batch, "0", &VolField::<Vector>::uniform("U", &mesh, [1.0, 0.0, 0.0]))?;
    let flux: Vec<Scalar> = geometry.face_centres().iter().map(|c| c[0] + 0.5 * c[1]).collect();
    store.push_surface(
        &mut batch,
        "0",
        &SurfaceField::from_face_values("phi", FaceOrientation::Oriented, &mesh, flux)?,
    )?;
    let displacement: Vec<Vector> = mesh.points().iter().map(|p| p.map(|x| 0.01 * x)).collect();
    store.push_point(&mut batch, "0", &PointField::new("pointDisplacement", displacement))?;
    store.push_cloud(&mut batch, "0", &lattice_cloud(&geometry)?)?;

    let files = batch.commit()?;
    info!(
        "wrote {}x{}x{} lattice case to {} ({files} files)",
        n[0],
        n[1],
        n[2],
        case.display()
    );
    Ok(())
}

/// One particle at the centre of every other cell, in reverse cell order.
fn lattice_cloud(geometry: &MeshGeometry) -> Result<Cloud, MeshError> {
    let cells: Vec<usize> = (0..geometry.cell_centres().len()).rev().step_by(2).collect();
    let positions = cells.iter().map(|&c| geometry.cell_centres()[c]).collect();
    let diameters = (0..cells.len()).map(|i| 1e-4 * (i + 1) as Scalar).collect();
    let origins = cells.iter().map(|&c| c as Label).collect();
    let history = CompactField::from_lists(cells.iter().map(|&c| (0..c as Label % 3).collect()));
    let mut cloud = Cloud::new("sprayCloud", positions, cells)?;
    cloud.insert_field("d", ParticleField::Scalar(diameters))?;
    cloud.insert_field("origId", ParticleField::Label(origins))?;
    cloud.insert_field("history", ParticleField::LabelList(history))?;
    Ok(cloud)
}

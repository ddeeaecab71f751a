//! Particle clouds and their per-particle attribute fields.
//!
//! A cloud stores particles in a fixed storage order. Each particle has a
//! position, the global cell it sits in, and one entry in every attribute
//! field. Attribute fields come in two layouts behind [`ParticleStorage`]:
//! one value per particle (`Vec<T>`), or a variable-length list of values
//! per particle ([`CompactField`]).

pub mod decompose;

pub use decompose::{LagrangianDecomposer, ProcCloud, decompose_cloud, reconstruct_cloud};

use crate::field::{Label, Scalar, SymmTensor, Tensor, Vector};
use crate::mesh_error::MeshError;
use crate::topology::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selection and gathering shared by every particle field layout.
pub trait ParticleStorage: Sized {
    fn n_particles(&self) -> usize;

    /// Entries of `indices`, in that order.
    fn select(&self, indices: &[usize]) -> Self;

    /// Inverse of [`select`](Self::select): place every piece's particles at
    /// the global indices paired with it. The indices of all pieces must form
    /// a permutation of `0..total`.
    fn scatter(pieces: &[(&Self, &[usize])], total: usize) -> Self;
}

impl<T: Clone> ParticleStorage for Vec<T> {
    fn n_particles(&self) -> usize {
        self.len()
    }

    fn select(&self, indices: &[usize]) -> Self {
        indices.iter().map(|&i| self[i].clone()).collect()
    }

    fn scatter(pieces: &[(&Self, &[usize])], total: usize) -> Self {
        let mut slots: Vec<Option<&T>> = vec![None; total];
        for (values, indices) in pieces {
            for (value, &i) in values.iter().zip(indices.iter()) {
                slots[i] = Some(value);
            }
        }
        slots.into_iter().flatten().cloned().collect()
    }
}

/// Variable-length value lists per particle, flattened.
///
/// Particle `i` owns `values[offsets[i]..offsets[i + 1]]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CompactRepr<T>")]
pub struct CompactField<T> {
    offsets: Vec<usize>,
    values: Vec<T>,
}

#[derive(Deserialize)]
struct CompactRepr<T> {
    offsets: Vec<usize>,
    values: Vec<T>,
}

impl<T> TryFrom<CompactRepr<T>> for CompactField<T> {
    type Error = MeshError;

    fn try_from(repr: CompactRepr<T>) -> Result<Self, Self::Error> {
        CompactField::new(repr.offsets, repr.values)
    }
}

impl<T> CompactField<T> {
    /// Validate that `offsets` starts at zero, never decreases and ends at `values.len()`.
    pub fn new(offsets: Vec<usize>, values: Vec<T>) -> Result<Self, MeshError> {
        let bad = |expected: usize, found: usize| MeshError::FieldLengthMismatch {
            field: "compact offsets".into(),
            expected,
            found,
        };
        match offsets.first() {
            Some(0) => {}
            Some(&first) => return Err(bad(0, first)),
            None => return Err(bad(1, 0)),
        }
        if let Some(w) = offsets.windows(2).find(|w| w[1] < w[0]) {
            return Err(bad(w[0], w[1]));
        }
        let last = offsets[offsets.len() - 1];
        if last != values.len() {
            return Err(bad(values.len(), last));
        }
        Ok(Self { offsets, values })
    }

    /// Build from one list per particle.
    pub fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = Vec<T>>,
    {
        let mut offsets = vec![0];
        let mut values = Vec::new();
        for list in lists {
            values.extend(list);
            offsets.push(values.len());
        }
        Self { offsets, values }
    }

    /// Values of particle `i`.
    pub fn get(&self, i: usize) -> &[T] {
        &self.values[self.offsets[i]..self.offsets[i + 1]]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: Clone> ParticleStorage for CompactField<T> {
    fn n_particles(&self) -> usize {
        self.offsets.len() - 1
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self::from_lists(indices.iter().map(|&i| self.get(i).to_vec()))
    }

    fn scatter(pieces: &[(&Self, &[usize])], total: usize) -> Self {
        let mut slots: Vec<Option<&[T]>> = vec![None; total];
        for (field, indices) in pieces {
            for (local, &i) in indices.iter().enumerate() {
                slots[i] = Some(field.get(local));
            }
        }
        Self::from_lists(slots.into_iter().flatten().map(<[T]>::to_vec))
    }
}

/// A named attribute field of a cloud.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ParticleField {
    Scalar(Vec<Scalar>),
    Vector(Vec<Vector>),
    SymmTensor(Vec<SymmTensor>),
    Tensor(Vec<Tensor>),
    Label(Vec<Label>),
    ScalarList(CompactField<Scalar>),
    VectorList(CompactField<Vector>),
    SymmTensorList(CompactField<SymmTensor>),
    TensorList(CompactField<Tensor>),
    LabelList(CompactField<Label>),
}

macro_rules! particle_field_ops {
    ($($variant:ident),* $(,)?) => {
        impl ParticleField {
            pub fn n_particles(&self) -> usize {
                match self {
                    $(ParticleField::$variant(f) => f.n_particles(),)*
                }
            }

            /// The entries of `indices`, in that order.
            pub fn select(&self, indices: &[usize]) -> Self {
                match self {
                    $(ParticleField::$variant(f) => ParticleField::$variant(f.select(indices)),)*
                }
            }

            /// Gather pieces of one field back into global particle order.
            ///
            /// All pieces must hold the same variant.
            pub fn scatter(
                name: &str,
                pieces: &[(&ParticleField, &[usize])],
                total: usize,
            ) -> Result<Self, MeshError> {
                let Some((first, _)) = pieces.first() else {
                    return Err(MeshError::FieldLengthMismatch {
                        field: name.to_string(),
                        expected: total,
                        found: 0,
                    });
                };
                match first {
                    $(ParticleField::$variant(_) => {
                        let mut typed = Vec::with_capacity(pieces.len());
                        for (field, indices) in pieces {
                            match field {
                                ParticleField::$variant(inner) => typed.push((inner, *indices)),
                                other => return Err(type_mismatch(name, first, other)),
                            }
                        }
                        Ok(ParticleField::$variant(ParticleStorage::scatter(&typed, total)))
                    })*
                }
            }
        }
    };
}

particle_field_ops!(
    Scalar,
    Vector,
    SymmTensor,
    Tensor,
    Label,
    ScalarList,
    VectorList,
    SymmTensorList,
    TensorList,
    LabelList,
);

impl ParticleField {
    /// On-disk type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            ParticleField::Scalar(_) => "scalar",
            ParticleField::Vector(_) => "vector",
            ParticleField::SymmTensor(_) => "symmTensor",
            ParticleField::Tensor(_) => "tensor",
            ParticleField::Label(_) => "label",
            ParticleField::ScalarList(_) => "scalarList",
            ParticleField::VectorList(_) => "vectorList",
            ParticleField::SymmTensorList(_) => "symmTensorList",
            ParticleField::TensorList(_) => "tensorList",
            ParticleField::LabelList(_) => "labelList",
        }
    }
}

fn type_mismatch(name: &str, expected: &ParticleField, found: &ParticleField) -> MeshError {
    MeshError::ValueTypeMismatch {
        field: name.to_string(),
        expected: expected.type_name().to_string(),
        found: found.type_name().to_string(),
    }
}

/// A particle cloud in storage order.
#[derive(Clone, Debug, PartialEq)]
pub struct Cloud {
    pub name: String,
    positions: Vec<Point>,
    cells: Vec<usize>,
    fields: BTreeMap<String, ParticleField>,
}

impl Cloud {
    pub fn new(
        name: impl Into<String>,
        positions: Vec<Point>,
        cells: Vec<usize>,
    ) -> Result<Self, MeshError> {
        let name = name.into();
        if cells.len() != positions.len() {
            return Err(MeshError::FieldLengthMismatch {
                field: format!("{name}.cells"),
                expected: positions.len(),
                found: cells.len(),
            });
        }
        Ok(Self {
            name,
            positions,
            cells,
            fields: BTreeMap::new(),
        })
    }

    /// Attach an attribute field; it must hold one entry per particle.
    pub fn insert_field(
        &mut self,
        name: impl Into<String>,
        field: ParticleField,
    ) -> Result<(), MeshError> {
        let name = name.into();
        if field.n_particles() != self.n_particles() {
            return Err(MeshError::FieldLengthMismatch {
                field: format!("{}.{name}", self.name),
                expected: self.n_particles(),
                found: field.n_particles(),
            });
        }
        self.fields.insert(name, field);
        Ok(())
    }

    pub fn n_particles(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    /// Cell of each particle.
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    pub fn fields(&self) -> &BTreeMap<String, ParticleField> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ParticleField> {
        self.fields.get(name)
    }
}

/// Particles grouped by global cell, each group in storage order.
#[derive(Clone, Debug)]
pub struct CellParticles {
    offsets: Vec<usize>,
    particles: Vec<usize>,
}

impl CellParticles {
    /// Group the particles of `cloud` by cell; a cell `>= n_cells` is stale.
    pub fn build(cloud: &Cloud, n_cells: usize) -> Result<Self, MeshError> {
        let mut offsets = vec![0usize; n_cells + 1];
        for (particle, &cell) in cloud.cells().iter().enumerate() {
            if cell >= n_cells {
                return Err(MeshError::StaleParticleCell {
                    particle,
                    cell,
                    n_cells,
                });
            }
            offsets[cell + 1] += 1;
        }
        for c in 0..n_cells {
            offsets[c + 1] += offsets[c];
        }
        let mut cursor = offsets.clone();
        let mut particles = vec![0usize; cloud.n_particles()];
        for (particle, &cell) in cloud.cells().iter().enumerate() {
            particles[cursor[cell]] = particle;
            cursor[cell] += 1;
        }
        Ok(Self { offsets, particles })
    }

    pub fn n_cells(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Particles in `cell`, ascending.
    pub fn in_cell(&self, cell: usize) -> &[usize] {
        &self.particles[self.offsets[cell]..self.offsets[cell + 1]]
    }

    /// Number of cells holding at least one particle.
    pub fn occupied_cells(&self) -> usize {
        self.offsets.windows(2).filter(|w| w[1] > w[0]).count()
    }
}

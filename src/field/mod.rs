//! Mesh-attached discrete fields.
//!
//! Three topological categories share one value model ([`FieldValue`]):
//! - [`VolField`]: one value per cell plus one value per boundary face, per patch;
//! - [`SurfaceField`]: one value per internal face plus per-patch boundary values;
//! - [`PointField`]: one value per mesh point.
//!
//! The category is part of the type, so a point field can never be handed
//! to a face-addressed path.

pub mod value;

pub use value::{FieldValue, Label, Scalar, SymmTensor, Tensor, ValueType, Vector};

use crate::mesh_error::{FieldCategory, MeshError};
use crate::topology::PolyMesh;
use serde::{Deserialize, Serialize};

/// Whether a surface field changes sign when its face is seen from the other side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceOrientation {
    /// Flux-like: negated on reversed faces.
    #[default]
    Oriented,
    /// Face coefficients and other sign-free quantities.
    Unoriented,
}

/// Common surface of all mesh-attached fields.
pub trait MeshField {
    const CATEGORY: FieldCategory;

    fn name(&self) -> &str;

    /// Check the field's layout against `mesh`.
    fn check_mesh(&self, mesh: &PolyMesh) -> Result<(), MeshError>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolField<T> {
    pub name: String,
    pub internal: Vec<T>,
    pub boundary: Vec<Vec<T>>,
}

impl<T: FieldValue> VolField<T> {
    pub fn new(name: impl Into<String>, internal: Vec<T>, boundary: Vec<Vec<T>>) -> Self {
        Self {
            name: name.into(),
            internal,
            boundary,
        }
    }

    /// Same value everywhere, including every boundary face.
    pub fn uniform(name: impl Into<String>, mesh: &PolyMesh, value: T) -> Self {
        let boundary = mesh
            .patches()
            .iter()
            .map(|p| vec![value.clone(); p.size])
            .collect();
        Self::new(name, vec![value; mesh.n_cells()], boundary)
    }

    /// Cell values with zero-gradient boundaries (each face takes its owner cell's value).
    pub fn from_cell_values(
        name: impl Into<String>,
        mesh: &PolyMesh,
        internal: Vec<T>,
    ) -> Result<Self, MeshError> {
        let name = name.into();
        check_len(&name, mesh.n_cells(), internal.len())?;
        let boundary = mesh
            .patches()
            .iter()
            .map(|p| {
                p.range()
                    .map(|f| internal[mesh.owner()[f]].clone())
                    .collect()
            })
            .collect();
        Ok(Self::new(name, internal, boundary))
    }
}

impl<T: FieldValue> MeshField for VolField<T> {
    const CATEGORY: FieldCategory = FieldCategory::Vol;

    fn name(&self) -> &str {
        &self.name
    }

    fn check_mesh(&self, mesh: &PolyMesh) -> Result<(), MeshError> {
        check_len(&self.name, mesh.n_cells(), self.internal.len())?;
        check_boundary(&self.name, mesh, &self.boundary)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceField<T> {
    pub name: String,
    pub orientation: FaceOrientation,
    pub internal: Vec<T>,
    pub boundary: Vec<Vec<T>>,
}

impl<T: FieldValue> SurfaceField<T> {
    pub fn new(
        name: impl Into<String>,
        orientation: FaceOrientation,
        internal: Vec<T>,
        boundary: Vec<Vec<T>>,
    ) -> Self {
        Self {
            name: name.into(),
            orientation,
            internal,
            boundary,
        }
    }

    /// Split a value per mesh face into internal and per-patch parts.
    pub fn from_face_values(
        name: impl Into<String>,
        orientation: FaceOrientation,
        mesh: &PolyMesh,
        mut values: Vec<T>,
    ) -> Result<Self, MeshError> {
        let name = name.into();
        check_len(&name, mesh.n_faces(), values.len())?;
        let boundary_values = values.split_off(mesh.n_internal_faces());
        let boundary = mesh
            .patches()
            .iter()
            .map(|p| {
                let lo = p.start - mesh.n_internal_faces();
                boundary_values[lo..lo + p.size].to_vec()
            })
            .collect();
        Ok(Self::new(name, orientation, values, boundary))
    }

    /// Value on every mesh face in face order.
    pub fn face_values(&self) -> Vec<T> {
        self.internal
            .iter()
            .chain(self.boundary.iter().flatten())
            .cloned()
            .collect()
    }

    pub fn is_oriented(&self) -> bool {
        self.orientation == FaceOrientation::Oriented
    }
}

impl<T: FieldValue> MeshField for SurfaceField<T> {
    const CATEGORY: FieldCategory = FieldCategory::Surface;

    fn name(&self) -> &str {
        &self.name
    }

    fn check_mesh(&self, mesh: &PolyMesh) -> Result<(), MeshError> {
        check_len(&self.name, mesh.n_internal_faces(), self.internal.len())?;
        check_boundary(&self.name, mesh, &self.boundary)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointField<T> {
    pub name: String,
    pub values: Vec<T>,
}

impl<T: FieldValue> PointField<T> {
    pub fn new(name: impl Into<String>, values: Vec<T>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

impl<T: FieldValue> MeshField for PointField<T> {
    const CATEGORY: FieldCategory = FieldCategory::Point;

    fn name(&self) -> &str {
        &self.name
    }

    fn check_mesh(&self, mesh: &PolyMesh) -> Result<(), MeshError> {
        check_len(&self.name, mesh.n_points(), self.values.len())
    }
}

fn check_len(field: &str, expected: usize, found: usize) -> Result<(), MeshError> {
    if expected != found {
        return Err(MeshError::FieldLengthMismatch {
            field: field.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

fn check_boundary<T>(field: &str, mesh: &PolyMesh, boundary: &[Vec<T>]) -> Result<(), MeshError> {
    check_len(field, mesh.patches().len(), boundary.len())?;
    for (patch, values) in mesh.patches().iter().zip(boundary) {
        if values.len() != patch.size {
            return Err(MeshError::FieldLengthMismatch {
                field: format!("{field}.{}", patch.name),
                expected: patch.size,
                found: values.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::hex_lattice;

    #[test]
    fn zero_gradient_boundary_copies_owner() {
        let mesh = hex_lattice(2, 1, 1).unwrap();
        let field = VolField::from_cell_values("T", &mesh, vec![10.0, 20.0]).unwrap();
        field.check_mesh(&mesh).unwrap();
        let xmax = mesh.find_patch("xmax").unwrap();
        assert_eq!(field.boundary[xmax], vec![20.0]);
        let xmin = mesh.find_patch("xmin").unwrap();
        assert_eq!(field.boundary[xmin], vec![10.0]);
    }

    #[test]
    fn surface_split_matches_face_order() {
        let mesh = hex_lattice(2, 1, 1).unwrap();
        let values: Vec<f64> = (0..mesh.n_faces()).map(|f| f as f64).collect();
        let field =
            SurfaceField::from_face_values("phi", FaceOrientation::Oriented, &mesh, values.clone())
                .unwrap();
        field.check_mesh(&mesh).unwrap();
        assert_eq!(field.internal, vec![0.0]);
        assert_eq!(field.face_values(), values);
    }

    #[test]
    fn wrong_patch_size_names_patch() {
        let mesh = hex_lattice(1, 1, 1).unwrap();
        let mut field = VolField::uniform("p", &mesh, 0.0);
        field.boundary[2].push(1.0);
        assert_eq!(
            field.check_mesh(&mesh),
            Err(MeshError::FieldLengthMismatch {
                field: "p.ymin".into(),
                expected: 1,
                found: 2
            })
        );
    }
}

//! Derived mesh data, built explicitly once and then immutable.

use crate::topology::poly_mesh::{Point, PolyMesh};

/// Cell→face lists in CSR layout.
///
/// Each cell's faces are listed in ascending face order.
#[derive(Clone, Debug)]
pub struct MeshConnectivity {
    offsets: Vec<usize>,
    faces: Vec<usize>,
}

impl MeshConnectivity {
    pub fn build(mesh: &PolyMesh) -> Self {
        let n_cells = mesh.n_cells();
        let mut counts = vec![0usize; n_cells + 1];
        for &c in mesh.owner() {
            counts[c + 1] += 1;
        }
        for &c in mesh.neighbour() {
            counts[c + 1] += 1;
        }
        for i in 0..n_cells {
            counts[i + 1] += counts[i];
        }
        let offsets = counts;

        let mut cursor = offsets.clone();
        let mut faces = vec![0usize; offsets[n_cells]];
        for (face, &c) in mesh.owner().iter().enumerate() {
            faces[cursor[c]] = face;
            cursor[c] += 1;
        }
        for (face, &c) in mesh.neighbour().iter().enumerate() {
            faces[cursor[c]] = face;
            cursor[c] += 1;
        }
        for c in 0..n_cells {
            faces[offsets[c]..offsets[c + 1]].sort_unstable();
        }
        Self { offsets, faces }
    }

    pub fn n_cells(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Faces of cell `cell`, ascending.
    pub fn cell_faces(&self, cell: usize) -> &[usize] {
        &self.faces[self.offsets[cell]..self.offsets[cell + 1]]
    }
}

/// Face and cell centres.
///
/// Face centres are point averages; cell centres are averages of their face
/// centres. Good enough for geometric decomposition and diagnostics.
#[derive(Clone, Debug)]
pub struct MeshGeometry {
    face_centres: Vec<Point>,
    cell_centres: Vec<Point>,
}

impl MeshGeometry {
    pub fn build(mesh: &PolyMesh, connectivity: &MeshConnectivity) -> Self {
        let face_centres: Vec<Point> = mesh
            .faces()
            .iter()
            .map(|face| mean(face.iter().map(|&p| mesh.points()[p])))
            .collect();
        let cell_centres = (0..mesh.n_cells())
            .map(|c| mean(connectivity.cell_faces(c).iter().map(|&f| face_centres[f])))
            .collect();
        Self {
            face_centres,
            cell_centres,
        }
    }

    pub fn face_centres(&self) -> &[Point] {
        &self.face_centres
    }

    pub fn cell_centres(&self) -> &[Point] {
        &self.cell_centres
    }
}

fn mean(points: impl Iterator<Item = Point>) -> Point {
    let mut sum = [0.0; 3];
    let mut count = 0usize;
    for p in points {
        for (s, x) in sum.iter_mut().zip(p) {
            *s += x;
        }
        count += 1;
    }
    if count > 0 {
        let inv = 1.0 / count as f64;
        for s in &mut sum {
            *s *= inv;
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::lattice::hex_lattice;
    use approx::assert_relative_eq;

    #[test]
    fn lattice_cells_have_six_faces() {
        let mesh = hex_lattice(3, 2, 2).unwrap();
        let conn = MeshConnectivity::build(&mesh);
        for c in 0..mesh.n_cells() {
            let faces = conn.cell_faces(c);
            assert_eq!(faces.len(), 6, "cell {c}");
            assert!(faces.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn lattice_cell_centres() {
        let mesh = hex_lattice(2, 1, 1).unwrap();
        let conn = MeshConnectivity::build(&mesh);
        let geom = MeshGeometry::build(&mesh, &conn);
        let c1 = geom.cell_centres()[1];
        assert_relative_eq!(c1[0], 1.5);
        assert_relative_eq!(c1[1], 0.5);
        assert_relative_eq!(c1[2], 0.5);
    }
}

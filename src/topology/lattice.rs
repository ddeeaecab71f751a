//! Structured hex lattice in [`PolyMesh`] form.

use crate::mesh_error::MeshError;
use crate::topology::poly_mesh::{BoundaryPatch, Face, PatchKind, Point, PolyMesh};

/// Build a unit-spaced `nx × ny × nz` block of hexahedra.
///
/// Cells are numbered `i + nx*(j + ny*k)`. Internal faces are ordered
/// upper-triangularly (by owner, then by neighbour), each pointing from the
/// lower to the higher cell index. Boundary faces form six patches named
/// `xmin`, `xmax`, `ymin`, `ymax`, `zmin`, `zmax` with outward normals.
pub fn hex_lattice(nx: usize, ny: usize, nz: usize) -> Result<PolyMesh, MeshError> {
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(MeshError::InvalidConfig(format!(
            "lattice dimensions must be positive, got {nx}x{ny}x{nz}"
        )));
    }
    let pid = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
    let cid = |i: usize, j: usize, k: usize| i + nx * (j + ny * k);

    let mut points: Vec<Point> = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                points.push([i as f64, j as f64, k as f64]);
            }
        }
    }

    let mut faces: Vec<Face> = Vec::new();
    let mut owner = Vec::new();
    let mut neighbour = Vec::new();

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let c = cid(i, j, k);
                if i + 1 < nx {
                    faces.push(vec![
                        pid(i + 1, j, k),
                        pid(i + 1, j + 1, k),
                        pid(i + 1, j + 1, k + 1),
                        pid(i + 1, j, k + 1),
                    ]);
                    owner.push(c);
                    neighbour.push(cid(i + 1, j, k));
                }
                if j + 1 < ny {
                    faces.push(vec![
                        pid(i, j + 1, k),
                        pid(i, j + 1, k + 1),
                        pid(i + 1, j + 1, k + 1),
                        pid(i + 1, j + 1, k),
                    ]);
                    owner.push(c);
                    neighbour.push(cid(i, j + 1, k));
                }
                if k + 1 < nz {
                    faces.push(vec![
                        pid(i, j, k + 1),
                        pid(i + 1, j, k + 1),
                        pid(i + 1, j + 1, k + 1),
                        pid(i, j + 1, k + 1),
                    ]);
                    owner.push(c);
                    neighbour.push(cid(i, j, k + 1));
                }
            }
        }
    }

    let mut patches = Vec::with_capacity(6);
    let mut add_patch = |name: &str, kind: PatchKind, new_faces: Vec<(Face, usize)>| {
        let start = faces.len();
        let size = new_faces.len();
        for (face, cell) in new_faces {
            faces.push(face);
            owner.push(cell);
        }
        patches.push(BoundaryPatch::new(name, kind, start, size));
    };

    let mut xmin = Vec::new();
    let mut xmax = Vec::new();
    for k in 0..nz {
        for j in 0..ny {
            xmin.push((
                vec![pid(0, j, k), pid(0, j, k + 1), pid(0, j + 1, k + 1), pid(0, j + 1, k)],
                cid(0, j, k),
            ));
            xmax.push((
                vec![
                    pid(nx, j, k),
                    pid(nx, j + 1, k),
                    pid(nx, j + 1, k + 1),
                    pid(nx, j, k + 1),
                ],
                cid(nx - 1, j, k),
            ));
        }
    }
    add_patch("xmin", PatchKind::Patch, xmin);
    add_patch("xmax", PatchKind::Patch, xmax);

    let mut ymin = Vec::new();
    let mut ymax = Vec::new();
    for k in 0..nz {
        for i in 0..nx {
            ymin.push((
                vec![pid(i, 0, k), pid(i + 1, 0, k), pid(i + 1, 0, k + 1), pid(i, 0, k + 1)],
                cid(i, 0, k),
            ));
            ymax.push((
                vec![
                    pid(i, ny, k),
                    pid(i, ny, k + 1),
                    pid(i + 1, ny, k + 1),
                    pid(i + 1, ny, k),
                ],
                cid(i, ny - 1, k),
            ));
        }
    }
    add_patch("ymin", PatchKind::Wall, ymin);
    add_patch("ymax", PatchKind::Wall, ymax);

    let mut zmin = Vec::new();
    let mut zmax = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            zmin.push((
                vec![pid(i, j, 0), pid(i, j + 1, 0), pid(i + 1, j + 1, 0), pid(i + 1, j, 0)],
                cid(i, j, 0),
            ));
            zmax.push((
                vec![
                    pid(i, j, nz),
                    pid(i + 1, j, nz),
                    pid(i + 1, j + 1, nz),
                    pid(i, j + 1, nz),
                ],
                cid(i, j, nz - 1),
            ));
        }
    }
    add_patch("zmin", PatchKind::Wall, zmin);
    add_patch("zmax", PatchKind::Wall, zmax);

    PolyMesh::new(points, faces, owner, neighbour, patches, nx * ny * nz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_cube_counts() {
        let mesh = hex_lattice(2, 2, 2).unwrap();
        assert_eq!(mesh.n_cells(), 8);
        assert_eq!(mesh.n_points(), 27);
        assert_eq!(mesh.n_internal_faces(), 12);
        assert_eq!(mesh.n_boundary_faces(), 24);
        assert_eq!(mesh.patches().len(), 6);
        assert!(mesh.patches().iter().all(|p| p.size == 4));
    }

    #[test]
    fn internal_faces_point_upwards() {
        let mesh = hex_lattice(3, 2, 2).unwrap();
        for (f, &n) in mesh.neighbour().iter().enumerate() {
            assert!(mesh.owner()[f] < n);
        }
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            hex_lattice(2, 0, 1),
            Err(MeshError::InvalidConfig(_))
        ));
    }
}

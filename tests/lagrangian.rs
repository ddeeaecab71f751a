mod util;

use mesh_decompose::prelude::*;
use proptest::prelude::*;

/// `n` particles scattered over `n_cells` cells in a mixed storage order.
fn cloud(n: usize, n_cells: usize) -> Cloud {
    let cells: Vec<usize> = (0..n).map(|i| (i * 7 + 3) % n_cells).collect();
    let positions = cells.iter().map(|&c| [c as f64 + 0.5, 0.5, 0.5]).collect();
    let mut cloud = Cloud::new("kinematicCloud", positions, cells.clone()).unwrap();
    cloud
        .insert_field("d", ParticleField::Scalar((0..n).map(|i| i as f64 * 1e-3).collect()))
        .unwrap();
    cloud
        .insert_field(
            "U",
            ParticleField::Vector((0..n).map(|i| [i as f64, 0.0, -1.0]).collect()),
        )
        .unwrap();
    cloud
        .insert_field(
            "collisionRecords",
            ParticleField::ScalarList(CompactField::from_lists(
                (0..n).map(|i| (0..i % 4).map(|k| k as f64).collect()),
            )),
        )
        .unwrap();
    cloud
}

fn cell_addressing(procs: &[ProcMesh]) -> Vec<&[usize]> {
    procs.iter().map(|p| p.addressing.cell()).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn clouds_round_trip_in_storage_order(
        (n, np, map) in util::lattice_and_map(),
        n_particles in 0usize..40,
    ) {
        let mesh = hex_lattice(n[0], n[1], n[2]).unwrap();
        let (own, procs) = util::split(&mesh, map, np);
        let original = cloud(n_particles, mesh.n_cells());

        let pieces = decompose_cloud(&own, &original, false).unwrap();
        prop_assert_eq!(pieces.len(), np);

        let mut all: Vec<usize> = Vec::new();
        for (p, piece) in pieces.iter().enumerate() {
            prop_assert!(piece.particle_indices.windows(2).all(|w| w[0] < w[1]));
            for (&local_cell, &i) in piece.cloud.cells().iter().zip(&piece.particle_indices) {
                prop_assert_eq!(procs[p].addressing.cell()[local_cell], original.cells()[i]);
            }
            all.extend(&piece.particle_indices);
        }
        all.sort_unstable();
        prop_assert_eq!(all, (0..n_particles).collect::<Vec<_>>());

        let wrapped: Vec<Option<ProcCloud>> = pieces.into_iter().map(Some).collect();
        let back = reconstruct_cloud("kinematicCloud", &cell_addressing(&procs), &wrapped).unwrap();
        prop_assert_eq!(back, original);
    }
}

#[test]
fn sub_lists_travel_with_their_particle() {
    let mesh = hex_lattice(4, 1, 1).unwrap();
    let (own, _) = util::split(&mesh, vec![0, 0, 1, 1], 2);
    let original = cloud(9, 4);
    let pieces = decompose_cloud(&own, &original, true).unwrap();

    let ParticleField::ScalarList(global) = original.field("collisionRecords").unwrap() else {
        panic!("wrong variant");
    };
    for piece in &pieces {
        let ParticleField::ScalarList(local) = piece.cloud.field("collisionRecords").unwrap() else {
            panic!("wrong variant");
        };
        for (l, &g) in piece.particle_indices.iter().enumerate() {
            assert_eq!(local.get(l), global.get(g));
        }
    }
}

#[test]
fn particles_in_missing_cells_are_fatal() {
    let mesh = hex_lattice(2, 1, 1).unwrap();
    let (own, _) = util::split(&mesh, vec![0, 1], 2);
    let stale = Cloud::new("c", vec![[0.0; 3]; 2], vec![1, 5]).unwrap();
    assert_eq!(
        decompose_cloud(&own, &stale, false).unwrap_err(),
        MeshError::StaleParticleCell {
            particle: 1,
            cell: 5,
            n_cells: 2
        }
    );
}

#[test]
fn duplicated_particle_indices_are_rejected() {
    let mesh = hex_lattice(2, 1, 1).unwrap();
    let (own, procs) = util::split(&mesh, vec![0, 1], 2);
    let original = cloud(4, 2);
    let mut pieces: Vec<Option<ProcCloud>> = decompose_cloud(&own, &original, false)
        .unwrap()
        .into_iter()
        .map(Some)
        .collect();
    let first = pieces[0].as_ref().unwrap().particle_indices[0];
    pieces[1].as_mut().unwrap().particle_indices[0] = first;
    assert!(matches!(
        reconstruct_cloud("c", &cell_addressing(&procs), &pieces),
        Err(MeshError::ParticleIndexConflict { .. })
    ));
}

#[test]
fn particles_group_by_cell_in_storage_order() {
    let original = cloud(10, 3);
    let groups = CellParticles::build(&original, 3).unwrap();
    assert_eq!(groups.n_cells(), 3);
    for c in 0..3 {
        let members = groups.in_cell(c);
        assert!(members.windows(2).all(|w| w[0] < w[1]));
        assert!(members.iter().all(|&i| original.cells()[i] == c));
    }
    assert_eq!(groups.occupied_cells(), 3);
}

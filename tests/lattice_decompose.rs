mod util;

use mesh_decompose::prelude::*;
use util::split;

#[test]
fn two_layers_share_a_four_face_processor_patch() {
    let mesh = hex_lattice(2, 2, 2).unwrap();
    let (_, procs) = split(&mesh, (0..8).map(|c| usize::from(c >= 4)).collect(), 2);

    for (p, q) in [(0, 1), (1, 0)] {
        let local = &procs[p].mesh;
        let name = format!("procBoundary{p}to{q}");
        let patch_id = local.find_patch(&name).unwrap();
        let patch = &local.patches()[patch_id];
        assert_eq!(patch.size, 4);
        assert_eq!(patch.kind, PatchKind::Processor { my_proc: p, neighb_proc: q });
        assert_eq!(procs[p].addressing.boundary()[patch_id], PatchAddress::Processor);

        let signs: Vec<bool> = procs[p].addressing.face()[patch.range()]
            .iter()
            .map(|f| f.is_flipped())
            .collect();
        // processor 0 holds the owners of the inter-layer faces
        assert_eq!(signs, vec![p == 1; 4]);
    }

    // both sides name the same global faces in the same order
    let faces_of = |p: usize, name: &str| {
        let local = &procs[p].mesh;
        let range = local.patches()[local.find_patch(name).unwrap()].range();
        procs[p].addressing.face()[range]
            .iter()
            .map(|f| f.index())
            .collect::<Vec<_>>()
    };
    assert_eq!(faces_of(0, "procBoundary0to1"), faces_of(1, "procBoundary1to0"));

    let values: Vec<f64> = (0..8u8).map(f64::from).collect();
    let field = VolField::from_cell_values("T", &mesh, values.clone()).unwrap();
    let pieces = util::decompose_each(&mesh, &procs, |d| d.decompose_vol(&field));
    let back = FieldReconstructor::new(&mesh, &procs, PointArbitration::LowestRank)
        .unwrap()
        .reconstruct_vol("T", &pieces)
        .unwrap();
    assert_eq!(back.internal, values);
}

#[test]
fn flipped_faces_reverse_all_but_the_first_point() {
    let mesh = hex_lattice(2, 1, 1).unwrap();
    let (_, procs) = split(&mesh, vec![1, 0], 2);
    let local = &procs[0].mesh;
    let addressing = &procs[0].addressing;
    let patch = &local.patches()[local.find_patch("procBoundary0to1").unwrap()];
    let lf = patch.start;
    let sf = addressing.face()[lf];
    assert!(sf.is_flipped());
    assert_eq!(sf.raw(), -1);

    let global: Vec<usize> = mesh.faces()[sf.index()].clone();
    let seen: Vec<usize> = local.faces()[lf].iter().map(|&p| addressing.point()[p]).collect();
    assert_eq!(seen[0], global[0]);
    let mut rest = global[1..].to_vec();
    rest.reverse();
    assert_eq!(&seen[1..], rest.as_slice());
}

#[test]
fn empty_processor_leaves_the_others_untouched() {
    let mesh = hex_lattice(2, 2, 2).unwrap();
    let map: Vec<usize> = (0..8).map(|c| c % 3).collect();
    let (_, with_three) = split(&mesh, map.clone(), 3);
    let (own, with_four) = split(&mesh, map, 4);

    assert_eq!(own.empty_procs().collect::<Vec<_>>(), vec![3]);
    assert_eq!(&with_four[..3], with_three.as_slice());

    let empty = &with_four[3].mesh;
    assert_eq!(empty.n_cells(), 0);
    assert_eq!(empty.n_internal_faces(), 0);
    assert_eq!(empty.n_faces(), 0);
    assert_eq!(empty.processor_patches().count(), 0);
    assert_eq!(empty.patches().len(), mesh.patches().len());
    assert!(empty.patches().iter().all(|p| p.size == 0));
}

#[test]
fn out_of_range_rank_is_rejected() {
    assert_eq!(
        CellOwnership::new(vec![0, 2, 1], 2).unwrap_err(),
        MeshError::ProcessorOutOfRange {
            cell: 1,
            proc: 2,
            n_procs: 2
        }
    );
}

#[test]
fn processor_patches_follow_neighbour_rank() {
    let mesh = hex_lattice(3, 1, 1).unwrap();
    let (_, procs) = split(&mesh, vec![2, 0, 1], 3);
    let names: Vec<&str> = procs[0]
        .mesh
        .processor_patches()
        .map(|i| procs[0].mesh.patches()[i].name.as_str())
        .collect();
    assert_eq!(names, vec!["procBoundary0to1", "procBoundary0to2"]);
}

#[test]
fn parallel_and_serial_decompositions_agree() {
    let mesh = hex_lattice(4, 3, 2).unwrap();
    let own = CellOwnership::new((0..24).map(|c| (c * 5) % 4).collect(), 4).unwrap();
    assert_eq!(
        decompose_mesh_with(&mesh, &own, true).unwrap(),
        decompose_mesh_with(&mesh, &own, false).unwrap()
    );
}

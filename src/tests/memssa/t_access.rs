use crate::alias::MemoryLocation;
use crate::memssa::{AccessId, LIVE_ON_ENTRY};

include!("fixtures.rs");

#[test]
fn test_defs_iter_is_uniform() {
    let s = diamond(true);
    let mssa = s.setup.build();
    let graph = mssa.graph();
    let phi = mssa.phi_of(s.merge).unwrap();
    let load = mssa.access_of(s.load).unwrap();
    let store_then = mssa.access_of(s.store_then).unwrap();
    let store_else = mssa.access_of(s.store_else).unwrap();

    // A use yields its single defining access, with no predecessor.
    let edges: Vec<(AccessId, Option<crate::ir::BlockId>)> = graph.defs(load).collect();
    assert_eq!(edges, vec![(phi, None)]);

    // A phi yields each incoming paired with its predecessor block.
    let edges: Vec<(AccessId, Option<crate::ir::BlockId>)> = graph.defs(phi).collect();
    assert_eq!(
        edges,
        vec![
            (store_then, Some(crate::ir::BlockId(1))),
            (store_else, Some(crate::ir::BlockId(2))),
        ]
    );

    // The sentinel has no defining edges.
    assert_eq!(graph.defs(LIVE_ON_ENTRY).count(), 0);
}

#[test]
fn test_upward_defs_translates_locations_through_phi() {
    let s = param_diamond();
    let mssa = s.setup.build();
    let phi = mssa.phi_of(s.merge).unwrap();

    let pairs: Vec<(AccessId, MemoryLocation)> = mssa
        .graph()
        .upward_defs(&s.setup.func, phi, MemoryLocation::new(s.vp))
        .collect();
    let locations: Vec<MemoryLocation> = pairs.iter().map(|(_, loc)| *loc).collect();
    assert_eq!(
        locations,
        vec![MemoryLocation::new(s.p), MemoryLocation::new(s.q)]
    );
}

#[test]
fn test_upward_defs_preserves_untranslatable_locations() {
    let s = diamond(true);
    let mssa = s.setup.build();
    let phi = mssa.phi_of(s.merge).unwrap();
    let load_ptr = match s.setup.func.inst(s.load).unwrap().0.kind {
        crate::ir::InstKind::Load { ptr } => ptr,
        _ => unreachable!(),
    };

    // %v0 is defined in the entry block, not a merge parameter; the
    // location passes through unchanged.
    let loc = MemoryLocation::new(load_ptr);
    for (_, edge_loc) in mssa.graph().upward_defs(&s.setup.func, phi, loc) {
        assert_eq!(edge_loc, loc);
    }
}

#[test]
fn test_user_lists_track_every_edge() {
    let s = diamond(true);
    let mssa = s.setup.build();
    let phi = mssa.phi_of(s.merge).unwrap();
    let load = mssa.access_of(s.load).unwrap();
    let store_then = mssa.access_of(s.store_then).unwrap();

    assert!(mssa.access(store_then).users().contains(&phi));
    assert!(mssa.access(phi).users().contains(&load));
    assert!(mssa
        .access(LIVE_ON_ENTRY)
        .users()
        .contains(&store_then));
}

#[test]
fn test_phi_incoming_lookups() {
    let s = diamond(true);
    let mssa = s.setup.build();
    let phi = mssa.phi_of(s.merge).unwrap();
    let store_then = mssa.access_of(s.store_then).unwrap();
    let node = mssa.access(phi);

    assert_eq!(
        node.incoming_for_block(crate::ir::BlockId(1)),
        Some(store_then)
    );
    assert_eq!(node.block_index(crate::ir::BlockId(2)), Some(1));
    assert_eq!(node.incoming_for_block(crate::ir::BlockId(0)), None);
}

#[test]
fn test_access_kind_predicates() {
    let s = straight_line();
    let mssa = s.setup.build();
    let store1 = mssa.access_of(s.store1).unwrap();
    let load1 = mssa.access_of(s.load1).unwrap();

    assert!(mssa.access(store1).is_def());
    assert!(mssa.access(load1).is_use());
    assert!(mssa.access(LIVE_ON_ENTRY).is_live_on_entry());
    assert_eq!(mssa.access(load1).inst(), Some(s.load1));
    assert_eq!(mssa.access(LIVE_ON_ENTRY).inst(), None);
    assert_eq!(mssa.access(LIVE_ON_ENTRY).block, None);
}

#[test]
#[should_panic(expected = "no version id")]
fn test_uses_have_no_version() {
    let s = straight_line();
    let mssa = s.setup.build();
    let load1 = mssa.access_of(s.load1).unwrap();
    let _ = mssa.access(load1).version();
}

#[test]
fn test_block_lists_iterate_in_order() {
    let s = straight_line();
    let mssa = s.setup.build();
    let list = mssa.block_accesses(crate::ir::BlockId(0));
    let expected: Vec<AccessId> = [s.alloc1, s.alloc2, s.store1, s.store2, s.load1, s.load2]
        .iter()
        .map(|inst| mssa.access_of(*inst).unwrap())
        .collect();
    assert_eq!(list, expected.as_slice());

    let blocks: Vec<crate::ir::BlockId> = mssa.graph().blocks_with_accesses().collect();
    assert_eq!(blocks, vec![crate::ir::BlockId(0)]);
}

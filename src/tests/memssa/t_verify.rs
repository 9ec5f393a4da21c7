use crate::memssa::{InsertionPlace, VerifyError, LIVE_ON_ENTRY};

include!("fixtures.rs");

#[test]
fn test_verify_accepts_fresh_analysis() {
    let s = diamond(true);
    let mssa = s.setup.build();
    mssa.verify().expect("expected verify to pass");
}

#[test]
fn test_verify_reports_domination_violation() {
    let s = straight_line();
    let mut mssa = s.setup.build();
    let store2 = mssa.access_of(s.store2).unwrap();
    let load1 = mssa.access_of(s.load1).unwrap();

    // Recreate the first load at the top of the block but keep its
    // defining edge pointing at a def below it.
    mssa.remove_access(load1);
    let corrupted = mssa.create_access_in_block(
        s.load1,
        store2,
        crate::ir::BlockId(0),
        InsertionPlace::Beginning,
    );

    let err = mssa.verify().expect_err("expected verify to fail");
    assert_eq!(
        err,
        VerifyError::Domination {
            access: corrupted,
            defining: store2,
        }
    );
}

#[test]
fn test_verify_reports_ordering_violation() {
    let s = straight_line();
    let mut mssa = s.setup.build();
    let load2 = mssa.access_of(s.load2).unwrap();

    // A live-on-entry defining edge keeps domination intact, but the
    // access now sits ahead of instructions that precede it.
    mssa.remove_access(load2);
    let misplaced = mssa.create_access_in_block(
        s.load2,
        LIVE_ON_ENTRY,
        crate::ir::BlockId(0),
        InsertionPlace::Beginning,
    );

    let err = mssa.verify().expect_err("expected verify to fail");
    assert!(
        matches!(err, VerifyError::Ordering { position: 0, found: Some(f), .. } if f == misplaced),
        "unexpected error {err:?}"
    );
}

#[test]
fn test_verify_reports_missing_access() {
    let c = {
        let mut b = FunctionBuilder::new("gap");
        let bb0 = b.add_block();
        let slot = b.add_local(None);
        let p = b.addr_of(bb0, slot);
        let c1 = b.const_int(bb0, 1);
        b.store(bb0, p, c1);
        b.load(bb0, p);
        let load = b.last_inst(bb0);
        b.terminate(bb0, Terminator::Return { value: None });
        (Setup::new(b.finish()), load)
    };
    let (setup, load) = c;
    let mut mssa = setup.build();

    // Dropping the access while the instruction stays in the IR is the
    // client failing to announce a mutation; verify catches it.
    let access = mssa.access_of(load).unwrap();
    mssa.remove_access(access);
    let err = mssa.verify().expect_err("expected verify to fail");
    assert!(
        matches!(err, VerifyError::MissingAccess { .. }),
        "unexpected error {err:?}"
    );
}

#[test]
fn test_verify_reports_broken_symmetry() {
    let s = diamond(true);
    let mut mssa = s.setup.build();
    let phi = mssa.phi_of(s.merge).unwrap();
    let store_then = mssa.access_of(s.store_then).unwrap();

    // Corrupt the user list directly: a user entry with no matching
    // defining edge.
    mssa.graph.add_user(phi, store_then);

    let err = mssa.verify().expect_err("expected verify to fail");
    assert!(
        matches!(err, VerifyError::MissingDefEdge { .. }),
        "unexpected error {err:?}"
    );
}

#[test]
fn test_verify_error_names_the_offending_access() {
    let s = straight_line();
    let mut mssa = s.setup.build();
    let store2 = mssa.access_of(s.store2).unwrap();
    let load1 = mssa.access_of(s.load1).unwrap();

    mssa.remove_access(load1);
    let corrupted = mssa.create_access_in_block(
        s.load1,
        store2,
        crate::ir::BlockId(0),
        InsertionPlace::Beginning,
    );

    let err = mssa.verify().expect_err("expected verify to fail");
    let message = err.to_string();
    assert!(
        message.contains(&format!("{corrupted:?}")),
        "error should name the offending access: {message}"
    );
}

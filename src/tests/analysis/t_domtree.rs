use crate::analysis::cfg::Cfg;
use crate::analysis::domtree::DomTree;
use crate::ir::{BlockId, FunctionBuilder, Terminator};

fn diamond_with_loop() -> (crate::ir::Function, [BlockId; 6]) {
    // bb0 -> (bb1, bb2) -> bb3 -> bb4 -> (bb3, bb5)
    let mut b = FunctionBuilder::new("shape");
    let bb0 = b.add_block();
    let bb1 = b.add_block();
    let bb2 = b.add_block();
    let bb3 = b.add_block();
    let bb4 = b.add_block();
    let bb5 = b.add_block();
    let cond = b.const_bool(bb0, true);
    b.terminate(
        bb0,
        Terminator::CondBr {
            cond,
            then_bb: bb1,
            then_args: vec![],
            else_bb: bb2,
            else_args: vec![],
        },
    );
    b.terminate(
        bb1,
        Terminator::Br {
            target: bb3,
            args: vec![],
        },
    );
    b.terminate(
        bb2,
        Terminator::Br {
            target: bb3,
            args: vec![],
        },
    );
    b.terminate(
        bb3,
        Terminator::Br {
            target: bb4,
            args: vec![],
        },
    );
    let back = b.const_bool(bb4, false);
    b.terminate(
        bb4,
        Terminator::CondBr {
            cond: back,
            then_bb: bb3,
            then_args: vec![],
            else_bb: bb5,
            else_args: vec![],
        },
    );
    b.terminate(bb5, Terminator::Return { value: None });
    (b.finish(), [bb0, bb1, bb2, bb3, bb4, bb5])
}

#[test]
fn test_immediate_dominators() {
    let (func, [bb0, bb1, bb2, bb3, bb4, bb5]) = diamond_with_loop();
    let dt = DomTree::new(&Cfg::new(&func));

    assert_eq!(dt.entry(), bb0);
    assert_eq!(dt.idom(bb0), None);
    assert_eq!(dt.idom(bb1), Some(bb0));
    assert_eq!(dt.idom(bb2), Some(bb0));
    // The join is dominated by the branch, not by either arm.
    assert_eq!(dt.idom(bb3), Some(bb0));
    assert_eq!(dt.idom(bb4), Some(bb3));
    assert_eq!(dt.idom(bb5), Some(bb4));
}

#[test]
fn test_dominates_is_reflexive_and_transitive() {
    let (func, [bb0, bb1, _, bb3, bb4, bb5]) = diamond_with_loop();
    let dt = DomTree::new(&Cfg::new(&func));

    assert!(dt.dominates(bb0, bb5));
    assert!(dt.dominates(bb3, bb5));
    assert!(dt.dominates(bb3, bb3));
    assert!(!dt.dominates(bb1, bb3));
    assert!(!dt.dominates(bb5, bb4));
}

#[test]
fn test_children_and_preorder() {
    let (func, [bb0, bb1, bb2, bb3, bb4, bb5]) = diamond_with_loop();
    let dt = DomTree::new(&Cfg::new(&func));

    let mut children = dt.children(bb0).to_vec();
    children.sort_by_key(|block| block.0);
    assert_eq!(children, vec![bb1, bb2, bb3]);

    let preorder = dt.preorder();
    assert_eq!(preorder.len(), 6);
    assert_eq!(preorder[0], bb0);
    let pos = |block: BlockId| preorder.iter().position(|b| *b == block).unwrap();
    // Parents come before their children.
    assert!(pos(bb3) < pos(bb4));
    assert!(pos(bb4) < pos(bb5));
}

#[test]
fn test_dominance_frontiers() {
    let (func, [bb0, bb1, bb2, bb3, bb4, _]) = diamond_with_loop();
    let dt = DomTree::new(&Cfg::new(&func));

    assert_eq!(dt.frontier(bb1), &[bb3]);
    assert_eq!(dt.frontier(bb2), &[bb3]);
    // The latch's frontier is the loop header it branches back to.
    assert_eq!(dt.frontier(bb4), &[bb3]);
    assert!(dt.frontier(bb0).is_empty());

    assert_eq!(dt.iterated_frontier(&[bb1]), vec![bb3]);
    let mut idf = dt.iterated_frontier(&[bb4]);
    idf.sort_by_key(|block| block.0);
    assert_eq!(idf, vec![bb3]);
}

#[test]
fn test_unreachable_blocks() {
    let mut b = FunctionBuilder::new("island");
    let bb0 = b.add_block();
    let bb1 = b.add_block();
    b.terminate(bb0, Terminator::Return { value: None });
    b.terminate(bb1, Terminator::Return { value: None });
    let func = b.finish();
    let dt = DomTree::new(&Cfg::new(&func));

    assert!(dt.is_reachable(bb0));
    assert!(!dt.is_reachable(bb1));
    assert_eq!(dt.idom(bb1), None);
    // Everything vacuously dominates unreachable code; the reverse does
    // not hold.
    assert!(dt.dominates(bb0, bb1));
    assert!(!dt.dominates(bb1, bb0));
    assert!(dt.iterated_frontier(&[bb1]).is_empty());
}

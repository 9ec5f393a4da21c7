use crate::analysis::cfg::Cfg;
use crate::ir::{FunctionBuilder, Terminator};

fn diamond() -> (crate::ir::Function, [crate::ir::BlockId; 4]) {
    let mut b = FunctionBuilder::new("diamond");
    let bb0 = b.add_block();
    let bb1 = b.add_block();
    let bb2 = b.add_block();
    let bb3 = b.add_block();
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
    b.terminate(bb3, Terminator::Return { value: None });
    (b.finish(), [bb0, bb1, bb2, bb3])
}

#[test]
fn test_preds_and_succs() {
    let (func, [bb0, bb1, bb2, bb3]) = diamond();
    let cfg = Cfg::new(&func);

    assert_eq!(cfg.entry(), bb0);
    assert_eq!(cfg.succs(bb0), &[bb1, bb2]);
    assert!(cfg.succs(bb3).is_empty());
    assert!(cfg.preds(bb0).is_empty());
    assert_eq!(cfg.preds(bb3), &[bb1, bb2]);
}

#[test]
fn test_rpo_starts_at_entry_and_covers_reachable() {
    let (func, [bb0, _, _, bb3]) = diamond();
    let cfg = Cfg::new(&func);

    let rpo = cfg.rpo();
    assert_eq!(rpo.len(), 4);
    assert_eq!(rpo[0], bb0);
    assert_eq!(*rpo.last().unwrap(), bb3);
}

#[test]
fn test_duplicate_edges_collapse() {
    let mut b = FunctionBuilder::new("dup");
    let bb0 = b.add_block();
    let bb1 = b.add_block();
    let cond = b.const_bool(bb0, true);
    // Both arms target the same block.
    b.terminate(
        bb0,
        Terminator::CondBr {
            cond,
            then_bb: bb1,
            then_args: vec![],
            else_bb: bb1,
            else_args: vec![],
        },
    );
    b.terminate(bb1, Terminator::Return { value: None });
    let func = b.finish();
    let cfg = Cfg::new(&func);

    assert_eq!(cfg.succs(bb0), &[bb1]);
    assert_eq!(cfg.preds(bb1), &[bb0]);
}

#[test]
fn test_unreachable_block_excluded_from_orders() {
    let mut b = FunctionBuilder::new("island");
    let bb0 = b.add_block();
    let bb1 = b.add_block();
    b.terminate(bb0, Terminator::Return { value: None });
    b.terminate(bb1, Terminator::Return { value: None });
    let func = b.finish();
    let cfg = Cfg::new(&func);

    assert_eq!(cfg.blocks().len(), 2);
    assert_eq!(cfg.rpo(), vec![bb0]);
    assert_eq!(cfg.postorder(), vec![bb0]);
    assert!(cfg.preds(bb1).is_empty());
}

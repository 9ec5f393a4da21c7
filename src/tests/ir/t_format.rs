use indoc::indoc;

use crate::ir::builder::FunctionBuilder;
use crate::ir::format::format_func;
use crate::ir::ir::{BinOp, CmpOp, Terminator};

#[test]
fn test_format_straight_line() {
    let mut b = FunctionBuilder::new("answer");
    let bb0 = b.add_block();
    let a = b.const_int(bb0, 40);
    let c = b.const_int(bb0, 2);
    let sum = b.binop(bb0, BinOp::Add, a, c);
    b.terminate(bb0, Terminator::Return { value: Some(sum) });
    let func = b.finish();

    let expected = indoc! {"
        fn answer {
          bb0():
            %v0 = const 40
            %v1 = const 2
            %v2 = add %v0, %v1

            ret %v2
        }
    "};
    assert_eq!(format_func(&func), expected);
}

#[test]
fn test_format_locals_memory_and_branches() {
    let mut b = FunctionBuilder::new("branchy");
    let bb0 = b.add_block();
    let bb1 = b.add_block();
    let bb2 = b.add_block();

    let slot = b.add_local(Some("x".to_string()));
    let p = b.addr_of(bb0, slot);
    let c1 = b.const_int(bb0, 1);
    b.store(bb0, p, c1);
    let v = b.load(bb0, p);
    let cond = b.cmp(bb0, CmpOp::Eq, v, c1);
    b.terminate(
        bb0,
        Terminator::CondBr {
            cond,
            then_bb: bb1,
            then_args: vec![],
            else_bb: bb2,
            else_args: vec![v],
        },
    );

    b.terminate(
        bb1,
        Terminator::Br {
            target: bb2,
            args: vec![c1],
        },
    );

    let out = b.add_block_param(bb2);
    b.call(bb2, "sink", vec![out]);
    b.terminate(bb2, Terminator::Return { value: None });
    let func = b.finish();

    let expected = indoc! {"
        fn branchy {
          locals:
            %l0 // x

          bb0():
            %v0 = addr_of %l0
            %v1 = const 1
            store %v0, %v1
            %v2 = load %v0
            %v3 = cmp.eq %v2, %v1

            cbr %v3, bb1(), bb2(%v2)

          bb1():
            br bb2(%v1)

          bb2(%v4):
            %v5 = call sink(%v4)

            ret
        }
    "};
    assert_eq!(format_func(&func), expected);
}

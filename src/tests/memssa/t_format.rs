use indoc::indoc;

include!("fixtures.rs");

#[test]
fn test_print_reflects_mutations() {
    let c = {
        let mut b = FunctionBuilder::new("mutate");
        let bb0 = b.add_block();
        let slot = b.add_local(Some("p".to_string()));
        let p = b.addr_of(bb0, slot);
        let c1 = b.const_int(bb0, 1);
        b.store(bb0, p, c1);
        let store = b.last_inst(bb0);
        b.load(bb0, p);
        let load = b.last_inst(bb0);
        b.terminate(bb0, Terminator::Return { value: None });
        (Setup::new(b.finish()), store, load)
    };
    let (setup, store, load) = c;
    let mut mssa = setup.build();

    let expected = indoc! {"
        fn mutate {
          bb0():
            %v0 = addr_of %l0
            %v1 = const 1
            ; 1 = MemoryDef(liveOnEntry)
            store %v0, %v1
            ; MemoryUse(1)
            %v2 = load %v0

            ret
        }
    "};
    assert_eq!(mssa.print(), expected);

    // A removed access disappears from the annotations; the store's id
    // is untouched.
    let load_access = mssa.access_of(load).unwrap();
    mssa.remove_access(load_access);
    let expected = indoc! {"
        fn mutate {
          bb0():
            %v0 = addr_of %l0
            %v1 = const 1
            ; 1 = MemoryDef(liveOnEntry)
            store %v0, %v1
            %v2 = load %v0

            ret
        }
    "};
    assert_eq!(mssa.print(), expected);
    assert!(mssa.access_of(store).is_some());
}

#[test]
fn test_print_block_params_and_empty_blocks() {
    let s = param_diamond();
    let mssa = s.setup.build();
    let text = mssa.print();
    // Merge block renders its parameter and its phi annotation.
    assert!(text.contains("bb3(%v0):"));
    assert!(text.contains("= MemoryPhi({bb1, 1}, {bb2, 2})"));
    assert!(text.contains("; MemoryUse("));
}

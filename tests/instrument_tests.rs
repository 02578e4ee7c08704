//! Integration tests for instrumentation synthesis.
//!
//! Applies the edits to TCF functions through `TestCfgBuilder` and runs the
//! instrumented result with the scripted interpreter, checking emitted path
//! identifiers, register reset behavior and that the instrumentation leaves
//! the observable block trace unchanged.

use ball_larus::artifact::{parse_artifact, write_artifact};
use ball_larus::core::{CfgAdaptor, Graph};
use ball_larus::instrument::instrument_function;
use ball_larus::regen::PathRegen;
use ball_larus::test_ir::{execute_function, FuncRef, Inst, TestCfg, TestCfgBuilder};
use std::fs;

fn load_demo(name: &str) -> TestCfg {
    let path = format!("demos/{name}.tcf");
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {path}: {e}"));
    TestCfg::parse(&contents).unwrap_or_else(|e| panic!("Failed to parse {path}: {e}"))
}

/// Instrument one function of a TCF module and hand back the edited module.
fn instrument(cfg: TestCfg, func: u32, is_main: bool) -> TestCfg {
    let mut builder = TestCfgBuilder::new(cfg);
    assert!(builder.switch_func(FuncRef(func)));
    let graph = Graph::build(&builder).expect("graph should build");
    instrument_function(&graph, &mut builder, is_main);
    builder.into_cfg()
}

#[test]
fn straight_line_gets_no_splitters() {
    let cfg = instrument(
        TestCfg::parse("f() {\na:\n    br ^b\nb:\n    br ^c\nc:\n    ret\n}").unwrap(),
        0,
        false,
    );
    let func = &cfg.functions[0];
    assert!(func.blocks.iter().all(|block| !block.synthetic));
    assert_eq!(func.blocks[0].insts[0], Inst::PathAlloc);
    // exactly one emission, at the exit
    let outcome = execute_function(func, &[]).unwrap();
    assert_eq!(outcome.emits, vec![0]);
    assert_eq!(outcome.visited, vec![0, 1, 2]);
    assert!(!outcome.flushed);
}

#[test]
fn diamond_splits_the_counted_edge() {
    let cfg = instrument(load_demo("diamond"), 0, false);
    let func = &cfg.functions[0];
    let splitters: Vec<usize> = (0..func.blocks.len())
        .filter(|&i| func.blocks[i].synthetic)
        .collect();
    assert_eq!(splitters.len(), 1);
    assert_eq!(func.blocks[splitters[0]].name, "increment");

    // the then-branch is the zero path, the else-branch passes the splitter
    let then_run = execute_function(func, &[true]).unwrap();
    assert_eq!(then_run.emits, vec![0]);
    let else_run = execute_function(func, &[false]).unwrap();
    assert_eq!(else_run.emits, vec![1]);
}

#[test]
fn splitting_a_critical_edge_rewrites_phi_incomings() {
    // a -> m is a critical edge carrying increment 1; splitting it must
    // repoint m's phi from a to the inserted block, keeping the value
    let cfg = instrument(
        TestCfg::parse(
            "f() {\n\
             a:\n    condbr %x, ^b, ^m\n\
             b:\n    %q = add %x, 1\n    br ^m\n\
             m:\n    %v = phi [%x, ^a], [%q, ^b]\n    ret\n\
             }",
        )
        .unwrap(),
        0,
        false,
    );
    let func = &cfg.functions[0];
    let splitter = (0..func.blocks.len())
        .find(|&i| func.blocks[i].synthetic)
        .expect("one splitter") as u32;
    let phi = func.blocks[2]
        .insts
        .iter()
        .find_map(|inst| match inst {
            Inst::Phi { incomings, .. } => Some(incomings),
            _ => None,
        })
        .expect("phi in merge block");
    assert!(phi.contains(&("x".to_string(), splitter)));
    assert!(phi.contains(&("q".to_string(), 1)));

    // the rewired function still runs, and the split edge reports id 1
    assert_eq!(execute_function(func, &[false]).unwrap().emits, vec![1]);
    assert_eq!(execute_function(func, &[true]).unwrap().emits, vec![0]);
}

#[test]
fn loop_emits_once_per_iteration() {
    let cfg = instrument(load_demo("count_loop"), 0, false);
    let func = &cfg.functions[0];

    // two iterations, then fall out of the loop
    let outcome = execute_function(func, &[true, true, false]).unwrap();
    assert_eq!(outcome.emits, vec![0, 2, 3]);
    // counter conservation: one emission per back-edge firing plus the exit
    let back_edge_firings = 2;
    assert_eq!(outcome.emits.len(), back_edge_firings + 1);

    // no iterations at all
    let outcome = execute_function(func, &[false]).unwrap();
    assert_eq!(outcome.emits, vec![1]);
}

#[test]
fn emitted_ids_decode_to_the_executed_segments() {
    let mut builder = TestCfgBuilder::new(load_demo("count_loop"));
    assert!(builder.switch_func(FuncRef(0)));
    let graph = Graph::build(&builder).unwrap();

    let mut serialized = Vec::new();
    write_artifact(&mut serialized, &graph, &builder).unwrap();
    let artifact = parse_artifact(std::str::from_utf8(&serialized).unwrap()).unwrap();
    let regen = PathRegen::new(&artifact);

    instrument_function(&graph, &mut builder, false);
    let cfg = builder.into_cfg();
    let outcome = execute_function(&cfg.functions[0], &[true, true, false]).unwrap();

    // each emitted id regenerates to the block segment that produced it
    assert_eq!(outcome.emits, vec![0, 2, 3]);
    assert_eq!(regen.regenerate(0).unwrap(), vec![0, 1, 2]);
    assert_eq!(regen.regenerate(2).unwrap(), vec![1, 2]);
    assert_eq!(regen.regenerate(3).unwrap(), vec![1, 3]);
}

#[test]
fn instrumentation_preserves_the_block_trace() {
    let scripts: [&[bool]; 3] = [
        &[false; 6],
        &[true, true, true, true, true, false, false, true],
        &[false, true, true, false, false, true, false, false, true, false],
    ];
    for script in scripts {
        let plain = load_demo("process_data");
        let reference = execute_function(&plain.functions[0], script).unwrap();
        assert!(reference.emits.is_empty());

        let cfg = instrument(plain, 0, false);
        let outcome = execute_function(&cfg.functions[0], script).unwrap();
        assert_eq!(outcome.visited, reference.visited, "script {script:?}");
        assert!(!outcome.emits.is_empty());
    }
}

#[test]
fn entry_function_gets_the_flush() {
    let cfg = instrument(load_demo("count_loop"), 1, true);
    let main = &cfg.functions[1];
    let outcome = execute_function(main, &[]).unwrap();
    assert_eq!(outcome.emits, vec![0]);
    assert!(outcome.flushed);

    let cfg = instrument(load_demo("count_loop"), 1, false);
    let outcome = execute_function(&cfg.functions[1], &[]).unwrap();
    assert!(!outcome.flushed);
}

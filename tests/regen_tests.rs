//! End-to-end decoder tests: encoder pass -> artifacts -> simulated run ->
//! profile -> regen -> CSV.

use ball_larus::core::RegenError;
use ball_larus::pass::{BallLarusPass, PassConfig};
use ball_larus::regen::{self, RegenConfig};
use ball_larus::test_ir::{execute_function, TestCfg, TestCfgBuilder};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn load_demo(name: &str) -> TestCfg {
    let path = format!("demos/{name}.tcf");
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {path}: {e}"));
    TestCfg::parse(&contents).unwrap_or_else(|e| panic!("Failed to parse {path}: {e}"))
}

/// Run the encoder pass over a module, writing artifacts into `dir`, and
/// return the instrumented module.
fn run_pass(cfg: TestCfg, dir: &Path) -> TestCfg {
    let mut builder = TestCfgBuilder::new(cfg);
    let pass = BallLarusPass::new(PassConfig {
        artifact_dir: dir.to_path_buf(),
        entry_function: "main".to_string(),
    });
    pass.run(&mut builder);
    builder.into_cfg()
}

/// Render a profile the way the runtime's flush does.
fn write_profile(dir: &Path, sections: &[(&str, &BTreeMap<u64, u64>)]) {
    let mut text = String::new();
    for (function, counts) in sections {
        text.push_str(&format!("Function: {function}\n"));
        for (path_id, count) in counts.iter() {
            text.push_str(&format!("{path_id}: {count}\n"));
        }
        text.push('\n');
    }
    fs::write(dir.join("profile.txt"), text).unwrap();
}

#[test]
fn full_pipeline_produces_expected_csv() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = run_pass(load_demo("count_loop"), dir.path());
    assert!(dir.path().join("count_up.txt").exists());
    assert!(dir.path().join("main.txt").exists());

    // simulate two runs of count_up: one loop iteration, then none
    let mut counts: BTreeMap<u64, u64> = BTreeMap::new();
    for script in [&[true, false][..], &[false][..]] {
        let outcome = execute_function(&cfg.functions[0], script).unwrap();
        for id in outcome.emits {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    assert_eq!(counts, BTreeMap::from([(0, 1), (1, 1), (3, 1)]));

    let main_counts = BTreeMap::from([(0u64, 2u64)]);
    write_profile(
        dir.path(),
        &[("count_up", &counts), ("main", &main_counts)],
    );

    let summary = regen::run(dir.path(), &RegenConfig::default()).unwrap();
    assert_eq!(summary.functions_processed, 2);
    assert_eq!(summary.functions_failed, 0);

    let csv = fs::read_to_string(dir.path().join("count_up.csv")).unwrap();
    // three observed records plus the one unobserved path (id 2) sampled cold
    assert_eq!(csv.matches("\",").count(), 4);
    assert!(csv.contains("\",0\n"));
    // the header block's text shows up inside quoted records
    assert!(csv.contains("%i = phi [%limit, ^entry], [%next, ^body]"));

    let main_csv = fs::read_to_string(dir.path().join("main.csv")).unwrap();
    assert_eq!(main_csv, "\"%x = call count_up\nret\",2\n");
}

#[test]
fn missing_artifact_skips_only_that_function() {
    let dir = tempfile::tempdir().unwrap();
    run_pass(load_demo("diamond"), dir.path());

    let observed = BTreeMap::from([(0u64, 1u64)]);
    write_profile(dir.path(), &[("ghost", &observed), ("classify", &observed)]);

    let summary = regen::run(dir.path(), &RegenConfig::default()).unwrap();
    assert_eq!(summary.functions_failed, 1);
    assert_eq!(summary.functions_processed, 1);
    assert!(dir.path().join("classify.csv").exists());
    assert!(!dir.path().join("ghost.csv").exists());
}

#[test]
fn missing_profile_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    match regen::run(dir.path(), &RegenConfig::default()) {
        Err(RegenError::ProfileRead { .. }) => {}
        other => panic!("expected ProfileRead error, got {other:?}"),
    }
}

#[test]
fn unwritable_artifact_dir_leaves_function_uninstrumented() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let cfg = run_pass(load_demo("diamond"), &missing);
    // artifact write failed, so no edits were applied
    assert!(cfg.functions[0].blocks.iter().all(|b| !b.synthetic));
    let outcome = execute_function(&cfg.functions[0], &[true]).unwrap();
    assert!(outcome.emits.is_empty());
}

#[test]
fn malformed_cfg_leaves_function_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = TestCfg::parse(
        "orphaned() {\n\
         a:\n    br ^c\n\
         b:\n    br ^c\n\
         c:\n    ret\n\
         }",
    )
    .unwrap();
    let before = cfg.clone();
    let mut builder = TestCfgBuilder::new(cfg);
    let pass = BallLarusPass::new(PassConfig {
        artifact_dir: dir.path().to_path_buf(),
        entry_function: "main".to_string(),
    });
    pass.run(&mut builder);
    assert_eq!(builder.cfg(), &before);
    // the graph never built, so no artifact was written either
    assert!(!dir.path().join("orphaned.txt").exists());
}

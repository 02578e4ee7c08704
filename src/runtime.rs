//! Profiling runtime linked into instrumented programs.
//!
//! Instrumented code calls [`emit_path`] every time a path terminates (at the
//! function exit or when a back-edge fires) and [`flush_results`] once, when
//! the program entry returns. Counters live in a concurrent map so emissions
//! from any thread are never lost; the flush serializes them to
//! [`PROFILE_FILE`] in the working directory:
//!
//! ```text
//! Function: <name>
//! <path_id>: <count>
//!
//! Function: <name>
//! ...
//! ```

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::ffi::CStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::os::raw::c_char;
use std::sync::OnceLock;

/// Output file written by [`flush_results`].
pub const PROFILE_FILE: &str = "profile.txt";

static COUNTS: OnceLock<DashMap<(String, u64), u64>> = OnceLock::new();

fn counts() -> &'static DashMap<(String, u64), u64> {
    COUNTS.get_or_init(DashMap::new)
}

/// Count one execution of `(function, path_id)`.
pub fn record_path(function: &str, path_id: u64) {
    counts()
        .entry((function.to_string(), path_id))
        .and_modify(|count| *count += 1)
        .or_insert(1);
}

/// Serialize all counters, grouped by function, both levels sorted so output
/// is reproducible across runs.
pub fn write_profile<W: Write>(w: &mut W) -> std::io::Result<()> {
    let mut grouped: BTreeMap<String, BTreeMap<u64, u64>> = BTreeMap::new();
    for entry in counts().iter() {
        let (function, path_id) = entry.key();
        grouped
            .entry(function.clone())
            .or_default()
            .insert(*path_id, *entry.value());
    }
    for (function, paths) in grouped {
        writeln!(w, "Function: {function}")?;
        for (path_id, count) in paths {
            writeln!(w, "{path_id}: {count}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Runtime entry point: increment the counter for `(function_name, path_id)`.
///
/// Safe to call concurrently from any number of threads.
///
/// # Safety
///
/// `function_name` must be null or a valid nul-terminated string.
#[no_mangle]
pub unsafe extern "C" fn emit_path(function_name: *const c_char, path_id: u64) {
    if function_name.is_null() {
        return;
    }
    let name = CStr::from_ptr(function_name).to_string_lossy();
    record_path(&name, path_id);
}

/// Runtime entry point: write all counters to [`PROFILE_FILE`].
///
/// Called once, from the thread returning from the program entry. A write
/// failure is reported on standard error and the results are discarded.
#[no_mangle]
pub extern "C" fn flush_results() {
    let written = File::create(PROFILE_FILE).and_then(|file| {
        let mut w = BufWriter::new(file);
        write_profile(&mut w)?;
        w.flush()
    });
    if let Err(err) = written {
        eprintln!("ball-larus runtime: could not write {PROFILE_FILE}: {err}");
    }
}

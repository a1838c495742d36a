//! The embedding API surface (§6): the minimum set of free functions an
//! embedder needs to create an interpreter, feed it script text, and
//! move values in and out, named the way the spec's C-flavored surface
//! names them rather than Rust method-call style, so a reader coming
//! from the spec's vocabulary finds a direct match. Everything here is a
//! thin wrapper over [`crate::interp::Interp`] and [`crate::obj::Obj`]
//! methods that already do the real work.

use crate::error::{InterpError, Result, Signal};
use crate::interp::{CallFrame, Interp, InterpOptions};
use crate::obj::dict::Dict;
use crate::obj::Obj;
use std::any::Any;

/// `create_interp` (§6): a fresh interpreter with the standard command
/// set installed.
pub fn create_interp() -> Interp {
    crate::interp::new_standard_interp(InterpOptions::default())
}

/// `free_interp` (§6): releases the interpreter. `Interp`'s fields are
/// all ordinary owned Rust data (no foreign handles to close), so this
/// is plain `drop` — kept as a named function for embedders translating
/// against the spec's explicit create/free pairing.
pub fn free_interp(interp: Interp) {
    drop(interp);
}

/// `eval` (§6): evaluate source text in the interpreter's current frame,
/// returning the eventual result value or the uncaught error/signal.
pub fn eval(interp: &mut Interp, src: &str) -> std::result::Result<Obj, Signal> {
    interp.eval_str(src)
}

/// `eval_file` (§6): read and evaluate a script file.
pub fn eval_file(interp: &mut Interp, path: &str) -> Result<std::result::Result<Obj, Signal>> {
    let text = std::fs::read_to_string(path).map_err(|e| InterpError::ApiMisuse(format!("can't read \"{}\": {}", path, e)))?;
    Ok(interp.eval_str(&text))
}

/// `eval_list` (§6): dispatch a pre-built argv directly, bypassing word
/// interpolation entirely — the evaluator's documented fast path for a
/// value that is already list-typed (§4.7 "if that value is a list, it
/// dispatches directly element-by-element").
pub fn eval_list(interp: &mut Interp, list_value: &Obj) -> std::result::Result<Obj, Signal> {
    interp.eval_list_fast_path(list_value)
}

// ---- value constructors ----

pub fn new_empty() -> Obj {
    Obj::empty()
}

pub fn new_string(s: &str) -> Obj {
    Obj::from_string(s)
}

pub fn new_int(n: i64) -> Obj {
    Obj::from_int(n)
}

pub fn new_double(n: f64) -> Obj {
    Obj::from_double(n)
}

pub fn new_list(items: Vec<Obj>) -> Obj {
    Obj::from_list(items)
}

pub fn new_dict() -> Obj {
    Obj::from_dict(Dict::new())
}

/// `formatted` (§6 "formatted (printf-like)"): builds a value from a
/// pre-formatted string, the embedding-API equivalent of `Jim_Sprintf`.
/// Actual `%`-directive interpretation is the embedder's job (this
/// crate's non-goals exclude a printf engine); this just wraps the
/// caller-supplied already-formatted text as a value.
pub fn new_formatted(s: String) -> Obj {
    Obj::from_string(s)
}

// ---- value accessors ----

pub fn get_string(value: &Obj) -> String {
    value.to_str().into_owned()
}

pub fn get_int(value: &Obj) -> Option<i64> {
    value.as_int()
}

pub fn get_double(value: &Obj) -> Option<f64> {
    value.as_double()
}

pub fn get_bool_from_expr(value: &Obj) -> Option<bool> {
    value.as_bool_expr()
}

pub fn list_length(value: &Obj) -> usize {
    value.list_len()
}

pub fn list_index(value: &Obj, index: usize) -> Option<Obj> {
    value.as_list().get(index).cloned()
}

pub fn list_append(value: &Obj, items: Vec<Obj>) {
    value.list_append_inplace(items);
}

pub fn dict_get(value: &Obj, key: &Obj) -> Option<Obj> {
    value.dict_get(key)
}

pub fn dict_set(value: &Obj, key: Obj, val: Obj) {
    value.dict_set_inplace(key, val);
}

pub fn dict_pairs(value: &Obj) -> Vec<(Obj, Obj)> {
    value.as_dict().pairs().map(|(k, v)| (k.clone(), v.clone())).collect()
}

// ---- variables ----

/// Variable ops scoped to the interpreter's current frame.
pub fn set_var(interp: &mut Interp, name: &str, value: Obj) -> Result<()> {
    let frame = interp.current_frame();
    interp.set_var(&frame, name, value)
}

pub fn get_var(interp: &Interp, name: &str) -> Result<Obj> {
    let frame = interp.current_frame();
    interp.get_var(&frame, name)
}

pub fn unset_var(interp: &mut Interp, name: &str) -> Result<()> {
    let frame = interp.current_frame();
    interp.unset_var(&frame, name)
}

/// Variable ops scoped to the top (global) frame, regardless of where
/// evaluation is currently nested (§4.6 "a name prefixed with `::`
/// resolves in the top frame").
pub fn set_global_var(interp: &mut Interp, name: &str, value: Obj) -> Result<()> {
    let frame = interp.global_frame();
    interp.set_var(&frame, name, value)
}

pub fn get_global_var(interp: &Interp, name: &str) -> Result<Obj> {
    let frame = interp.global_frame();
    interp.get_var(&frame, name)
}

pub fn link_var(interp: &mut Interp, local_name: &str, target_frame: &CallFrame, target_name: &str) -> Result<()> {
    let frame = interp.current_frame();
    interp.link_var(&frame, local_name, target_frame, target_name)
}

// ---- commands ----

pub fn create_command(interp: &mut Interp, name: &str, f: impl crate::interp::NativeCommand + 'static) {
    interp.create_command(name.to_string(), f);
}

pub fn delete_command(interp: &mut Interp, name: &str) -> bool {
    interp.delete_command(name)
}

pub fn rename_command(interp: &mut Interp, old: &str, new: &str) -> Result<()> {
    interp.rename_command(old, new)
}

pub fn get_command(interp: &Interp, name: &str) -> bool {
    interp.get_command(name).is_some()
}

// ---- result ----

pub fn set_result(interp: &mut Interp, value: Obj) {
    interp.set_result(value);
}

pub fn clear_result(interp: &mut Interp) {
    interp.clear_result();
}

pub fn get_result(interp: &Interp) -> Obj {
    interp.result()
}

pub fn set_result_formatted(interp: &mut Interp, s: String) {
    interp.set_result(Obj::from_string(s));
}

// ---- reference collection ----

/// `collect` (§4.9): force an immediate mark-sweep pass, invoking any
/// finalizers of now-dead references.
pub fn collect(interp: &mut Interp) -> usize {
    let frames = interp.frames_snapshot();
    let roots = vec![interp.result(), interp.error_code()];
    let finalized = interp.refs.collect(&frames, &roots);
    let count = finalized.len();
    crate::commands::run_finalizers(interp, finalized);
    count
}

/// `collect_if_needed` (§4.9 pacing): only collects if the configured
/// id/time thresholds have elapsed.
pub fn collect_if_needed(interp: &mut Interp) -> usize {
    if interp.refs.should_collect(interp.limits.gc_interval_ids, interp.limits.gc_interval_secs) {
        collect(interp)
    } else {
        0
    }
}

// ---- association store ----

/// Per-interpreter key/value store for extension private data (§6).
pub fn set_assoc_data(interp: &mut Interp, key: &str, value: Box<dyn Any>) {
    interp.set_assoc_data(key, value);
}

pub fn get_assoc_data<'a>(interp: &'a Interp, key: &str) -> Option<&'a (dyn Any)> {
    interp.get_assoc_data(key)
}

pub fn delete_assoc_data(interp: &mut Interp, key: &str) -> bool {
    interp.delete_assoc_data(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_simple_expr_scenario() {
        let mut interp = create_interp();
        eval(&mut interp, "set x 5").unwrap();
        let result = eval(&mut interp, "expr {$x * 2 + 3}").unwrap();
        assert_eq!(get_int(&result), Some(13));
    }

    #[test]
    fn variable_roundtrip_through_api() {
        let mut interp = create_interp();
        set_var(&mut interp, "greeting", new_string("hi")).unwrap();
        assert_eq!(get_string(&get_var(&interp, "greeting").unwrap()), "hi");
    }
}

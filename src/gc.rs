//! Reference/finalizer garbage collection (§4.9): opaque handles of the
//! form `<reference.<TAG>.<20-digit-id>>`, each carrying an arbitrary
//! value and an optional finalizer command.
//!
//! The reference C implementation maintains a separate doubly-linked
//! "live object" list that the collector walks. This crate doesn't: an
//! `Obj` already keeps itself alive via `Rc` for as long as anything can
//! reach it, so the collector's mark phase just walks the actual
//! reachable structures (the frame stack, plus whatever extra roots the
//! caller passes) looking for `Reference` values, instead of consulting
//! a shadow registry that could in principle fall out of sync with the
//! real graph.

use crate::interp::CallFrame;
use crate::obj::Obj;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Instant;

struct RefEntry {
    value: Obj,
    finalizer: Option<Obj>,
    tag: Rc<str>,
}

pub struct RefTable {
    entries: HashMap<u64, RefEntry>,
    next_id: u64,
    last_collect_id: i64,
    last_collect_time: Instant,
    collecting: bool,
}

/// Pad or truncate a tag to exactly 7 bytes (§4.9: "a fixed 7-byte
/// label... padded with `_`"), so every handle has the constant 42-byte
/// width §6/§8 require.
fn pad_tag(tag: &str) -> String {
    let mut t: String = tag.chars().take(7).collect();
    while t.len() < 7 {
        t.push('_');
    }
    t
}

fn format_handle(tag: &str, id: u64) -> String {
    format!("<reference.<{}>.{:020}>", tag, id)
}

/// Parse a `<reference.<TAG>.<20-digit-id>>` handle back into its id,
/// independent of the cached `Rep::Reference` fast path (used when a
/// handle arrives as a plain string, e.g. read back from a variable that
/// shimmered).
pub fn parse_handle(s: &str) -> Option<u64> {
    let s = s.strip_prefix("<reference.<")?;
    let tag_end = s.find('>')?;
    let rest = s[tag_end + 1..].strip_prefix('.')?;
    let digits = rest.strip_suffix('>')?;
    digits.parse().ok()
}

impl RefTable {
    pub fn new() -> Self {
        RefTable { entries: HashMap::new(), next_id: 1, last_collect_id: -1, last_collect_time: Instant::now(), collecting: false }
    }

    pub fn create(&mut self, value: Obj, tag: &str) -> Obj {
        let id = self.next_id;
        self.next_id += 1;
        let padded = pad_tag(tag);
        let handle = format_handle(&padded, id);
        self.entries.insert(id, RefEntry { value, finalizer: None, tag: Rc::from(padded.as_str()) });
        Obj::from_reference_id(id, handle)
    }

    fn resolve_id(&self, handle: &Obj) -> Option<u64> {
        handle.as_reference_id().or_else(|| parse_handle(&handle.to_str()))
    }

    pub fn get(&self, handle: &Obj) -> Option<Obj> {
        let id = self.resolve_id(handle)?;
        self.entries.get(&id).map(|e| e.value.clone())
    }

    pub fn set(&mut self, handle: &Obj, value: Obj) -> Option<()> {
        let id = self.resolve_id(handle)?;
        self.entries.get_mut(&id)?.value = value;
        Some(())
    }

    pub fn tag(&self, handle: &Obj) -> Option<Rc<str>> {
        let id = self.resolve_id(handle)?;
        self.entries.get(&id).map(|e| e.tag.clone())
    }

    pub fn set_finalizer(&mut self, handle: &Obj, finalizer: Option<Obj>) -> Option<()> {
        let id = self.resolve_id(handle)?;
        self.entries.get_mut(&id)?.finalizer = finalizer;
        Some(())
    }

    pub fn get_finalizer(&self, handle: &Obj) -> Option<Obj> {
        let id = self.resolve_id(handle)?;
        self.entries.get(&id)?.finalizer.clone()
    }

    pub fn should_collect(&self, gc_interval_ids: u64, gc_interval_secs: u64) -> bool {
        if self.collecting {
            return false;
        }
        let since_last_id = self.next_id as i64 - self.last_collect_id.max(0);
        since_last_id as u64 > gc_interval_ids || self.last_collect_time.elapsed().as_secs() > gc_interval_secs
    }

    /// Mark-sweep over `frames` plus any extra root values (the current
    /// result, `errorCode`, ...). Returns the `(handle, finalizer)` pairs
    /// of everything just collected, for the caller to invoke — running
    /// a finalizer means re-entering the evaluator, which this module
    /// has no access to.
    pub fn collect(&mut self, frames: &[CallFrame], extra_roots: &[Obj]) -> Vec<(Obj, Obj)> {
        let _span = tracing::debug_span!("gc_collect", live_before = self.entries.len()).entered();
        if self.collecting {
            return Vec::new();
        }
        self.collecting = true;
        let mut live: HashSet<u64> = HashSet::new();
        for frame in frames {
            for v in frame.borrow().vars.values() {
                mark_var(v, &mut live);
            }
        }
        for r in extra_roots {
            mark_obj(r, &mut live);
        }
        // An entry's own stored value can itself reference other handles.
        // Transitive closure: repeat until no new ids are discovered.
        loop {
            let mut grew = false;
            let snapshot: Vec<u64> = live.iter().copied().collect();
            for id in snapshot {
                if let Some(entry) = self.entries.get(&id) {
                    let before = live.len();
                    mark_obj(&entry.value, &mut live);
                    if live.len() != before {
                        grew = true;
                    }
                }
            }
            if !grew {
                break;
            }
        }
        let dead: Vec<u64> = self.entries.keys().copied().filter(|id| !live.contains(id)).collect();
        let mut finalized = Vec::new();
        for id in dead {
            if let Some(entry) = self.entries.remove(&id) {
                let handle = Obj::from_reference_id(id, format_handle(&entry.tag, id));
                if let Some(fin) = entry.finalizer {
                    finalized.push((handle, fin));
                }
            }
        }
        self.last_collect_id = self.next_id as i64;
        self.last_collect_time = Instant::now();
        self.collecting = false;
        tracing::trace!(collected = finalized.len(), live_after = self.entries.len(), "gc pass complete");
        finalized
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn mark_var(var: &crate::interp::Var, live: &mut HashSet<u64>) {
    match var {
        crate::interp::Var::Scalar(o) => mark_obj(o, live),
        crate::interp::Var::Array(map) => {
            for v in map.values() {
                mark_obj(v, live);
            }
        }
        crate::interp::Var::Link { .. } => {}
    }
}

fn mark_obj(obj: &Obj, live: &mut HashSet<u64>) {
    match obj.rep_kind() {
        "reference" => {
            if let Some(id) = obj.as_reference_id() {
                live.insert(id);
            }
        }
        "list" => {
            for item in obj.as_list() {
                mark_obj(&item, live);
            }
        }
        "dict" => {
            for (_, v) in obj.as_dict().pairs() {
                mark_obj(v, live);
            }
        }
        // A handle is just opaque text to user code (§6): it can reach
        // us embedded in a plain string rep (interpolated into a larger
        // value, stored after a `string map`, etc.) with no `Reference`
        // internal rep of its own. Scan every other value's string form
        // for handle prefixes rather than assuming only a dedicated
        // `Reference`/`List`/`Dict` rep can carry one.
        _ => scan_string_for_handles(&obj.to_str(), live),
    }
}

/// Scan arbitrary text for embedded `<reference.<TAG>.<20-digit-id>>`
/// handles, unlike [`parse_handle`] which requires the whole input to
/// be exactly one handle — a handle found here may be surrounded by
/// other text (interpolated into a larger string, concatenated, etc).
fn scan_string_for_handles(s: &str, live: &mut HashSet<u64>) {
    const PREFIX: &str = "<reference.<";
    let mut rest = s;
    while let Some(start) = rest.find(PREFIX) {
        let after_prefix = &rest[start + PREFIX.len()..];
        if let Some(tag_end) = after_prefix.find('>') {
            let after_tag = &after_prefix[tag_end + 1..];
            if let Some(after_dot) = after_tag.strip_prefix('.') {
                if let Some(digits_end) = after_dot.find('>') {
                    let digits = &after_dot[..digits_end];
                    if digits.len() == 20 && digits.bytes().all(|b| b.is_ascii_digit()) {
                        if let Ok(id) = digits.parse::<u64>() {
                            live.insert(id);
                        }
                    }
                }
            }
        }
        rest = &rest[start + PREFIX.len()..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_parse_handle_roundtrip() {
        let mut t = RefTable::new();
        let h = t.create(Obj::from_int(42), "MYTAG");
        let s = h.to_str();
        assert!(s.contains("MYTAG"));
        assert_eq!(parse_handle(&s), h.as_reference_id());
    }

    #[test]
    fn unreferenced_handle_is_collected() {
        let mut t = RefTable::new();
        let h = t.create(Obj::from_int(1), "T");
        t.set_finalizer(&h, Some(Obj::from_string("onDestroy")));
        // No roots reference `h` at all (it was dropped from scope).
        let finalized = t.collect(&[], &[]);
        assert_eq!(finalized.len(), 1);
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn rooted_handle_survives_collection() {
        let mut t = RefTable::new();
        let h = t.create(Obj::from_int(1), "T");
        let finalized = t.collect(&[], std::slice::from_ref(&h));
        assert!(finalized.is_empty());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn handle_embedded_in_plain_string_survives_collection() {
        // The handle here is never stored as a dedicated `Reference`
        // rep, `List`, or `Dict` — just interpolated into a larger
        // plain string, the way user code would see it after e.g.
        // `set msg "got $r"`. The mark phase must still find it.
        let mut t = RefTable::new();
        let h = t.create(Obj::from_int(99), "T");
        let embedded = Obj::from_string(format!("got {} back", h.to_str()));
        let finalized = t.collect(&[], std::slice::from_ref(&embedded));
        assert!(finalized.is_empty());
        assert_eq!(t.len(), 1);
    }
}

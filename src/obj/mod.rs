//! The object system (§3.1): a reference-counted, dual-representation
//! value that caches a parsed internal form alongside its canonical
//! string form.
//!
//! Reference counting and the per-interpreter live list are, in the
//! reference C implementation, hand-rolled (explicit `incrRefCount` /
//! `decrRefCount` plus intrusive doubly-linked pointers). In idiomatic
//! Rust the refcount is `Rc`'s own strong count and Clone/Drop stand in
//! for incr/decr; [`Obj::ref_count`] exposes it read-only for callers
//! (notably tests of the invariant in spec §8 property 2) that want to
//! observe it directly. The live list that the reference GC walks is
//! *not* separately maintained (see `crate::gc` for why — reachability
//! through the frame stack already gives the GC its live set for free).

pub mod dict;
pub mod list;
pub mod numeric;

use crate::compile::ScriptShape;
use crate::error::Code;
use crate::expr::ExprProgram;
use dict::Dict;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// The internal representation of a value, tagged by variant (§3.1 table).
/// A tagged enum is used in preference to a vtable of hooks (free/dup/
/// update-string) per spec.md §9 "Deep inheritance / vtables": the hook
/// set is small and closed, so a `match` replaces the vtable dispatch,
/// and each arm below *is* that variant's free/dup/update-string logic.
#[derive(Clone)]
pub enum Rep {
    None,
    Int(i64),
    /// A double value. Carries `true` when it was produced by coercing an
    /// integer into a double context ("coerced double", distinct from a
    /// value that started life as a double literal) — see §3.1.
    Double(f64, bool),
    /// Plain string; char length is a lazily-computed cache, `None` until
    /// first requested (mirrors "char-length (-1 if unknown)").
    Str(Rc<Cell<Option<i64>>>),
    List(Rc<RefCell<Vec<Obj>>>),
    Dict(Rc<RefCell<Dict>>),
    Script(Rc<ScriptShape>),
    Expr(Rc<ExprProgram>),
    /// Command lookup cache: epoch snapshot only (see module docs — no
    /// raw pointer into the commands table is kept; a stale epoch simply
    /// forces a fresh hashmap lookup by name, which is O(1) anyway).
    CommandCache { epoch: u64 },
    /// Variable lookup cache: call-frame id snapshot (same rationale).
    VarCache { frame_id: u64 },
    /// Normalised index; `end-k` is encoded as `-(k + 1)` so that `end`
    /// itself is `-1` (§8 "`end-k` indices").
    Index(i64),
    ReturnCode(Code),
    /// Opaque reference handle id (§4.9).
    Reference(u64),
    /// Cached form of `v(k)` syntax: (variable-name value, index value).
    DictSubst { name: Box<Obj>, index: Box<Obj> },
    /// Source location carried for error messages.
    Source { file: Rc<str>, line: u32 },
    /// Fast path for `v($k)`-shaped four-token words: caches the parsed
    /// key value so repeated substitutions skip re-parsing the token run.
    Interpolated { key: Box<Obj> },
}

struct ObjData {
    string_rep: Option<Rc<str>>,
    rep: Rep,
}

/// A value: the central entity of the object system.
#[derive(Clone)]
pub struct Obj(Rc<RefCell<ObjData>>);

impl Obj {
    fn from_parts(string_rep: Option<Rc<str>>, rep: Rep) -> Self {
        Obj(Rc::new(RefCell::new(ObjData { string_rep, rep })))
    }

    pub fn empty() -> Self {
        Self::from_string(String::new())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        let s: String = s.into();
        Self::from_parts(Some(Rc::from(s.as_str())), Rep::Str(Rc::new(Cell::new(None))))
    }

    pub fn from_rc_str(s: Rc<str>) -> Self {
        Self::from_parts(Some(s), Rep::Str(Rc::new(Cell::new(None))))
    }

    pub fn from_int(n: i64) -> Self {
        Self::from_parts(None, Rep::Int(n))
    }

    pub fn from_double(n: f64) -> Self {
        Self::from_parts(None, Rep::Double(n, false))
    }

    pub fn from_coerced_double(n: f64) -> Self {
        Self::from_parts(None, Rep::Double(n, true))
    }

    pub fn from_bool(b: bool) -> Self {
        Self::from_int(if b { 1 } else { 0 })
    }

    pub fn from_list(items: Vec<Obj>) -> Self {
        Self::from_parts(None, Rep::List(Rc::new(RefCell::new(items))))
    }

    pub fn from_dict(d: Dict) -> Self {
        Self::from_parts(None, Rep::Dict(Rc::new(RefCell::new(d))))
    }

    pub fn from_script(shape: Rc<ScriptShape>, string_rep: Rc<str>) -> Self {
        Self::from_parts(Some(string_rep), Rep::Script(shape))
    }

    pub fn from_expr_program(prog: Rc<ExprProgram>, string_rep: Rc<str>) -> Self {
        Self::from_parts(Some(string_rep), Rep::Expr(prog))
    }

    pub fn from_return_code(c: Code) -> Self {
        Self::from_parts(None, Rep::ReturnCode(c))
    }

    pub fn from_reference_id(id: u64, handle: String) -> Self {
        Self::from_parts(Some(Rc::from(handle.as_str())), Rep::Reference(id))
    }

    pub fn from_index(normalised: i64) -> Self {
        Self::from_parts(None, Rep::Index(normalised))
    }

    /// Strong-count of the backing cell; stands in for the C API's
    /// explicit refcount field (see module docs).
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn is_shared(&self) -> bool {
        self.ref_count() > 1
    }

    /// Returns `true` if `self` and `other` are the same underlying cell
    /// (pointer identity, not value equality).
    pub fn is_same_obj(&self, other: &Obj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Duplicate this value into a fresh, unshared cell: copies the
    /// string rep verbatim and clones the internal rep. Plain variants
    /// are bit-copies (`Clone` on the enum); variants owning heap data
    /// (List, Dict) get their own fresh backing storage so mutation
    /// through the duplicate never aliases the original (§3.1 invariant).
    pub fn duplicate(&self) -> Obj {
        let data = self.0.borrow();
        let rep = match &data.rep {
            Rep::List(items) => Rep::List(Rc::new(RefCell::new(items.borrow().clone()))),
            Rep::Dict(d) => Rep::Dict(Rc::new(RefCell::new(d.borrow().clone()))),
            Rep::Str(cache) => Rep::Str(Rc::new(Cell::new(cache.get()))),
            other => other.clone(),
        };
        Obj::from_parts(data.string_rep.clone(), rep)
    }

    /// If shared, return a duplicate; otherwise return `self` unchanged.
    /// This is the copy-on-write entry point the evaluator calls before
    /// any in-place mutation (list/dict append, array-sugar write, ...).
    pub fn make_unshared(self) -> Obj {
        if self.is_shared() {
            self.duplicate()
        } else {
            self
        }
    }

    fn regen_string_rep(&self) {
        let mut data = self.0.borrow_mut();
        if data.string_rep.is_some() {
            return;
        }
        let s = match &data.rep {
            Rep::None => String::new(),
            Rep::Int(n) => n.to_string(),
            Rep::Double(n, _) => format_double(*n),
            Rep::Str(_) => String::new(),
            Rep::List(items) => list::format_list(&items.borrow()),
            Rep::Dict(d) => dict::format_dict(&d.borrow()),
            Rep::Script(s) => s.source.to_string(),
            Rep::Expr(e) => e.source.to_string(),
            Rep::CommandCache { .. } | Rep::VarCache { .. } => String::new(),
            Rep::Index(n) => format_index(*n),
            Rep::ReturnCode(c) => c.name().to_string(),
            Rep::Reference(_) => String::new(),
            Rep::DictSubst { name, index } => format!("{}({})", name.to_str(), index.to_str()),
            Rep::Source { file, line } => format!("{}:{}", file, line),
            Rep::Interpolated { key } => key.to_str().into_owned(),
        };
        data.string_rep = Some(Rc::from(s.as_str()));
    }

    /// The canonical string representation, generating it on demand via
    /// the variant's update-string logic if absent.
    pub fn to_str(&self) -> std::borrow::Cow<'_, str> {
        self.regen_string_rep();
        let data = self.0.borrow();
        std::borrow::Cow::Owned(data.string_rep.clone().unwrap().to_string())
    }

    pub fn as_rc_str(&self) -> Rc<str> {
        self.regen_string_rep();
        self.0.borrow().string_rep.clone().unwrap()
    }

    pub fn char_len(&self) -> i64 {
        if let Rep::Str(cache) = &self.0.borrow().rep {
            if let Some(n) = cache.get() {
                return n;
            }
        }
        let s = self.to_str();
        let n = s.chars().count() as i64;
        if let Rep::Str(cache) = &self.0.borrow().rep {
            cache.set(Some(n));
        }
        n
    }

    pub fn is_empty_string(&self) -> bool {
        self.to_str().is_empty()
    }

    /// Integer coercion, following the same literal grammar as
    /// [`numeric::parse_int`].
    pub fn as_int(&self) -> Option<i64> {
        if let Rep::Int(n) = self.0.borrow().rep {
            return Some(n);
        }
        if let Rep::Index(n) = self.0.borrow().rep {
            return Some(n);
        }
        numeric::parse_int(&self.to_str())
    }

    pub fn as_double(&self) -> Option<f64> {
        match self.0.borrow().rep {
            Rep::Double(n, _) => return Some(n),
            Rep::Int(n) => return Some(n as f64),
            _ => {}
        }
        numeric::parse_double(&self.to_str())
    }

    pub fn as_bool_expr(&self) -> Option<bool> {
        if let Some(n) = self.as_int() {
            return Some(n != 0);
        }
        if let Some(n) = self.as_double() {
            return Some(n != 0.0);
        }
        match self.to_str().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }

    pub fn as_return_code(&self) -> Option<Code> {
        if let Rep::ReturnCode(c) = self.0.borrow().rep {
            return Some(c);
        }
        if let Some(n) = self.as_int() {
            return Code::from_i64(n);
        }
        match self.to_str().as_str() {
            "ok" => Some(Code::Ok),
            "error" => Some(Code::Error),
            "return" => Some(Code::Return),
            "break" => Some(Code::Break),
            "continue" => Some(Code::Continue),
            "signal" => Some(Code::Signal),
            "exit" => Some(Code::Exit),
            _ => None,
        }
    }

    pub fn as_reference_id(&self) -> Option<u64> {
        if let Rep::Reference(id) = self.0.borrow().rep {
            return Some(id);
        }
        None
    }

    pub fn as_script(&self) -> Option<Rc<ScriptShape>> {
        if let Rep::Script(s) = &self.0.borrow().rep {
            return Some(s.clone());
        }
        None
    }

    pub fn as_expr_program(&self) -> Option<Rc<ExprProgram>> {
        if let Rep::Expr(e) = &self.0.borrow().rep {
            return Some(e.clone());
        }
        None
    }

    pub fn command_cache_epoch(&self) -> Option<u64> {
        if let Rep::CommandCache { epoch } = self.0.borrow().rep {
            return Some(epoch);
        }
        None
    }

    pub fn set_command_cache(&self, epoch: u64) {
        self.0.borrow_mut().rep = Rep::CommandCache { epoch };
    }

    pub fn var_cache_frame_id(&self) -> Option<u64> {
        if let Rep::VarCache { frame_id } = self.0.borrow().rep {
            return Some(frame_id);
        }
        None
    }

    pub fn set_var_cache(&self, frame_id: u64) {
        self.0.borrow_mut().rep = Rep::VarCache { frame_id };
    }

    /// Cache a freshly-compiled script shape into this value's internal
    /// representation without touching its string rep (the shape's
    /// source text and this value's string rep are assumed to already
    /// agree — callers compile from `self.to_str()`).
    pub fn cache_script(&self, shape: Rc<ScriptShape>) {
        self.0.borrow_mut().rep = Rep::Script(shape);
    }

    pub fn cache_expr_program(&self, program: Rc<ExprProgram>) {
        self.0.borrow_mut().rep = Rep::Expr(program);
    }

    pub fn rep_kind(&self) -> &'static str {
        match &self.0.borrow().rep {
            Rep::None => "none",
            Rep::Int(_) => "int",
            Rep::Double(_, _) => "double",
            Rep::Str(_) => "string",
            Rep::List(_) => "list",
            Rep::Dict(_) => "dict",
            Rep::Script(_) => "script",
            Rep::Expr(_) => "expr",
            Rep::CommandCache { .. } => "command-cache",
            Rep::VarCache { .. } => "variable-cache",
            Rep::Index(_) => "index",
            Rep::ReturnCode(_) => "return-code",
            Rep::Reference(_) => "reference",
            Rep::DictSubst { .. } => "dict-subst",
            Rep::Source { .. } => "source",
            Rep::Interpolated { .. } => "interpolated",
        }
    }

    /// Access the list representation, shimmering the string rep into a
    /// list (parsing it) if the value isn't already list-typed.
    pub fn as_list(&self) -> Vec<Obj> {
        if let Rep::List(items) = &self.0.borrow().rep {
            return items.borrow().clone();
        }
        list::parse_list(&self.to_str()).unwrap_or_default()
    }

    pub fn list_len(&self) -> usize {
        if let Rep::List(items) = &self.0.borrow().rep {
            return items.borrow().len();
        }
        self.as_list().len()
    }

    /// In-place append, requires an unshared value (see [`Obj::make_unshared`]).
    pub fn list_append_inplace(&self, items_to_add: impl IntoIterator<Item = Obj>) {
        self.shimmer_to_list();
        if let Rep::List(items) = &self.0.borrow().rep {
            items.borrow_mut().extend(items_to_add);
        }
        self.0.borrow_mut().string_rep = None;
    }

    fn shimmer_to_list(&self) {
        let needs = !matches!(self.0.borrow().rep, Rep::List(_));
        if needs {
            let items = list::parse_list(&self.to_str()).unwrap_or_default();
            self.0.borrow_mut().rep = Rep::List(Rc::new(RefCell::new(items)));
        }
    }

    pub fn as_dict(&self) -> Dict {
        if let Rep::Dict(d) = &self.0.borrow().rep {
            return d.borrow().clone();
        }
        dict::parse_dict(&self.to_str()).unwrap_or_default()
    }

    fn shimmer_to_dict(&self) {
        let needs = !matches!(self.0.borrow().rep, Rep::Dict(_));
        if needs {
            let d = dict::parse_dict(&self.to_str()).unwrap_or_default();
            self.0.borrow_mut().rep = Rep::Dict(Rc::new(RefCell::new(d)));
        }
    }

    pub fn dict_set_inplace(&self, key: Obj, value: Obj) {
        self.shimmer_to_dict();
        if let Rep::Dict(d) = &self.0.borrow().rep {
            d.borrow_mut().insert(key, value);
        }
        self.0.borrow_mut().string_rep = None;
    }

    pub fn dict_get(&self, key: &Obj) -> Option<Obj> {
        self.as_dict().get(key).cloned()
    }

    pub fn dict_remove_inplace(&self, key: &Obj) -> Option<Obj> {
        self.shimmer_to_dict();
        let removed = if let Rep::Dict(d) = &self.0.borrow().rep {
            d.borrow_mut().remove(key)
        } else {
            None
        };
        self.0.borrow_mut().string_rep = None;
        removed
    }

    pub fn make_dict_subst(name: Obj, index: Obj) -> Obj {
        Obj::from_parts(None, Rep::DictSubst { name: Box::new(name), index: Box::new(index) })
    }

    pub fn as_dict_subst(&self) -> Option<(Obj, Obj)> {
        if let Rep::DictSubst { name, index } = &self.0.borrow().rep {
            return Some((name.as_ref().clone(), index.as_ref().clone()));
        }
        None
    }

    pub fn make_interpolated(key: Obj) -> Obj {
        Obj::from_parts(None, Rep::Interpolated { key: Box::new(key) })
    }

    pub fn interpolated_key(&self) -> Option<Obj> {
        if let Rep::Interpolated { key } = &self.0.borrow().rep {
            return Some(key.as_ref().clone());
        }
        None
    }

    pub fn make_source(file: Rc<str>, line: u32) -> Obj {
        Obj::from_parts(None, Rep::Source { file, line })
    }

    pub fn as_source(&self) -> Option<(Rc<str>, u32)> {
        if let Rep::Source { file, line } = &self.0.borrow().rep {
            return Some((file.clone(), *line));
        }
        None
    }
}

impl fmt::Debug for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Obj({:?}: {})", self.rep_kind(), self.to_str())
    }
}

impl PartialEq for Obj {
    fn eq(&self, other: &Self) -> bool {
        self.to_str() == other.to_str()
    }
}
impl Eq for Obj {}

impl std::hash::Hash for Obj {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.to_str().hash(state)
    }
}

/// Tcl-style double formatting: integral doubles print with a trailing
/// `.0`, others use the shortest round-tripping representation.
pub fn format_double(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Inf".to_string() } else { "-Inf".to_string() };
    }
    if n == n.trunc() && n.abs() < 1e17 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

fn format_index(n: i64) -> String {
    if n >= 0 {
        n.to_string()
    } else if n == -1 {
        "end".to_string()
    } else {
        format!("end-{}", -n - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_values_are_not_mutated_in_place() {
        let a = Obj::from_list(vec![Obj::from_int(1)]);
        let b = a.clone();
        assert!(a.is_shared());
        let dup = a.clone().make_unshared();
        dup.list_append_inplace(vec![Obj::from_int(2)]);
        assert_eq!(b.list_len(), 1);
        assert_eq!(dup.list_len(), 2);
    }

    #[test]
    fn string_rep_present_after_regen_matches_internal() {
        let v = Obj::from_int(42);
        assert_eq!(v.to_str(), "42");
    }

    #[test]
    fn refcount_balances() {
        let v = Obj::from_int(1);
        let before = v.ref_count();
        let c = v.clone();
        assert_eq!(v.ref_count(), before + 1);
        drop(c);
        assert_eq!(v.ref_count(), before);
    }
}

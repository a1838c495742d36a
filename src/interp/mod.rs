//! The interpreter core (§3.4, §4.6–§4.8): the command table, the call
//! frame stack, variable resolution, and the embedding-visible result/
//! error state. Evaluation itself (word interpolation, dispatch, the
//! `proc` call machinery) lives in `crate::eval` and is implemented as
//! methods on [`Interp`], mirroring the teacher's split between
//! `interpreter/types.rs` (state) and `interpreter/execution_engine.rs`
//! (the loop that drives it).

mod command;
mod frame;
mod options;

pub use command::{CommandRecord, NativeCommand, Param, ProcDef};
pub use frame::{CallFrame, CallFrameData, Var};
pub use options::{ExecutionLimits, InterpOptions};

use crate::error::{InterpError, Result, TraceFrame};
use crate::gc::RefTable;
use crate::obj::Obj;
use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

pub struct Interp {
    pub(crate) commands: HashMap<Rc<str>, CommandRecord>,
    pub(crate) command_epoch: u64,

    pub(crate) frames: Vec<CallFrame>,
    next_frame_id: u64,

    pub limits: ExecutionLimits,
    pub(crate) commands_executed: u64,

    result: Obj,
    pub(crate) error_stack: Vec<TraceFrame>,
    pub(crate) error_code: Obj,

    pub(crate) refs: RefTable,

    assoc_data: HashMap<String, Box<dyn Any>>,
}

impl Interp {
    pub fn new(opts: InterpOptions) -> Self {
        let limits = opts.limits.unwrap_or_default();
        let global = frame::new_frame(0, 0, None, None, Rc::from("<global>"), Vec::new());
        Interp {
            commands: HashMap::new(),
            command_epoch: 0,
            frames: vec![global],
            next_frame_id: 1,
            limits,
            commands_executed: 0,
            result: Obj::empty(),
            error_stack: Vec::new(),
            error_code: Obj::empty(),
            refs: RefTable::new(),
            assoc_data: HashMap::new(),
        }
    }

    // ---- frame stack ----

    pub fn global_frame(&self) -> CallFrame {
        self.frames[0].clone()
    }

    pub fn current_frame(&self) -> CallFrame {
        self.frames.last().unwrap().clone()
    }

    pub fn frame_depth(&self) -> u32 {
        self.frames.len() as u32 - 1
    }

    /// A snapshot of the live frame stack, for the reference GC's mark
    /// phase (§4.9) to walk as roots.
    pub fn frames_snapshot(&self) -> Vec<CallFrame> {
        self.frames.clone()
    }

    pub(crate) fn push_frame(&mut self, proc_name: Option<Rc<str>>, file: Rc<str>, argv: Vec<Obj>) -> Result<CallFrame> {
        if self.frame_depth() >= self.limits.max_eval_depth {
            return Err(InterpError::RecursionLimit { limit: self.limits.max_eval_depth });
        }
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        let parent = self.current_frame();
        let level = parent.borrow().level + 1;
        let frame = frame::new_frame(id, level, Some(parent), proc_name, file, argv);
        self.frames.push(frame.clone());
        Ok(frame)
    }

    pub(crate) fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// Resolve `uplevel`/`upvar`'s level argument: `"#N"` is an absolute
    /// frame depth, a bare integer (or absent, meaning `1`) is relative
    /// to the current frame (§4.6).
    pub fn parse_level_spec(&self, spec: Option<&str>) -> Option<(CallFrame, u32)> {
        let cur = self.current_frame();
        match spec {
            None => frame::frame_at_level(&cur, 1).map(|f| (f, 1)),
            Some(s) => {
                if let Some(abs) = s.strip_prefix('#') {
                    let target: u32 = abs.parse().ok()?;
                    let cur_level = cur.borrow().level;
                    if target > cur_level {
                        return None;
                    }
                    let up = cur_level - target;
                    frame::frame_at_level(&cur, up).map(|f| (f, up))
                } else {
                    let n: u32 = s.parse().ok()?;
                    frame::frame_at_level(&cur, n).map(|f| (f, n))
                }
            }
        }
    }

    // ---- variables ----

    fn split_array_name(name: &str) -> (&str, Option<&str>) {
        if let Some(open) = name.find('(') {
            if name.ends_with(')') {
                return (&name[..open], Some(&name[open + 1..name.len() - 1]));
            }
        }
        (name, None)
    }

    pub fn get_var(&self, frame: &CallFrame, name: &str) -> Result<Obj> {
        let (base, key) = Self::split_array_name(name);
        let (owner, owner_name) = frame::resolve_link(frame, base)?;
        let vars = &owner.borrow().vars;
        match (vars.get(owner_name.as_ref()), key) {
            (Some(Var::Scalar(v)), None) => Ok(v.clone()),
            (Some(Var::Array(map)), Some(k)) => map
                .get(k)
                .cloned()
                .ok_or_else(|| InterpError::ApiMisuse(format!("no such element \"{}\" in array \"{}\"", k, base))),
            (Some(Var::Array(_)), None) => Err(InterpError::ApiMisuse(format!("\"{}\" is an array", base))),
            (Some(Var::Scalar(_)), Some(_)) => Err(InterpError::ApiMisuse(format!("\"{}\" is a scalar, not an array", base))),
            (Some(Var::Link { .. }), _) => unreachable!("resolve_link already followed any link"),
            (None, _) => Err(InterpError::ApiMisuse(format!("can't read \"{}\": no such variable", name))),
        }
    }

    pub fn set_var(&self, frame: &CallFrame, name: &str, value: Obj) -> Result<()> {
        let (base, key) = Self::split_array_name(name);
        let (owner, owner_name) = frame::resolve_link(frame, base)?;
        let mut owner_mut = owner.borrow_mut();
        match key {
            None => {
                owner_mut.vars.insert(owner_name, Var::Scalar(value));
            }
            Some(k) => {
                let entry = owner_mut.vars.entry(owner_name).or_insert_with(|| Var::Array(indexmap::IndexMap::new()));
                match entry {
                    Var::Array(map) => {
                        map.insert(Rc::from(k), value);
                    }
                    Var::Scalar(_) => return Err(InterpError::ApiMisuse(format!("\"{}\" is a scalar, not an array", base))),
                    Var::Link { .. } => unreachable!(),
                }
            }
        }
        Ok(())
    }

    pub fn unset_var(&self, frame: &CallFrame, name: &str) -> Result<()> {
        let (base, key) = Self::split_array_name(name);
        let (owner, owner_name) = frame::resolve_link(frame, base)?;
        let mut owner_mut = owner.borrow_mut();
        match key {
            None => {
                owner_mut
                    .vars
                    .remove(owner_name.as_ref())
                    .ok_or_else(|| InterpError::ApiMisuse(format!("can't unset \"{}\": no such variable", name)))?;
            }
            Some(k) => match owner_mut.vars.get_mut(owner_name.as_ref()) {
                Some(Var::Array(map)) => {
                    map.remove(k).ok_or_else(|| InterpError::ApiMisuse(format!("no such element \"{}\" in array", k)))?;
                }
                _ => return Err(InterpError::ApiMisuse(format!("can't unset \"{}\": no such variable", name))),
            },
        }
        Ok(())
    }

    /// Create a variable in `frame` that links to `target_frame`'s
    /// variable `target_name` (`upvar`, and the `&name` auto-upvar
    /// parameter binding, §4.8).
    pub fn link_var(&self, frame: &CallFrame, local_name: &str, target_frame: &CallFrame, target_name: &str) -> Result<()> {
        let (owner, owner_name) = frame::resolve_link(target_frame, target_name)?;
        frame.borrow_mut().vars.insert(Rc::from(local_name), Var::Link { frame: owner, name: owner_name });
        Ok(())
    }

    // ---- commands ----

    pub fn create_command(&mut self, name: impl Into<Rc<str>>, f: impl NativeCommand + 'static) {
        self.commands.insert(name.into(), CommandRecord::Native(Rc::new(f)));
        self.command_epoch += 1;
    }

    pub fn create_proc(&mut self, def: ProcDef) {
        self.commands.insert(def.name.clone(), CommandRecord::Procedure(Rc::new(def)));
        self.command_epoch += 1;
    }

    pub fn delete_command(&mut self, name: &str) -> bool {
        let existed = self.commands.remove(name).is_some();
        if existed {
            self.command_epoch += 1;
        }
        existed
    }

    pub fn rename_command(&mut self, old: &str, new: &str) -> Result<()> {
        let rec = self.commands.remove(old).ok_or_else(|| InterpError::ApiMisuse(format!("unknown command \"{}\"", old)))?;
        self.commands.insert(Rc::from(new), rec);
        self.command_epoch += 1;
        Ok(())
    }

    pub fn get_command(&self, name: &str) -> Option<&CommandRecord> {
        self.commands.get(name)
    }

    pub fn command_epoch(&self) -> u64 {
        self.command_epoch
    }

    // ---- result / error state ----

    pub fn result(&self) -> Obj {
        self.result.clone()
    }

    pub fn set_result(&mut self, value: Obj) {
        self.result = value;
    }

    pub fn clear_result(&mut self) {
        self.result = Obj::empty();
        self.error_stack.clear();
        self.error_code = Obj::empty();
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.result = Obj::from_string(message.into());
    }

    pub fn push_trace(&mut self, frame: TraceFrame) {
        self.error_stack.push(frame);
    }

    pub fn clear_trace(&mut self) {
        self.error_stack.clear();
    }

    /// Replace the stack-trace entirely, e.g. to restore a snapshot
    /// taken before running code (a finalizer) whose own errors must
    /// not clobber the caller's error state (§4.9 "while preserving the
    /// interpreter's result").
    pub fn restore_trace(&mut self, frames: Vec<TraceFrame>) {
        self.error_stack = frames;
    }

    pub fn stack_trace(&self) -> &[TraceFrame] {
        &self.error_stack
    }

    pub fn set_error_code(&mut self, code: Obj) {
        self.error_code = code;
    }

    pub fn error_code(&self) -> Obj {
        self.error_code.clone()
    }

    // ---- association store (§6): opaque per-interpreter extension slots ----

    pub fn set_assoc_data(&mut self, key: impl Into<String>, value: Box<dyn Any>) {
        self.assoc_data.insert(key.into(), value);
    }

    pub fn get_assoc_data(&self, key: &str) -> Option<&(dyn Any)> {
        self.assoc_data.get(key).map(|b| b.as_ref())
    }

    pub fn delete_assoc_data(&mut self, key: &str) -> bool {
        self.assoc_data.remove(key).is_some()
    }

    pub(crate) fn count_command(&mut self) -> Result<()> {
        self.commands_executed += 1;
        if self.commands_executed > self.limits.max_command_count {
            return Err(InterpError::Internal("command count limit exceeded".into()));
        }
        Ok(())
    }
}

/// Build a fresh interpreter with the standard command set installed
/// (§8 "standard library" scenarios assume these are present without an
/// explicit `create_command` call from the embedder).
pub fn new_standard_interp(opts: InterpOptions) -> Interp {
    let mut interp = Interp::new(opts);
    crate::commands::install_standard_commands(&mut interp);
    interp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_scalar() {
        let interp = Interp::new(InterpOptions::default());
        let f = interp.global_frame();
        interp.set_var(&f, "x", Obj::from_int(5)).unwrap();
        assert_eq!(interp.get_var(&f, "x").unwrap().as_int(), Some(5));
    }

    #[test]
    fn array_element_roundtrip() {
        let interp = Interp::new(InterpOptions::default());
        let f = interp.global_frame();
        interp.set_var(&f, "arr(k)", Obj::from_string("v")).unwrap();
        assert_eq!(interp.get_var(&f, "arr(k)").unwrap().to_str(), "v");
    }

    #[test]
    fn unset_missing_variable_errors() {
        let interp = Interp::new(InterpOptions::default());
        let f = interp.global_frame();
        assert!(interp.unset_var(&f, "nope").is_err());
    }
}

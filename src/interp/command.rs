//! Command table entries (§3.4): a command is either a native Rust
//! implementation or a user-defined `proc`.

use crate::error::Flow;
use crate::obj::Obj;
use std::rc::Rc;

/// A native command implementation. `&[Obj]` is the full argv including
/// argv\[0\] (the command name), matching the convention the evaluator's
/// dispatch loop already builds for every call.
pub trait NativeCommand {
    fn call(&self, interp: &mut crate::interp::Interp, args: &[Obj]) -> Flow;
}

impl<F> NativeCommand for F
where
    F: Fn(&mut crate::interp::Interp, &[Obj]) -> Flow,
{
    fn call(&self, interp: &mut crate::interp::Interp, args: &[Obj]) -> Flow {
        self(interp, args)
    }
}

/// A single formal parameter of a `proc` (§4.8): a name, an optional
/// default value, and whether it auto-links to the caller's variable of
/// the same name (`&name`, the by-reference convention §8 exercises via
/// `upvar`-equivalent parameters).
#[derive(Clone)]
pub struct Param {
    pub name: Rc<str>,
    pub default: Option<Obj>,
    pub by_ref: bool,
}

/// A user-defined procedure.
pub struct ProcDef {
    pub name: Rc<str>,
    pub params: Vec<Param>,
    /// `true` when the last parameter is the literal name `args`, which
    /// slurps any remaining actual arguments as a list (§4.8).
    pub has_args_tail: bool,
    pub body: Obj,
}

#[derive(Clone)]
pub enum CommandRecord {
    Native(Rc<dyn NativeCommand>),
    Procedure(Rc<ProcDef>),
}

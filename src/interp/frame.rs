//! Call frames and variable storage (§4.6, §4.8).
//!
//! A frame is `Rc<RefCell<CallFrameData>>` rather than a pooled slab
//! indexed by id: `upvar`/`uplevel` links then hold a direct `Rc` to the
//! target frame instead of an id to re-look-up, so a link is always
//! valid for as long as anything can reach it — the same "Rc ownership
//! is the reachability proof" argument as [`crate::obj`]'s refcounting.

use crate::error::InterpError;
use crate::obj::Obj;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A variable slot: a plain scalar, an associative array (`$v(k)`
/// syntax), or a link created by `upvar`/the `&name` auto-upvar
/// parameter binding (§4.8).
#[derive(Clone)]
pub enum Var {
    Scalar(Obj),
    Array(IndexMap<Rc<str>, Obj>),
    Link { frame: CallFrame, name: Rc<str> },
}

pub struct CallFrameData {
    pub id: u64,
    pub level: u32,
    pub vars: std::collections::HashMap<Rc<str>, Var>,
    pub parent: Option<CallFrame>,
    pub proc_name: Option<Rc<str>>,
    pub file: Rc<str>,
    pub line: u32,
    pub argv: Vec<Obj>,
}

pub type CallFrame = Rc<RefCell<CallFrameData>>;

pub fn new_frame(id: u64, level: u32, parent: Option<CallFrame>, proc_name: Option<Rc<str>>, file: Rc<str>, argv: Vec<Obj>) -> CallFrame {
    Rc::new(RefCell::new(CallFrameData {
        id,
        level,
        vars: std::collections::HashMap::new(),
        parent,
        proc_name,
        file,
        line: 1,
        argv,
    }))
}

/// Follow `Link` chains to the frame/name that actually owns storage,
/// detecting cycles (a pathological `upvar` chain pointing back on
/// itself) rather than looping forever.
pub fn resolve_link(frame: &CallFrame, name: &str) -> Result<(CallFrame, Rc<str>), InterpError> {
    let mut cur = frame.clone();
    let mut cur_name: Rc<str> = Rc::from(name);
    let mut seen = std::collections::HashSet::new();
    loop {
        if !seen.insert((cur.borrow().id, cur_name.clone())) {
            return Err(InterpError::Internal(format!("cyclic variable link detected at '{}'", cur_name)));
        }
        let next = match cur.borrow().vars.get(cur_name.as_ref()) {
            Some(Var::Link { frame, name }) => Some((frame.clone(), name.clone())),
            _ => None,
        };
        match next {
            Some((f, n)) => {
                cur = f;
                cur_name = n;
            }
            None => return Ok((cur, cur_name)),
        }
    }
}

/// Walk `level` frames up the `parent` chain from `frame` (uplevel's
/// `#N`/`N` addressing, §4.6).
pub fn frame_at_level(frame: &CallFrame, level: u32) -> Option<CallFrame> {
    let mut cur = frame.clone();
    for _ in 0..level {
        let parent = cur.borrow().parent.clone()?;
        cur = parent;
    }
    Some(cur)
}

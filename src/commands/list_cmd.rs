//! `lappend`, `llength`, `list`: the list-manipulation wrappers the §8
//! end-to-end scenarios exercise directly (scenarios 3 and 5). Not in
//! §1's intrinsic list, but there is no embedder-supplied alternative
//! for them — they are thin, unavoidable wrappers over the object
//! system's own list representation (`crate::obj::list`), so they live
//! here rather than being left for an embedding consumer to reinvent.

use super::arg_error;
use crate::error::Flow;
use crate::interp::Interp;
use crate::obj::Obj;

/// `lappend varName ?value value ...?` (§8 scenario 3): copy-on-write
/// append — duplicates the variable's current value first if another
/// reference to it is live (§3.1 "a value whose refcount is > 1 is
/// shared and must not be mutated in place").
pub(crate) fn cmd_lappend(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 2 {
        return arg_error(interp, "wrong # args: should be \"lappend varName ?value value ...?\"");
    }
    let frame = interp.current_frame();
    let name = args[1].to_str().into_owned();
    let current = interp.get_var(&frame, &name).unwrap_or_else(|_| Obj::empty());
    let unshared = current.make_unshared();
    unshared.list_append_inplace(args[2..].iter().cloned());
    if let Err(e) = interp.set_var(&frame, &name, unshared.clone()) {
        return arg_error(interp, e.to_string());
    }
    Ok(unshared)
}

pub(crate) fn cmd_llength(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 2 {
        return arg_error(interp, "wrong # args: should be \"llength list\"");
    }
    Ok(Obj::from_int(args[1].list_len() as i64))
}

/// `list ?value value ...?` (§8 scenario 5): builds a list value from
/// its arguments verbatim, each becoming one element regardless of its
/// own internal representation or embedded whitespace.
pub(crate) fn cmd_list(_interp: &mut Interp, args: &[Obj]) -> Flow {
    Ok(Obj::from_list(args[1..].to_vec()))
}

//! `ref`, `getref`, `setref`, `getFinalizer`, `setFinalizer`, `collect`
//! (§4.9, §8 scenario 7): the scripting surface over `crate::gc::RefTable`.

use super::arg_error;
use crate::error::Flow;
use crate::interp::Interp;
use crate::obj::Obj;

/// `ref value tag ?finalizer?`. An empty-string finalizer argument means
/// "none", matching scenario 7's `ref hello tag {}`.
pub(crate) fn cmd_ref(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 3 || args.len() > 4 {
        return arg_error(interp, "wrong # args: should be \"ref value tag ?finalizer?\"");
    }
    let tag = args[2].to_str().into_owned();
    let handle = interp.refs.create(args[1].clone(), &tag);
    if let Some(finalizer) = args.get(3) {
        if !finalizer.is_empty_string() {
            interp.refs.set_finalizer(&handle, Some(finalizer.clone()));
        }
    }
    Ok(handle)
}

pub(crate) fn cmd_getref(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 2 {
        return arg_error(interp, "wrong # args: should be \"getref reference\"");
    }
    match interp.refs.get(&args[1]) {
        Some(v) => Ok(v),
        None => arg_error(interp, format!("invalid reference id \"{}\"", args[1].to_str())),
    }
}

pub(crate) fn cmd_setref(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 3 {
        return arg_error(interp, "wrong # args: should be \"setref reference value\"");
    }
    match interp.refs.set(&args[1], args[2].clone()) {
        Some(()) => Ok(args[2].clone()),
        None => arg_error(interp, format!("invalid reference id \"{}\"", args[1].to_str())),
    }
}

pub(crate) fn cmd_get_finalizer(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 2 {
        return arg_error(interp, "wrong # args: should be \"getFinalizer reference\"");
    }
    Ok(interp.refs.get_finalizer(&args[1]).unwrap_or_else(Obj::empty))
}

pub(crate) fn cmd_set_finalizer(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 3 {
        return arg_error(interp, "wrong # args: should be \"setFinalizer reference finalizer\"");
    }
    let finalizer = if args[2].is_empty_string() { None } else { Some(args[2].clone()) };
    match interp.refs.set_finalizer(&args[1], finalizer) {
        Some(()) => Ok(args[2].clone()),
        None => arg_error(interp, format!("invalid reference id \"{}\"", args[1].to_str())),
    }
}

/// `collect` (§4.9 "explicitly via the `collect` command"): runs the
/// mark-sweep immediately and invokes any finalizers of now-dead
/// references, then returns the number collected.
pub(crate) fn cmd_collect(interp: &mut Interp, _args: &[Obj]) -> Flow {
    let frames: Vec<_> = interp.frames_snapshot();
    let roots = vec![interp.result(), interp.error_code()];
    let finalized = interp.refs.collect(&frames, &roots);
    let count = finalized.len();
    super::run_finalizers(interp, finalized);
    Ok(Obj::from_int(count as i64))
}

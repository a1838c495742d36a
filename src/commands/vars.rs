//! `set`, `unset`: the two variable-access intrinsics named in §1. `incr`
//! is not in that list but is exercised directly by the §8 end-to-end
//! "upvar" scenario (`incr w`); it is grounded the same way — a thin
//! wrapper over [`Interp::get_var`]/[`Interp::set_var`], so it lives
//! alongside them rather than in its own file.

use super::arg_error;
use crate::error::Flow;
use crate::interp::Interp;
use crate::obj::Obj;

pub(crate) fn cmd_set(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 2 || args.len() > 3 {
        return arg_error(interp, "wrong # args: should be \"set varName ?newValue?\"");
    }
    let frame = interp.current_frame();
    let name = args[1].to_str().into_owned();
    if args.len() == 3 {
        interp.set_var(&frame, &name, args[2].clone()).map_err(|e| {
            interp.set_error(e.to_string());
            crate::error::Signal::Error
        })?;
    }
    interp.get_var(&frame, &name).map_err(|e| {
        interp.set_error(e.to_string());
        crate::error::Signal::Error
    })
}

pub(crate) fn cmd_unset(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 2 {
        return arg_error(interp, "wrong # args: should be \"unset varName ?varName ...?\"");
    }
    let frame = interp.current_frame();
    for a in &args[1..] {
        let name = a.to_str().into_owned();
        if let Err(e) = interp.unset_var(&frame, &name) {
            return arg_error(interp, e.to_string());
        }
    }
    Ok(Obj::empty())
}

pub(crate) fn cmd_incr(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 2 || args.len() > 3 {
        return arg_error(interp, "wrong # args: should be \"incr varName ?increment?\"");
    }
    let frame = interp.current_frame();
    let name = args[1].to_str().into_owned();
    let delta = if args.len() == 3 {
        match args[2].as_int() {
            Some(n) => n,
            None => return arg_error(interp, format!("expected integer but got \"{}\"", args[2].to_str())),
        }
    } else {
        1
    };
    let current = interp.get_var(&frame, &name).ok().and_then(|v| v.as_int()).unwrap_or(0);
    let updated = Obj::from_int(current + delta);
    if let Err(e) = interp.set_var(&frame, &name, updated.clone()) {
        return arg_error(interp, e.to_string());
    }
    Ok(updated)
}

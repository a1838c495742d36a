//! `if`, `while`, `for`, `foreach`: the four intrinsic control-flow
//! commands (§1). All four evaluate their body in the *current* frame
//! (they are not procedure calls — no new call frame, matching the
//! reference semantics where a loop body shares the enclosing scope).

use super::arg_error;
use crate::error::{Flow, Signal};
use crate::eval::eval_expr_in_frame;
use crate::interp::Interp;
use crate::obj::Obj;

fn truthy(interp: &mut Interp, cond: Flow) -> Result<bool, Signal> {
    let v = cond?;
    v.as_bool_expr().ok_or_else(|| {
        interp.set_error(format!("expected boolean value but got \"{}\"", v.to_str()));
        Signal::Error
    })
}

/// Catches `BREAK`/`CONTINUE` the way a loop body must (§4.7: these are
/// only non-local exits here, not errors); any other signal propagates.
/// Returns `Ok(true)` to keep looping, `Ok(false)` to stop.
fn run_loop_body(interp: &mut Interp, body: &Obj) -> Result<bool, Signal> {
    match interp.eval_obj(body) {
        Ok(_) => Ok(true),
        Err(Signal::Break) => Ok(false),
        Err(Signal::Continue) => Ok(true),
        Err(other) => Err(other),
    }
}

pub(crate) fn cmd_if(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 3 {
        return arg_error(interp, "wrong # args: should be \"if cond ?then? body ?elseif cond ?then? body ...? ?else? ?body?\"");
    }
    let frame = interp.current_frame();
    let mut i = 1;
    loop {
        if i >= args.len() {
            return arg_error(interp, "wrong # args: no body for \"if\" condition");
        }
        let cond_text = args[i].to_str().into_owned();
        i += 1;
        if i < args.len() && args[i].to_str() == "then" {
            i += 1;
        }
        if i >= args.len() {
            return arg_error(interp, "wrong # args: no body for \"if\" condition");
        }
        let body = args[i].clone();
        i += 1;
        let cond = eval_expr_in_frame(interp, &frame, &cond_text);
        if truthy(interp, cond)? {
            return interp.eval_obj(&body);
        }
        if i >= args.len() {
            return Ok(Obj::empty());
        }
        let next = args[i].to_str();
        if next == "elseif" {
            i += 1;
            continue;
        }
        if next == "else" {
            i += 1;
            if i >= args.len() {
                return arg_error(interp, "wrong # args: no body after \"else\"");
            }
            let else_body = args[i].clone();
            return interp.eval_obj(&else_body);
        }
        // A bare trailing word with no `elseif`/`else` keyword is itself
        // the else body.
        let else_body = args[i].clone();
        return interp.eval_obj(&else_body);
    }
}

pub(crate) fn cmd_while(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 3 {
        return arg_error(interp, "wrong # args: should be \"while cond body\"");
    }
    let frame = interp.current_frame();
    let cond_text = args[1].to_str().into_owned();
    let body = args[2].clone();
    loop {
        let cond = eval_expr_in_frame(interp, &frame, &cond_text);
        if !truthy(interp, cond)? {
            break;
        }
        if !run_loop_body(interp, &body)? {
            break;
        }
    }
    Ok(Obj::empty())
}

pub(crate) fn cmd_for(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 5 {
        return arg_error(interp, "wrong # args: should be \"for start test next body\"");
    }
    let frame = interp.current_frame();
    interp.eval_obj(&args[1])?;
    let test_text = args[2].to_str().into_owned();
    let next = args[3].clone();
    let body = args[4].clone();
    loop {
        let cond = eval_expr_in_frame(interp, &frame, &test_text);
        if !truthy(interp, cond)? {
            break;
        }
        if !run_loop_body(interp, &body)? {
            break;
        }
        interp.eval_obj(&next)?;
    }
    Ok(Obj::empty())
}

pub(crate) fn cmd_foreach(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 4 {
        return arg_error(interp, "wrong # args: should be \"foreach varName list body\"");
    }
    let frame = interp.current_frame();
    let var_names = args[1].as_list();
    let values = args[2].as_list();
    let body = args[3].clone();
    if var_names.is_empty() {
        return arg_error(interp, "foreach varlist is empty");
    }
    let stride = var_names.len();
    let mut idx = 0;
    while idx < values.len() {
        for (slot, name) in var_names.iter().enumerate() {
            let value = values.get(idx + slot).cloned().unwrap_or_else(Obj::empty);
            if let Err(e) = interp.set_var(&frame, &name.to_str(), value) {
                return arg_error(interp, e.to_string());
            }
        }
        if !run_loop_body(interp, &body)? {
            break;
        }
        idx += stride;
    }
    Ok(Obj::empty())
}

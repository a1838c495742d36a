//! `proc`, `expr`, `eval` (§1, §4.5, §4.8).

use super::arg_error;
use crate::error::Flow;
use crate::eval::eval_expr_in_frame;
use crate::interp::{Interp, Param, ProcDef};
use crate::obj::Obj;
use std::rc::Rc;

/// `proc name arglist body` (§4.8): parses the formal-parameter list
/// (itself a list, one element per parameter — a bare name, or a
/// two-element `{name default}` pair for an optional parameter) and
/// registers a `ProcDef`. A parameter name prefixed with `&` is the
/// by-reference convention (§4.8 "a formal name prefixed with `&`
/// triggers an automatic upvar") — this crate resolves it against the
/// *actual argument's string value* naming a caller-frame variable,
/// the conventional `upvar $name` idiom, rather than requiring
/// call-site reference syntax (see DESIGN.md Open Questions).
pub(crate) fn cmd_proc(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() != 4 {
        return arg_error(interp, "wrong # args: should be \"proc name args body\"");
    }
    let name: Rc<str> = Rc::from(args[1].to_str().as_ref());
    let formal_specs = args[2].as_list();
    let mut params = Vec::with_capacity(formal_specs.len());
    let mut has_args_tail = false;
    for (i, spec) in formal_specs.iter().enumerate() {
        let parts = spec.as_list();
        let (raw_name, default) = match parts.len() {
            1 => (parts[0].to_str().into_owned(), None),
            2 => (parts[0].to_str().into_owned(), Some(parts[1].clone())),
            _ => return arg_error(interp, format!("too many fields in argument specifier \"{}\"", spec.to_str())),
        };
        let by_ref = raw_name.starts_with('&');
        let clean_name: Rc<str> = Rc::from(raw_name.strip_prefix('&').unwrap_or(&raw_name));
        if clean_name.as_ref() == "args" && i + 1 == formal_specs.len() {
            has_args_tail = true;
        }
        params.push(Param { name: clean_name, default, by_ref });
    }
    interp.create_proc(ProcDef { name, params, has_args_tail, body: args[3].clone() });
    Ok(Obj::empty())
}

/// `expr arg ?arg ...?` (§4.5, §9 Open Questions): multiple arguments
/// are concatenated with single spaces before parsing.
pub(crate) fn cmd_expr(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 2 {
        return arg_error(interp, "wrong # args: should be \"expr arg ?arg ...?\"");
    }
    let frame = interp.current_frame();
    let joined: Vec<String> = args[1..].iter().map(|a| a.to_str().into_owned()).collect();
    let source = joined.join(" ");
    eval_expr_in_frame(interp, &frame, &source)
}

/// `eval arg ?arg ...?`: concatenates its arguments with single spaces
/// (the same convention `expr` uses) and evaluates the result as a
/// script in the current frame.
pub(crate) fn cmd_eval(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 2 {
        return arg_error(interp, "wrong # args: should be \"eval arg ?arg ...?\"");
    }
    let joined: Vec<String> = args[1..].iter().map(|a| a.to_str().into_owned()).collect();
    let source = joined.join(" ");
    interp.eval_str(&source)
}

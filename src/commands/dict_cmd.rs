//! `dict create|set|get|size` (§8 scenario 4). The spec names `dict` as
//! an extra only through the end-to-end scenarios, not §1's intrinsic
//! list; the subset of subcommands implemented here is exactly what
//! those scenarios exercise, grounded directly on `crate::obj::dict`.

use super::arg_error;
use crate::error::Flow;
use crate::interp::Interp;
use crate::obj::dict::Dict;
use crate::obj::Obj;

pub(crate) fn cmd_dict(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 2 {
        return arg_error(interp, "wrong # args: should be \"dict subcommand ?arg ...?\"");
    }
    let sub = args[1].to_str().into_owned();
    match sub.as_str() {
        "create" => {
            if (args.len() - 2) % 2 != 0 {
                return arg_error(interp, "wrong # args: \"dict create\" needs an even number of key/value arguments");
            }
            let d = Obj::from_dict(Dict::new());
            for pair in args[2..].chunks(2) {
                d.dict_set_inplace(pair[0].clone(), pair[1].clone());
            }
            Ok(d)
        }
        // `dict set dictVarName key value` (Tcl convention: the first
        // argument names a *variable*, updated in place, not a dict
        // value passed by copy — so `dict get $d ...` afterward sees the
        // change without re-assigning `d` from `dict set`'s result).
        "set" => {
            if args.len() != 5 {
                return arg_error(interp, "wrong # args: should be \"dict set dictVarName key value\"");
            }
            let frame = interp.current_frame();
            let var_name = args[2].to_str().into_owned();
            let current = interp.get_var(&frame, &var_name).unwrap_or_else(|_| Obj::from_dict(Dict::new()));
            let updated = current.make_unshared();
            updated.dict_set_inplace(args[3].clone(), args[4].clone());
            if let Err(e) = interp.set_var(&frame, &var_name, updated.clone()) {
                return arg_error(interp, e.to_string());
            }
            Ok(updated)
        }
        "get" => {
            if args.len() != 4 {
                return arg_error(interp, "wrong # args: should be \"dict get dictValue key\"");
            }
            args[2].dict_get(&args[3]).ok_or_else(|| {
                interp.set_error(format!("key \"{}\" not known in dictionary", args[3].to_str()));
                crate::error::Signal::Error
            })
        }
        "size" => {
            if args.len() != 3 {
                return arg_error(interp, "wrong # args: should be \"dict size dictValue\"");
            }
            Ok(Obj::from_int(args[2].as_dict().len() as i64))
        }
        "exists" => {
            if args.len() != 4 {
                return arg_error(interp, "wrong # args: should be \"dict exists dictValue key\"");
            }
            Ok(Obj::from_bool(args[2].as_dict().contains_key(&args[3])))
        }
        "unset" => {
            if args.len() != 4 {
                return arg_error(interp, "wrong # args: should be \"dict unset dictVarName key\"");
            }
            let frame = interp.current_frame();
            let var_name = args[2].to_str().into_owned();
            let current = interp.get_var(&frame, &var_name).unwrap_or_else(|_| Obj::from_dict(Dict::new()));
            let updated = current.make_unshared();
            updated.dict_remove_inplace(&args[3]);
            if let Err(e) = interp.set_var(&frame, &var_name, updated.clone()) {
                return arg_error(interp, e.to_string());
            }
            Ok(updated)
        }
        other => arg_error(interp, format!("unknown or ambiguous subcommand \"{}\": must be create, exists, get, set, size, or unset", other)),
    }
}

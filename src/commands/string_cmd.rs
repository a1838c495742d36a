//! `string length` (§8 scenario 7: `string length $r` on a 42-byte
//! reference handle). Only the subcommand the testable scenarios
//! exercise is implemented; a full `string` ensemble belongs to an
//! embedder's extension set, not the evaluator core.

use super::arg_error;
use crate::error::Flow;
use crate::interp::Interp;
use crate::obj::Obj;

pub(crate) fn cmd_string(interp: &mut Interp, args: &[Obj]) -> Flow {
    if args.len() < 2 {
        return arg_error(interp, "wrong # args: should be \"string subcommand ?arg ...?\"");
    }
    let sub = args[1].to_str().into_owned();
    match sub.as_str() {
        "length" => {
            if args.len() != 3 {
                return arg_error(interp, "wrong # args: should be \"string length string\"");
            }
            Ok(Obj::from_int(args[2].char_len()))
        }
        other => arg_error(interp, format!("unknown or ambiguous subcommand \"{}\": must be length", other)),
    }
}

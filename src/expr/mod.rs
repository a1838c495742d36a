//! The expression sub-language (§4.5): a separate tokeniser, a
//! precedence-climbing compiler, and a small stack VM, kept apart from
//! the script parser/compiler since `expr` operands obey a different
//! grammar (infix, with a conventional operator-precedence table)
//! entirely unrelated to Tcl word/command substitution rules.

pub mod compiler;
pub mod opcodes;
pub mod vm;

pub use opcodes::{Func, Opcode};
pub use vm::ExprEvalContext;

use crate::error::{InterpError, Result};
use crate::obj::Obj;
use std::rc::Rc;

/// A compiled expression, the form cached inside an `Obj`'s `Expr`
/// internal representation (§3.1) so repeated evaluation of the same
/// `expr {...}` body (typically a loop condition) skips re-tokenising
/// and re-compiling.
pub struct ExprProgram {
    pub source: Rc<str>,
    pub ops: Vec<Opcode>,
}

pub fn compile_expr(source: &str) -> Result<ExprProgram> {
    let ops = compiler::compile(source).map_err(|e| InterpError::ApiMisuse(e.0))?;
    Ok(ExprProgram { source: Rc::from(source), ops })
}

pub fn eval_expr(program: &ExprProgram, ctx: &mut dyn ExprEvalContext) -> Result<Obj> {
    vm::run(&program.ops, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoVars;
    impl ExprEvalContext for NoVars {
        fn get_var(&mut self, name: &str) -> Result<Obj> {
            Err(InterpError::ApiMisuse(format!("no such variable: {}", name)))
        }
        fn eval_command(&mut self, _script: &str) -> Result<Obj> {
            Err(InterpError::ApiMisuse("no command evaluation in this context".into()))
        }
    }

    #[test]
    fn compile_and_eval_roundtrip() {
        let program = compile_expr("3 + 4 * 2").unwrap();
        let result = eval_expr(&program, &mut NoVars).unwrap();
        assert_eq!(result.as_int(), Some(11));
    }

    #[test]
    fn reuses_cached_program_source() {
        let program = compile_expr("1 + 1").unwrap();
        assert_eq!(program.source.as_ref(), "1 + 1");
    }
}

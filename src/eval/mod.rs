//! The evaluator (§4.7, §4.8): word interpolation, `{*}` expansion,
//! command dispatch with `unknown` fallback, and the `proc` call
//! machinery including tailcall-as-loop. Implemented as methods on
//! [`crate::interp::Interp`] — this module owns no state of its own,
//! mirroring the teacher's `interpreter/execution_engine.rs` sitting
//! alongside (not inside) `interpreter/types.rs`.

use crate::compile::{CompiledLine, CompiledWord, ScriptShape};
use crate::error::{Flow, InterpError, Signal, TraceFrame};
use crate::expr::{self, ExprEvalContext};
use crate::interp::{CallFrame, CommandRecord, Interp, ProcDef};
use crate::obj::Obj;
use crate::parser::{Token, TokenType};
use std::rc::Rc;

impl Interp {
    /// Evaluate a script given as source text against the current frame
    /// (the embedding API's `Tcl_Eval`/`Jim_Eval` equivalent, §6).
    pub fn eval_str(&mut self, source: &str) -> Flow {
        let frame = self.current_frame();
        self.eval_script_source(&frame, source)
    }

    /// Evaluate a script stored as an `Obj`, compiling (and caching) its
    /// shape first.
    pub fn eval_obj(&mut self, script: &Obj) -> Flow {
        let frame = self.current_frame();
        let shape = self.compiled_shape(script).map_err(|e| self.error_signal(e))?;
        self.eval_shape(&frame, &shape)
    }

    /// `eval_list` (§6, §4.7 "if that value is a list, it dispatches
    /// directly element-by-element"): bypasses script compilation and
    /// word interpolation entirely, treating `list_value`'s elements as
    /// an already-substituted argv.
    pub fn eval_list_fast_path(&mut self, list_value: &Obj) -> Flow {
        let argv = list_value.as_list();
        if argv.is_empty() {
            return Ok(Obj::empty());
        }
        self.count_command().map_err(|e| self.error_signal(e))?;
        let frame = self.current_frame();
        self.dispatch(&frame, argv)
    }

    pub(crate) fn eval_script_source(&mut self, frame: &CallFrame, source: &str) -> Flow {
        let shape = Rc::new(ScriptShape::compile(source).map_err(|e| self.error_signal(InterpError::ApiMisuse(e.to_string())))?);
        self.eval_shape(frame, &shape)
    }

    fn error_signal(&mut self, e: InterpError) -> Signal {
        self.set_error(e.to_string());
        self.clear_trace();
        Signal::Error
    }

    /// Compile-and-cache a script's shape (§4.3): if `obj` already holds
    /// a compiled shape, reuse it; otherwise compile from its string rep
    /// and cache the result back onto the value.
    pub(crate) fn compiled_shape(&self, obj: &Obj) -> Result<Rc<ScriptShape>, InterpError> {
        if let Some(shape) = obj.as_script() {
            return Ok(shape);
        }
        let shape = Rc::new(ScriptShape::compile(&obj.to_str()).map_err(|e| InterpError::ApiMisuse(e.to_string()))?);
        obj.cache_script(shape.clone());
        Ok(shape)
    }

    pub(crate) fn eval_shape(&mut self, frame: &CallFrame, shape: &Rc<ScriptShape>) -> Flow {
        shape.begin_use();
        let mut result = Obj::empty();
        for line in &shape.lines {
            match self.eval_line(frame, line) {
                Ok(v) => result = v,
                Err(sig) => {
                    shape.end_use();
                    return Err(sig);
                }
            }
        }
        shape.end_use();
        Ok(result)
    }

    /// §4.9 pacing: "runs implicitly when either `newId - lastCollectId >
    /// 5000` or `now - lastCollectTime > 300s`". Called from every line
    /// dispatch so an embedder never has to poll `api::collect_if_needed`
    /// by hand for this to happen — that function stays available for an
    /// embedder who wants to force the check between evaluations too.
    fn maybe_collect_garbage(&mut self) {
        if self.refs.should_collect(self.limits.gc_interval_ids, self.limits.gc_interval_secs) {
            let frames = self.frames_snapshot();
            let roots = vec![self.result(), self.error_code()];
            let finalized = self.refs.collect(&frames, &roots);
            crate::commands::run_finalizers(self, finalized);
        }
    }

    fn eval_line(&mut self, frame: &CallFrame, line: &CompiledLine) -> Flow {
        self.count_command().map_err(|e| self.error_signal(e))?;
        self.maybe_collect_garbage();
        frame.borrow_mut().line = line.line;
        let mut argv: Vec<Obj> = Vec::with_capacity(line.words.len());
        for word in &line.words {
            let value = self.interpolate_word(frame, word)?;
            if word.expand {
                argv.extend(value.as_list());
            } else {
                argv.push(value);
            }
        }
        if argv.is_empty() {
            return Ok(Obj::empty());
        }
        self.dispatch(frame, argv)
    }

    /// Interpolate one word (§4.7): a single-token word passes its
    /// value through untouched (so `set y $x` shares `x`'s internal
    /// representation rather than forcing a string round-trip);
    /// multi-token words concatenate each token's string form.
    fn interpolate_word(&mut self, frame: &CallFrame, word: &CompiledWord) -> Flow {
        if word.tokens.len() == 1 {
            return self.interpolate_token(frame, &word.tokens[0]);
        }
        let mut buf = String::new();
        for tok in &word.tokens {
            let v = self.interpolate_token(frame, tok)?;
            buf.push_str(&v.to_str());
        }
        Ok(Obj::from_string(buf))
    }

    fn interpolate_token(&mut self, frame: &CallFrame, tok: &Token) -> Flow {
        match tok.kind {
            TokenType::Str => Ok(Obj::from_rc_str(tok.text.clone())),
            TokenType::Esc => Ok(Obj::from_string(crate::parser::escape::substitute(&tok.text))),
            TokenType::Var => {
                let name = strip_var_sigil(&tok.text);
                self.get_var(frame, &name).map_err(|e| self.error_signal(e))
            }
            TokenType::DictSugar => {
                let (base, key_src) = split_dict_sugar(&tok.text);
                let key = self.interpolate_source(frame, key_src)?;
                let name = format!("{}({})", base, key.to_str());
                self.get_var(frame, &name).map_err(|e| self.error_signal(e))
            }
            TokenType::ExprSugar => {
                let program = expr::compile_expr(&tok.text).map_err(|e| self.error_signal(e))?;
                let mut ctx = InterpExprCtx { interp: self, frame: frame.clone() };
                expr::eval_expr(&program, &mut ctx).map_err(|e| self.error_signal(e))
            }
            TokenType::Cmd => self.eval_script_source(frame, &tok.text),
            TokenType::Sep | TokenType::Eol | TokenType::Eof => unreachable!("compiler never emits these inside a word"),
        }
    }

    /// Interpolate an arbitrary piece of source text as if it were a
    /// subst body (used for `$v(k)`'s key, which is itself substituted).
    fn interpolate_source(&mut self, frame: &CallFrame, source: &str) -> Flow {
        let tokens = crate::parser::tokenize_script(source).map_err(|e| self.error_signal(InterpError::ApiMisuse(e.to_string())))?;
        let mut buf = String::new();
        for tok in &tokens {
            if matches!(tok.kind, TokenType::Eol | TokenType::Eof) {
                continue;
            }
            let v = self.interpolate_token(frame, tok)?;
            buf.push_str(&v.to_str());
        }
        Ok(Obj::from_string(buf))
    }

    /// Dispatch a fully-interpolated argv, looping on the internal
    /// `EVAL` signal rather than recursing (§4.7, §9 "tailcall"): a
    /// `tailcall` replaces argv and jumps back to the top of this loop
    /// instead of pushing a new Rust stack frame.
    fn dispatch(&mut self, frame: &CallFrame, mut argv: Vec<Obj>) -> Flow {
        loop {
            let name = argv[0].to_str().into_owned();
            let record = match self.get_command(&name) {
                Some(r) => r.clone(),
                None => match self.get_command("unknown") {
                    Some(r) => {
                        let r = r.clone();
                        let mut new_argv = Vec::with_capacity(argv.len() + 1);
                        new_argv.push(Obj::from_string("unknown"));
                        new_argv.extend(argv);
                        argv = new_argv;
                        let result = self.invoke(frame, r, &argv);
                        match result {
                            Err(Signal::Eval(next)) => {
                                argv = next;
                                continue;
                            }
                            other => return other,
                        }
                    }
                    None => {
                        self.set_error(format!("invalid command name \"{}\"", name));
                        return Err(Signal::Error);
                    }
                },
            };
            let result = self.invoke(frame, record, &argv);
            match result {
                Err(Signal::Eval(next)) => {
                    argv = next;
                    continue;
                }
                other => return other,
            }
        }
    }

    fn invoke(&mut self, frame: &CallFrame, record: CommandRecord, argv: &[Obj]) -> Flow {
        match record {
            CommandRecord::Native(f) => f.call(self, argv),
            CommandRecord::Procedure(def) => {
                let _ = frame;
                self.call_proc(def, argv.to_vec())
            }
        }
    }

    /// The `proc` call machinery (§4.8): arity checking (including the
    /// `args` catch-all and `&name` auto-upvar parameters), frame
    /// allocation, formal binding, body evaluation, and converting an
    /// unwinding `RETURN` into this call's result once `level` reaches 0.
    pub(crate) fn call_proc(&mut self, def: Rc<ProcDef>, argv: Vec<Obj>) -> Flow {
        let _span = tracing::debug_span!("call_proc", proc = %def.name, depth = self.frame_depth()).entered();
        let caller_frame = self.current_frame();
        let args = &argv[1..];
        let mut bindings: Vec<(Rc<str>, Obj)> = Vec::new();
        let mut links: Vec<(Rc<str>, Rc<str>)> = Vec::new();
        let mut idx = 0usize;

        for (i, param) in def.params.iter().enumerate() {
            let is_tail_args = def.has_args_tail && i + 1 == def.params.len() && param.name.as_ref() == "args";
            if is_tail_args {
                let rest: Vec<Obj> = args[idx.min(args.len())..].to_vec();
                idx = args.len();
                bindings.push((param.name.clone(), Obj::from_list(rest)));
                continue;
            }
            let value = if idx < args.len() {
                let v = args[idx].clone();
                idx += 1;
                Some(v)
            } else {
                param.default.clone()
            };
            let value = match value {
                Some(v) => v,
                None => {
                    self.set_error(format!("wrong # args: no value for parameter \"{}\" to \"{}\"", param.name, def.name));
                    return Err(Signal::Error);
                }
            };
            if param.by_ref {
                links.push((param.name.clone(), Rc::from(value.to_str().as_ref())));
            } else {
                bindings.push((param.name.clone(), value));
            }
        }
        if idx < args.len() && !def.has_args_tail {
            self.set_error(format!("wrong # args: too many arguments to \"{}\"", def.name));
            return Err(Signal::Error);
        }

        let frame = match self.push_frame(Some(def.name.clone()), Rc::from("<proc>"), argv.clone()) {
            Ok(f) => f,
            Err(e) => return Err(self.error_signal(e)),
        };
        for (name, value) in bindings {
            let _ = self.set_var(&frame, &name, value);
        }
        for (name, target_name) in links {
            if let Err(e) = self.link_var(&frame, &name, &caller_frame, &target_name) {
                self.pop_frame();
                return Err(self.error_signal(e));
            }
        }

        let shape = match self.compiled_shape(&def.body) {
            Ok(s) => s,
            Err(e) => {
                self.pop_frame();
                return Err(self.error_signal(e));
            }
        };
        let call_line = caller_frame.borrow().line;
        let result = self.eval_shape(&frame, &shape);
        self.pop_frame();

        match result {
            Err(Signal::Return { level, code }) => {
                if level == 0 {
                    Ok(self.result())
                } else {
                    Err(Signal::Return { level: level - 1, code })
                }
            }
            Err(Signal::Error) => {
                // §7: a procedure returning ERR appends a stack-trace frame
                // on its way out, merged into the innermost recorded frame
                // rather than duplicated when the error "originated in the
                // same file". Every proc body here is compiled from inline
                // script text rather than a loaded file, so that condition
                // always holds — each level up just overwrites the one
                // frame with its own call site instead of growing a list.
                if let Some(last) = self.error_stack.last_mut() {
                    last.proc_name = def.name.to_string();
                    last.line = call_line;
                } else {
                    self.push_trace(TraceFrame { proc_name: def.name.to_string(), file: "<proc>".to_string(), line: call_line });
                }
                Err(Signal::Error)
            }
            other => other,
        }
    }
}

/// Evaluate an `expr`-style source string against `frame` (shared by the
/// `expr` command and by control-flow commands like `if`/`while` that
/// take a boolean condition operand).
pub(crate) fn eval_expr_in_frame(interp: &mut Interp, frame: &CallFrame, source: &str) -> Flow {
    let program = match expr::compile_expr(source) {
        Ok(p) => p,
        Err(e) => return Err(interp.error_signal(e)),
    };
    let mut ctx = InterpExprCtx { interp, frame: frame.clone() };
    expr::eval_expr(&program, &mut ctx).map_err(|e| ctx.interp.error_signal(e))
}

/// Bridges the expression VM's variable/command hooks to the running
/// interpreter's frame and evaluator (§4.5 `$var`/`[cmd]` operands).
struct InterpExprCtx<'a> {
    interp: &'a mut Interp,
    frame: CallFrame,
}

impl<'a> ExprEvalContext for InterpExprCtx<'a> {
    fn get_var(&mut self, name: &str) -> crate::error::Result<Obj> {
        self.interp.get_var(&self.frame, name)
    }

    fn eval_command(&mut self, script: &str) -> crate::error::Result<Obj> {
        match self.interp.eval_script_source(&self.frame, script) {
            Ok(v) => Ok(v),
            Err(_signal) => Err(InterpError::ApiMisuse(self.interp.result().to_str().into_owned())),
        }
    }
}

fn strip_var_sigil(text: &str) -> String {
    if let Some(rest) = text.strip_prefix("${") {
        rest.strip_suffix('}').unwrap_or(rest).to_string()
    } else {
        text.strip_prefix('$').unwrap_or(text).to_string()
    }
}

/// Split a `DictSugar` token's text (`name(key)`) into the variable base
/// name and the raw (not-yet-substituted) key source.
fn split_dict_sugar(text: &str) -> (&str, &str) {
    match text.find('(') {
        Some(open) if text.ends_with(')') => (&text[..open], &text[open + 1..text.len() - 1]),
        _ => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::InterpOptions;

    #[test]
    fn set_then_read_variable() {
        let mut interp = Interp::new(InterpOptions::default());
        interp.create_command("set", |interp: &mut Interp, args: &[Obj]| -> Flow {
            let frame = interp.current_frame();
            if args.len() == 3 {
                interp.set_var(&frame, &args[1].to_str(), args[2].clone()).map_err(|e| {
                    interp.set_error(e.to_string());
                    Signal::Error
                })?;
            }
            let frame = interp.current_frame();
            interp.get_var(&frame, &args[1].to_str()).map_err(|e| {
                interp.set_error(e.to_string());
                Signal::Error
            })
        });
        let result = interp.eval_str("set x 5").unwrap();
        assert_eq!(result.as_int(), Some(5));
    }

    #[test]
    fn literal_script_with_no_commands_returns_empty() {
        let mut interp = Interp::new(InterpOptions::default());
        let result = interp.eval_str("\n\n").unwrap();
        assert_eq!(result.to_str(), "");
    }

    #[test]
    fn unknown_command_without_fallback_errors() {
        let mut interp = Interp::new(InterpOptions::default());
        assert!(interp.eval_str("nosuchcommand").is_err());
    }
}

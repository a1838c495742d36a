//! Error taxonomy
//!
//! Two distinct error universes exist in this crate, matching the
//! distinction the spec draws in its error-handling design (see root
//! docs, "Error Handling Design"):
//!
//! - [`InterpError`]: host-level failures. These are "can't even start
//!   evaluating" problems — malformed embedding-API calls, invalid UTF-8
//!   at a source-text boundary, or an internal invariant violation. They
//!   are real Rust errors and use `thiserror`, matching the teacher
//!   crate's dependency on it.
//! - [`Signal`]: the language's own non-local control flow. A running
//!   script can complete with `ERR`, `RETURN`, `BREAK`, `CONTINUE`,
//!   `SIGNAL`, or `EXIT`; the evaluator threads these uniformly as the
//!   `Err` arm of [`Flow`] so every call site handles them the same way
//!   a `catch -code all` would.

use crate::obj::Obj;
use std::fmt;

pub type Result<T> = std::result::Result<T, InterpError>;

/// Host-level failure: something the embedding API or an internal
/// invariant check rejected outright, as opposed to a scripted `error`.
#[derive(Debug, thiserror::Error)]
pub enum InterpError {
    #[error("source text is not valid UTF-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("invalid embedding API usage: {0}")]
    ApiMisuse(String),
    #[error("internal invariant violated: {0}")]
    Internal(String),
    #[error("recursion limit exceeded (max nesting depth {limit})")]
    RecursionLimit { limit: u32 },
}

/// The six return codes the evaluator propagates, plus the internal
/// `EVAL` code used only to implement `tailcall` (never observable by
/// scripts; `info returncodes` never lists it). Numeric values match the
/// stable ordering spec.md §9 Open Questions calls out as observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Code {
    Ok = 0,
    Error = 1,
    Return = 2,
    Break = 3,
    Continue = 4,
    Signal = 5,
    Exit = 6,
    Eval = 7,
}

impl Code {
    pub fn from_i64(n: i64) -> Option<Code> {
        Some(match n {
            0 => Code::Ok,
            1 => Code::Error,
            2 => Code::Return,
            3 => Code::Break,
            4 => Code::Continue,
            5 => Code::Signal,
            6 => Code::Exit,
            7 => Code::Eval,
            _ => return None,
        })
    }

    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            Code::Ok => "ok",
            Code::Error => "error",
            Code::Return => "return",
            Code::Break => "break",
            Code::Continue => "continue",
            Code::Signal => "signal",
            Code::Exit => "exit",
            Code::Eval => "eval",
        }
    }

    /// Bit for a `catch -code` selector mask (§7 recovery policy).
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One stack-trace frame: `(procname, file, line)`, appended as an
/// `ERR` unwinds through procedure boundaries (§7 propagation policy).
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub proc_name: String,
    pub file: String,
    pub line: u32,
}

/// Non-local control flow. This is the `Err` arm of [`Flow`]; `Ok`
/// carries the command result the same way a normal return value would.
#[derive(Debug, Clone)]
pub enum Signal {
    /// `ERR`. The interpreter's result/errorCode/stack-trace fields hold
    /// the detail; this variant itself carries nothing so that
    /// `catch`-driven retries can re-run without cloning a payload.
    Error,
    /// `RETURN`. `level` is the number of enclosing call frames left to
    /// unwind before this converts to `code` (§4.7); `code` is the
    /// *stored* completion code from `return -code`.
    Return { level: u32, code: Code },
    Break,
    Continue,
    /// `SIGNAL`, carrying the signal mask a `catch -signal` will record.
    SignalCaught { mask: u32 },
    /// `EXIT`, carrying the process exit status.
    Exit(i32),
    /// Internal `EVAL`: the tail-called argv to re-dispatch (§4.7, §9
    /// "Coroutine / suspension control flow"). Never escapes
    /// [`crate::eval::Evaluator::eval_obj`].
    Eval(Vec<Obj>),
}

impl Signal {
    pub fn code(&self) -> Code {
        match self {
            Signal::Error => Code::Error,
            Signal::Return { code, .. } => *code,
            Signal::Break => Code::Break,
            Signal::Continue => Code::Continue,
            Signal::SignalCaught { .. } => Code::Signal,
            Signal::Exit(_) => Code::Exit,
            Signal::Eval(_) => Code::Eval,
        }
    }
}

/// Result type for anything that executes script or expression code:
/// either a plain result [`Obj`], or a [`Signal`] unwinding the stack.
pub type Flow = std::result::Result<Obj, Signal>;

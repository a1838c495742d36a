//! The parser (§4.1, §4.2): a single tokeniser driven by context
//! (script / list / expr / subst), producing a reusable token stream
//! that the script compiler, expression compiler, and subst engine each
//! consume differently.

pub mod escape;
pub mod expr_lexer;
mod lexer;

use std::rc::Rc;

/// Token types emitted by the script-mode tokeniser (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Literal text with no escape processing needed.
    Str,
    /// Literal text that needs backslash-escape substitution (§4.1
    /// "Escape substitution").
    Esc,
    /// `$name` / `${name}`.
    Var,
    /// `$v(k)` array-sugar reference.
    DictSugar,
    /// `$(...)` expression substitution.
    ExprSugar,
    /// `[...]` nested command.
    Cmd,
    /// Word separator (space/tab run).
    Sep,
    /// End of command (newline or `;`).
    Eol,
    Eof,
}

/// One token: a slice of the source text plus its type and source line.
#[derive(Debug, Clone)]
pub struct Token {
    pub text: Rc<str>,
    pub kind: TokenType,
    pub line: u32,
}

impl Token {
    pub fn new(text: impl Into<Rc<str>>, kind: TokenType, line: u32) -> Self {
        Token { text: text.into(), kind, line }
    }
}

/// What, if anything, is unclosed at EOF: `Complete`, or the character
/// that opened an unterminated group together with its start line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Complete,
    Brace(u32),
    Quote(u32),
    Bracket(u32),
}

/// Tokeniser state (§4.1): which quoting context the cursor is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Default,
    InsideQuote,
    DictSugar,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub line: u32,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (line {})", self.message, self.line)
    }
}
impl std::error::Error for ParseError {}

pub use lexer::Parser;

/// Parse an entire script into a flat token list (§4.2). This is the
/// entry point the script compiler (`crate::compile`) and subst engine
/// consume; it is produced once per parse pass and then discarded.
pub fn tokenize_script(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut p = Parser::new(source);
    let mut out = Vec::new();
    loop {
        let tok = p.next_token()?;
        let eof = tok.kind == TokenType::Eof;
        out.push(tok);
        if eof {
            break;
        }
    }
    Ok(out)
}

/// Parse a script for the subst engine: same tokeniser, but the flags
/// select which substitution kinds are suppressed (§4.4). Suppressed
/// kinds are re-tagged as `Str` so the evaluator treats them literally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstFlags {
    pub no_var: bool,
    pub no_cmd: bool,
    pub no_esc: bool,
}

pub fn tokenize_subst(source: &str, flags: SubstFlags) -> Result<Vec<Token>, ParseError> {
    let mut toks = tokenize_script(source)?;
    for t in toks.iter_mut() {
        let suppress = match t.kind {
            TokenType::Var | TokenType::DictSugar | TokenType::ExprSugar => flags.no_var,
            TokenType::Cmd => flags.no_cmd,
            TokenType::Esc => flags.no_esc,
            _ => false,
        };
        if suppress {
            t.kind = TokenType::Str;
        }
    }
    Ok(toks)
}

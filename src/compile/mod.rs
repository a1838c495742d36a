//! The script compiler (§4.3): turns the flat token stream from
//! `crate::parser` into a [`ScriptShape`] — lines of words, each word a
//! run of tokens to interpolate together — so the evaluator never has
//! to re-tokenise the same script body (a loop, a `proc` body) on every
//! pass.

use crate::parser::{tokenize_script, tokenize_subst, ParseError, SubstFlags, Token, TokenType};
use std::cell::Cell;
use std::rc::Rc;

/// One word within a command line: the tokens that, interpolated and
/// concatenated, produce the word's value.
#[derive(Debug, Clone)]
pub struct CompiledWord {
    pub tokens: Vec<Token>,
    /// Marks a `{*}`-prefixed word: at eval time its value is split as a
    /// list and spliced into the argument vector in place of the single
    /// word (§4.7 "`{*}` expansion"), rather than encoding this as a
    /// negative word count the way the reference design does — a plain
    /// bool is the idiomatic Rust shape for a binary per-word flag.
    pub expand: bool,
}

/// One command line (a sequence of words, separated by `;` or a
/// newline).
#[derive(Debug, Clone)]
pub struct CompiledLine {
    pub words: Vec<CompiledWord>,
    pub line: u32,
}

/// A compiled script body. Cached inside an `Obj`'s `Script` internal
/// representation (§3.1) so a `proc` body or loop body is tokenised and
/// shaped once no matter how many times it runs.
pub struct ScriptShape {
    pub source: Rc<str>,
    pub lines: Vec<CompiledLine>,
    /// Shimmer-protection counter: incremented while the evaluator is
    /// actively walking this shape, so a command invoked from within it
    /// (e.g. one that reassigns the variable holding this script to a
    /// different value) can't free the shape out from under the walk.
    /// `Obj` owns the shape via `Rc`, so "can't free" is automatic; this
    /// counter exists only so `eval` can assert re-entrant use is
    /// balanced, not to keep the value alive.
    in_use: Cell<u32>,
}

impl ScriptShape {
    #[tracing::instrument(level = "trace", skip(source), fields(len = source.len()))]
    pub fn compile(source: &str) -> Result<ScriptShape, ParseError> {
        let tokens = tokenize_script(source)?;
        let mut lines = Vec::new();
        let mut words: Vec<CompiledWord> = Vec::new();
        let mut current: Vec<Token> = Vec::new();
        let mut line_start = 1u32;

        let flush_word = |current: &mut Vec<Token>, words: &mut Vec<CompiledWord>| {
            if current.is_empty() {
                return;
            }
            let expand = is_expand_marker(current);
            words.push(CompiledWord { tokens: std::mem::take(current), expand });
        };

        for tok in tokens {
            match tok.kind {
                TokenType::Sep => {
                    flush_word(&mut current, &mut words);
                }
                TokenType::Eol | TokenType::Eof => {
                    flush_word(&mut current, &mut words);
                    if !words.is_empty() {
                        lines.push(CompiledLine { words: std::mem::take(&mut words), line: line_start });
                    }
                    line_start = tok.line + 1;
                    if tok.kind == TokenType::Eof {
                        break;
                    }
                }
                _ => {
                    if current.is_empty() {
                        line_start = line_start.min(tok.line).max(tok.line);
                    }
                    current.push(tok);
                }
            }
        }
        flush_word(&mut current, &mut words);
        if !words.is_empty() {
            lines.push(CompiledLine { words, line: line_start });
        }

        Ok(ScriptShape { source: Rc::from(source), lines, in_use: Cell::new(0) })
    }

    pub fn begin_use(&self) {
        self.in_use.set(self.in_use.get() + 1);
    }

    pub fn end_use(&self) {
        debug_assert!(self.in_use.get() > 0);
        self.in_use.set(self.in_use.get().saturating_sub(1));
    }

    pub fn in_use(&self) -> u32 {
        self.in_use.get()
    }
}

/// Compile a `subst` body (§4.4): unlike a script, a `subst` operand is
/// one run of tokens interpolated and concatenated directly, with no
/// line/word structure and with the `-novariables`/`-nocommands`/
/// `-noescapes` flags selecting which substitution kinds are suppressed
/// ahead of evaluation rather than checked at each token.
pub fn compile_subst(source: &str, flags: SubstFlags) -> Result<Vec<Token>, ParseError> {
    tokenize_subst(source, flags)
}

/// A word is a `{*}` expansion marker when its first token is a literal
/// `*` produced by a brace group (i.e. the source wrote `{*}`) and more
/// is glued on immediately after with no separator.
fn is_expand_marker(tokens: &[Token]) -> bool {
    if tokens.len() < 2 {
        return false;
    }
    matches!(tokens[0].kind, TokenType::Str) && &*tokens[0].text == "*"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_command_one_line() {
        let shape = ScriptShape::compile("set x 1").unwrap();
        assert_eq!(shape.lines.len(), 1);
        assert_eq!(shape.lines[0].words.len(), 3);
    }

    #[test]
    fn multiple_lines_split_on_semicolon_and_newline() {
        let shape = ScriptShape::compile("set x 1; set y 2\nset z 3").unwrap();
        assert_eq!(shape.lines.len(), 3);
    }

    #[test]
    fn blank_lines_produce_no_command() {
        let shape = ScriptShape::compile("\n\nset x 1\n\n").unwrap();
        assert_eq!(shape.lines.len(), 1);
    }

    #[test]
    fn expand_marker_detected() {
        let shape = ScriptShape::compile("foo {*}$args").unwrap();
        assert_eq!(shape.lines[0].words.len(), 2);
        assert!(shape.lines[0].words[1].expand);
    }

    #[test]
    fn in_use_counter_balances() {
        let shape = ScriptShape::compile("set x 1").unwrap();
        shape.begin_use();
        shape.begin_use();
        assert_eq!(shape.in_use(), 2);
        shape.end_use();
        shape.end_use();
        assert_eq!(shape.in_use(), 0);
    }
}

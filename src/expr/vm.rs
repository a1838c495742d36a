//! Expression VM (§4.5.3): a stack machine interpreting the flat
//! [`super::opcodes::Opcode`] stream compiled by [`super::compiler`].

use super::opcodes::{Func, Opcode};
use crate::error::{InterpError, Result};
use crate::obj::numeric::Number;
use crate::obj::Obj;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::cell::RefCell;

/// Host hooks an expression needs to read variables and run embedded
/// commands (the `$var` and `[cmd]` leaves of the grammar). The VM is
/// generic over this trait so `src/expr` has no dependency on
/// `src/interp` — the interpreter implements it against its own frame
/// and command-dispatch machinery.
pub trait ExprEvalContext {
    fn get_var(&mut self, name: &str) -> Result<Obj>;
    fn eval_command(&mut self, script: &str) -> Result<Obj>;
}

pub fn run(ops: &[Opcode], ctx: &mut dyn ExprEvalContext) -> Result<Obj> {
    let mut stack: Vec<Obj> = Vec::with_capacity(8);
    let mut pc = 0usize;
    while pc < ops.len() {
        match &ops[pc] {
            Opcode::PushInt(n) => stack.push(Obj::from_int(*n)),
            Opcode::PushDouble(n) => stack.push(Obj::from_double(*n)),
            Opcode::PushStr(s) => stack.push(Obj::from_rc_str(s.clone())),
            Opcode::PushVar(name) => stack.push(ctx.get_var(name)?),
            Opcode::PushCmd(src) => stack.push(ctx.eval_command(src)?),

            Opcode::Neg => unary_num(&mut stack, |n| match n {
                Number::Int(i) => i.checked_neg().map(Number::Int).ok_or_else(overflow),
                Number::Double(d) => Ok(Number::Double(-d)),
            })?,
            Opcode::Pos => { /* no-op beyond numeric coercion, already validated by peek */
                let top = stack.last().ok_or_else(underflow)?;
                num_of(top)?;
            }
            Opcode::Not => {
                let v = pop(&mut stack)?;
                let b = v.as_bool_expr().ok_or_else(|| not_boolean(&v))?;
                stack.push(Obj::from_bool(!b));
            }
            Opcode::BitNot => unary_num(&mut stack, |n| match n {
                Number::Int(i) => Ok(Number::Int(!i)),
                Number::Double(_) => Err(InterpError::ApiMisuse("~ requires an integer operand".into())),
            })?,

            Opcode::Add => binary_num(&mut stack, |a, b| numeric_arith(a, b, |x, y| x.checked_add(y), |x, y| x + y))?,
            Opcode::Sub => binary_num(&mut stack, |a, b| numeric_arith(a, b, |x, y| x.checked_sub(y), |x, y| x - y))?,
            Opcode::Mul => binary_num(&mut stack, |a, b| numeric_arith(a, b, |x, y| x.checked_mul(y), |x, y| x * y))?,
            Opcode::Div => binary_num(&mut stack, div)?,
            Opcode::Rem => binary_num(&mut stack, rem)?,
            Opcode::Pow => binary_num(&mut stack, pow)?,

            Opcode::Shl => binary_int(&mut stack, |a, b| Ok(a.checked_shl(b as u32).unwrap_or(0)))?,
            Opcode::Shr => binary_int(&mut stack, |a, b| Ok(a.checked_shr(b as u32).unwrap_or(if a < 0 { -1 } else { 0 })))?,
            Opcode::RotL => binary_int(&mut stack, |a, b| Ok(a.rotate_left((b as u32) & 63)))?,
            Opcode::RotR => binary_int(&mut stack, |a, b| Ok(a.rotate_right((b as u32) & 63)))?,

            Opcode::Lt => compare(&mut stack, |o| o == std::cmp::Ordering::Less)?,
            Opcode::Le => compare(&mut stack, |o| o != std::cmp::Ordering::Greater)?,
            Opcode::Gt => compare(&mut stack, |o| o == std::cmp::Ordering::Greater)?,
            Opcode::Ge => compare(&mut stack, |o| o != std::cmp::Ordering::Less)?,
            Opcode::NumEq => compare(&mut stack, |o| o == std::cmp::Ordering::Equal)?,
            Opcode::NumNe => compare(&mut stack, |o| o != std::cmp::Ordering::Equal)?,

            Opcode::StrEq => binary_str(&mut stack, |a, b| a == b)?,
            Opcode::StrNe => binary_str(&mut stack, |a, b| a != b)?,
            Opcode::StrIn => str_in(&mut stack, true)?,
            Opcode::StrNi => str_in(&mut stack, false)?,

            Opcode::BitAnd => binary_int(&mut stack, |a, b| Ok(a & b))?,
            Opcode::BitXor => binary_int(&mut stack, |a, b| Ok(a ^ b))?,
            Opcode::BitOr => binary_int(&mut stack, |a, b| Ok(a | b))?,

            Opcode::ToBool => {
                let v = pop(&mut stack)?;
                let b = v.as_bool_expr().ok_or_else(|| not_boolean(&v))?;
                stack.push(Obj::from_bool(b));
            }

            Opcode::Jump(target) => {
                pc = *target;
                continue;
            }
            Opcode::JumpIfFalse(target) => {
                let v = pop(&mut stack)?;
                let b = v.as_bool_expr().ok_or_else(|| not_boolean(&v))?;
                if !b {
                    pc = *target;
                    continue;
                }
            }
            Opcode::JumpIfTrue(target) => {
                let v = pop(&mut stack)?;
                let b = v.as_bool_expr().ok_or_else(|| not_boolean(&v))?;
                if b {
                    pc = *target;
                    continue;
                }
            }

            Opcode::Call(func, argc) => call_func(&mut stack, *func, *argc)?,
        }
        pc += 1;
    }
    if stack.len() != 1 {
        return Err(InterpError::Internal(format!("expression VM ended with {} values on the stack", stack.len())));
    }
    Ok(stack.pop().unwrap())
}

fn underflow() -> InterpError {
    InterpError::Internal("expression stack underflow".into())
}

fn overflow() -> InterpError {
    InterpError::ApiMisuse("integer overflow in expression".into())
}

fn not_boolean(o: &Obj) -> InterpError {
    InterpError::ApiMisuse(format!("expected boolean value, got \"{}\"", o.to_str()))
}

fn not_numeric(o: &Obj) -> InterpError {
    InterpError::ApiMisuse(format!("expected numeric value, got \"{}\"", o.to_str()))
}

fn pop(stack: &mut Vec<Obj>) -> Result<Obj> {
    stack.pop().ok_or_else(underflow)
}

fn num_of(o: &Obj) -> Result<Number> {
    if let Some(n) = o.as_int() {
        return Ok(Number::Int(n));
    }
    if let Some(d) = o.as_double() {
        return Ok(Number::Double(d));
    }
    Err(not_numeric(o))
}

fn unary_num(stack: &mut Vec<Obj>, f: impl FnOnce(Number) -> Result<Number>) -> Result<()> {
    let v = pop(stack)?;
    let n = num_of(&v)?;
    let r = f(n)?;
    stack.push(number_to_obj(r));
    Ok(())
}

fn binary_num(stack: &mut Vec<Obj>, f: impl FnOnce(Number, Number) -> Result<Number>) -> Result<()> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    let na = num_of(&a)?;
    let nb = num_of(&b)?;
    let r = f(na, nb)?;
    stack.push(number_to_obj(r));
    Ok(())
}

fn binary_int(stack: &mut Vec<Obj>, f: impl FnOnce(i64, i64) -> Result<i64>) -> Result<()> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    let ia = a.as_int().ok_or_else(|| not_numeric(&a))?;
    let ib = b.as_int().ok_or_else(|| not_numeric(&b))?;
    let r = f(ia, ib)?;
    stack.push(Obj::from_int(r));
    Ok(())
}

fn binary_str(stack: &mut Vec<Obj>, f: impl FnOnce(&str, &str) -> bool) -> Result<()> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    let r = f(&a.to_str(), &b.to_str());
    stack.push(Obj::from_bool(r));
    Ok(())
}

fn str_in(stack: &mut Vec<Obj>, want_member: bool) -> Result<()> {
    let list_obj = pop(stack)?;
    let needle = pop(stack)?;
    let items = crate::obj::list::parse_list(&list_obj.to_str())
        .ok_or_else(|| InterpError::ApiMisuse("invalid list in 'in'/'ni' operand".into()))?;
    let needle_str = needle.to_str();
    let found = items.iter().any(|item| item.to_str() == needle_str);
    stack.push(Obj::from_bool(found == want_member));
    Ok(())
}

fn compare(stack: &mut Vec<Obj>, accept: impl FnOnce(std::cmp::Ordering) -> bool) -> Result<()> {
    let b = pop(stack)?;
    let a = pop(stack)?;
    let na = num_of(&a)?;
    let nb = num_of(&b)?;
    let ord = match (na, nb) {
        (Number::Int(x), Number::Int(y)) => x.cmp(&y),
        _ => {
            let x = to_f64(na);
            let y = to_f64(nb);
            x.partial_cmp(&y).ok_or_else(|| InterpError::ApiMisuse("comparison involving NaN".into()))?
        }
    };
    stack.push(Obj::from_bool(accept(ord)));
    Ok(())
}

fn to_f64(n: Number) -> f64 {
    match n {
        Number::Int(i) => i as f64,
        Number::Double(d) => d,
    }
}

fn number_to_obj(n: Number) -> Obj {
    match n {
        Number::Int(i) => Obj::from_int(i),
        Number::Double(d) => Obj::from_double(d),
    }
}

fn numeric_arith(a: Number, b: Number, int_op: impl FnOnce(i64, i64) -> Option<i64>, float_op: impl FnOnce(f64, f64) -> f64) -> Result<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x, y).map(Number::Int).ok_or_else(overflow),
        _ => Ok(Number::Double(float_op(to_f64(a), to_f64(b)))),
    }
}

/// Floored division: quotient rounds toward negative infinity and the
/// remainder takes the divisor's sign (Tcl-compatible), unlike
/// `div_euclid`/`rem_euclid`'s remainder-always-non-negative rule. E.g.
/// `7 / -3` floors to `-3` with remainder `-2`, not Euclidean's `-2`/`1`.
fn floored_divmod(x: i64, y: i64) -> (i64, i64) {
    let mut q = x / y;
    let mut r = x % y;
    if r != 0 && (r < 0) != (y < 0) {
        q -= 1;
        r += y;
    }
    (q, r)
}

fn div(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            if y == 0 {
                return Err(InterpError::ApiMisuse("divide by zero".into()));
            }
            let (q, _) = floored_divmod(x, y);
            Ok(Number::Int(q))
        }
        _ => {
            let y = to_f64(b);
            if y == 0.0 {
                // spec.md:169 — double division by zero yields signed
                // infinity rather than an error.
                return Ok(Number::Double(if to_f64(a) >= 0.0 { f64::INFINITY } else { f64::NEG_INFINITY }));
            }
            Ok(Number::Double(to_f64(a) / y))
        }
    }
}

fn rem(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            if y == 0 {
                return Err(InterpError::ApiMisuse("divide by zero".into()));
            }
            let (_, r) = floored_divmod(x, y);
            Ok(Number::Int(r))
        }
        _ => Err(InterpError::ApiMisuse("% requires integer operands".into())),
    }
}

fn pow(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) if y >= 0 => {
            let mut result: i64 = 1;
            let mut base = x;
            let mut exp = y as u64;
            while exp > 0 {
                if exp & 1 == 1 {
                    result = result.checked_mul(base).ok_or_else(overflow)?;
                }
                exp >>= 1;
                if exp > 0 {
                    base = base.checked_mul(base).ok_or_else(overflow)?;
                }
            }
            Ok(Number::Int(result))
        }
        _ => Ok(Number::Double(to_f64(a).powf(to_f64(b)))),
    }
}

thread_local! {
    // Seeded with a fixed constant rather than OS entropy so an
    // un-`srand`-ed interpreter still behaves deterministically run to
    // run, matching the reference's fixed default seed.
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0x2545_F491_4F6C_DD1D));
}

fn next_rand_f64() -> f64 {
    RNG.with(|r| r.borrow_mut().gen::<f64>())
}

fn call_func(stack: &mut Vec<Obj>, func: Func, argc: usize) -> Result<()> {
    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        args.push(pop(stack)?);
    }
    args.reverse();
    let result = match func {
        Func::Int => {
            let n = num_of(&args[0])?;
            Obj::from_int(to_f64(n).trunc() as i64)
        }
        Func::Double => Obj::from_coerced_double(to_f64(num_of(&args[0])?)),
        Func::Abs => match num_of(&args[0])? {
            Number::Int(i) => Obj::from_int(i.checked_abs().ok_or_else(overflow)?),
            Number::Double(d) => Obj::from_double(d.abs()),
        },
        Func::Round => Obj::from_int(to_f64(num_of(&args[0])?).round() as i64),
        Func::Rand => Obj::from_double(next_rand_f64()),
        Func::Srand => {
            let seed = args[0].as_int().ok_or_else(|| not_numeric(&args[0]))?;
            RNG.with(|r| *r.borrow_mut() = StdRng::seed_from_u64(seed as u64));
            Obj::from_double(next_rand_f64())
        }
        Func::Sin => Obj::from_double(to_f64(num_of(&args[0])?).sin()),
        Func::Cos => Obj::from_double(to_f64(num_of(&args[0])?).cos()),
        Func::Tan => Obj::from_double(to_f64(num_of(&args[0])?).tan()),
        Func::Asin => Obj::from_double(to_f64(num_of(&args[0])?).asin()),
        Func::Acos => Obj::from_double(to_f64(num_of(&args[0])?).acos()),
        Func::Atan => Obj::from_double(to_f64(num_of(&args[0])?).atan()),
        Func::Sinh => Obj::from_double(to_f64(num_of(&args[0])?).sinh()),
        Func::Cosh => Obj::from_double(to_f64(num_of(&args[0])?).cosh()),
        Func::Tanh => Obj::from_double(to_f64(num_of(&args[0])?).tanh()),
        Func::Ceil => Obj::from_double(to_f64(num_of(&args[0])?).ceil()),
        Func::Floor => Obj::from_double(to_f64(num_of(&args[0])?).floor()),
        Func::Exp => Obj::from_double(to_f64(num_of(&args[0])?).exp()),
        Func::Log => Obj::from_double(to_f64(num_of(&args[0])?).ln()),
        Func::Log10 => Obj::from_double(to_f64(num_of(&args[0])?).log10()),
        Func::Sqrt => Obj::from_double(to_f64(num_of(&args[0])?).sqrt()),
    };
    stack.push(result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::compiler::compile;

    struct NoVars;
    impl ExprEvalContext for NoVars {
        fn get_var(&mut self, name: &str) -> Result<Obj> {
            Err(InterpError::ApiMisuse(format!("no such variable: {}", name)))
        }
        fn eval_command(&mut self, _script: &str) -> Result<Obj> {
            Err(InterpError::ApiMisuse("no command evaluation in this context".into()))
        }
    }

    fn eval(src: &str) -> Obj {
        let ops = compile(src).unwrap();
        run(&ops, &mut NoVars).unwrap()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("1 + 2 * 3").as_int(), Some(7));
        assert_eq!(eval("(1 + 2) * 3").as_int(), Some(9));
    }

    #[test]
    fn integer_division_floors() {
        assert_eq!(eval("-7 / 2").as_int(), Some(-4));
    }

    #[test]
    fn negative_divisor_uses_floored_not_euclidean_division() {
        // Tcl-compatible floored division/remainder: the quotient rounds
        // toward negative infinity and `%` takes the divisor's sign,
        // unlike Euclidean div/rem which keeps the remainder >= 0.
        assert_eq!(eval("7 / -3").as_int(), Some(-3));
        assert_eq!(eval("7 % -3").as_int(), Some(-2));
        assert_eq!(eval("-7 % 3").as_int(), Some(2));
    }

    #[test]
    fn double_division_by_zero_yields_signed_infinity() {
        assert_eq!(eval("1.0 / 0").as_double(), Some(f64::INFINITY));
        assert_eq!(eval("-1.0 / 0").as_double(), Some(f64::NEG_INFINITY));
    }

    #[test]
    fn ternary_and_short_circuit() {
        assert_eq!(eval("1 ? 10 : 20").as_int(), Some(10));
        assert_eq!(eval("0 ? 10 : 20").as_int(), Some(20));
        assert_eq!(eval("1 || (1/0)").as_int(), Some(1));
        assert_eq!(eval("0 && (1/0)").as_int(), Some(0));
    }

    #[test]
    fn string_eq_and_in() {
        assert_eq!(eval("\"abc\" eq \"abc\"").as_int(), Some(1));
        assert_eq!(eval("\"x\" in {a b x}").as_int(), Some(1));
        assert_eq!(eval("\"y\" ni {a b x}").as_int(), Some(1));
    }

    #[test]
    fn power_right_assoc_value() {
        assert_eq!(eval("2 ** 3 ** 2").as_int(), Some(512));
    }

    #[test]
    fn divide_by_zero_errors() {
        let ops = compile("1 / 0").unwrap();
        assert!(run(&ops, &mut NoVars).is_err());
    }
}

//! Integration tests against the embedding API (§6), one per literal
//! end-to-end scenario (§8).

use mintcl::api;

#[test]
fn arithmetic_with_variable_substitution() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, "set x 5").unwrap();
    let result = api::eval(&mut interp, "expr {$x * 2 + 3}").unwrap();
    assert_eq!(api::get_string(&result), "13");
}

#[test]
fn recursive_factorial() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, "proc fact n { expr {$n <= 1 ? 1 : $n * [fact [expr {$n-1}]]} }").unwrap();
    let result = api::eval(&mut interp, "fact 6").unwrap();
    assert_eq!(api::get_int(&result), Some(720));
}

#[test]
fn lappend_then_llength_and_string_form() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, "set L {1 2 3}").unwrap();
    api::eval(&mut interp, "lappend L 4 5").unwrap();
    let len = api::eval(&mut interp, "llength $L").unwrap();
    assert_eq!(api::get_int(&len), Some(5));
    let whole = api::eval(&mut interp, "set L").unwrap();
    assert_eq!(api::get_string(&whole), "1 2 3 4 5");
}

#[test]
fn dict_create_set_get_size() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, "set d [dict create a 1 b 2]").unwrap();
    api::eval(&mut interp, "dict set d c 3").unwrap();
    let b = api::eval(&mut interp, "dict get $d b").unwrap();
    assert_eq!(api::get_string(&b), "2");
    let size = api::eval(&mut interp, "dict size $d").unwrap();
    assert_eq!(api::get_int(&size), Some(3));
}

#[test]
fn catch_error_and_opts_code() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, r#"catch { error "boom" } msg opts"#).unwrap();
    let result = api::eval(&mut interp, "list $msg [dict get $opts -code]").unwrap();
    assert_eq!(api::get_string(&result), "boom 1");
}

#[test]
fn upvar_links_outer_variable() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, "proc outer {} { set v 10; inner }").unwrap();
    api::eval(&mut interp, "proc inner {} { upvar v w; incr w; set w }").unwrap();
    let result = api::eval(&mut interp, "outer").unwrap();
    assert_eq!(api::get_int(&result), Some(11));
}

#[test]
fn reference_handle_and_getref() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, "set r [ref hello tag {}]").unwrap();
    let len = api::eval(&mut interp, "string length $r").unwrap();
    assert_eq!(api::get_int(&len), Some(42));
    let value = api::eval(&mut interp, "getref $r").unwrap();
    assert_eq!(api::get_string(&value), "hello");
}

#[test]
fn brace_star_expansion_splices_args() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, "proc argc args { llength $args }").unwrap();
    let result = api::eval(&mut interp, "argc {*}{a b c} d").unwrap();
    assert_eq!(api::get_int(&result), Some(4));
}

#[test]
fn uncaught_error_populates_stack_trace() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, r#"proc boom {} { error "kaboom" }"#).unwrap();
    let outcome = api::eval(&mut interp, "boom");
    assert!(outcome.is_err());
    assert_eq!(api::get_string(&interp.result()), "kaboom");
    assert_eq!(interp.stack_trace().len(), 1);
    assert_eq!(interp.stack_trace()[0].proc_name.as_str(), "boom");
}

#[test]
fn wrong_arity_proc_call_reports_error() {
    let mut interp = api::create_interp();
    api::eval(&mut interp, "proc p {a {b 1} args} { list $a $b $args }").unwrap();
    assert!(api::eval(&mut interp, "p").is_err());
    let one = api::eval(&mut interp, "p x").unwrap();
    assert_eq!(api::get_string(&one), "x 1 {}");
    let three = api::eval(&mut interp, "p x y z").unwrap();
    assert_eq!(api::get_string(&three), "x y z");
}

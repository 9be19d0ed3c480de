//! Fixed built-in function table.
//!
//! The table is not user-extensible. Unrecognized names and arity
//! mismatches resolve to 0 at both compile time and run time; that is a
//! language rule, not an error path.

/// A built-in function signature.
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: usize,
}

/// All known built-ins.
pub const BUILTINS: &[Builtin] = &[
    Builtin { name: "multiply", arity: 2 },
    Builtin { name: "factorial", arity: 1 },
];

/// Look up a built-in by name.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// Evaluate a built-in call. Unknown names or wrong arity yield 0.
pub fn eval(name: &str, args: &[i64]) -> i64 {
    match (name, args) {
        ("multiply", [a, b]) => a.wrapping_mul(*b),
        ("factorial", [n]) => factorial(*n),
        _ => 0,
    }
}

/// Iterative factorial for `n >= 0`; negative input yields 0.
///
/// The product saturates instead of wrapping so large inputs stay
/// deterministic.
pub fn factorial(n: i64) -> i64 {
    if n < 0 {
        return 0;
    }
    let mut acc = 1i64;
    for i in 2..=n {
        acc = acc.saturating_mul(i);
    }
    acc
}

//! Lowering from the AST to linear three-address IR.
//!
//! Expressions evaluate left-to-right and every binary operation
//! materializes its result into a fresh temporary. Assignments bind the
//! final value of the right-hand side to the target via `mov` (or a
//! direct `const` when the value is a bare literal).

use super::{Inst, Name, Op, Operand};
use crate::builtins;
use crate::parser::{BinOp, Expr, Stmt};

/// Lower a parsed program to linear IR.
pub fn lower(program: &[Stmt]) -> Vec<Inst> {
    let mut builder = Builder::default();
    for stmt in program {
        builder.stmt(stmt);
    }
    builder.insts
}

#[derive(Default)]
struct Builder {
    insts: Vec<Inst>,
    next_temp: u32,
}

impl Builder {
    fn fresh(&mut self) -> Name {
        let t = Name::Temp(self.next_temp);
        self.next_temp += 1;
        t
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { name, value } => {
                let value = self.expr(value);
                self.insts.push(Inst::mov(Name::user(name), value));
            }
            Stmt::Print(value) => {
                let value = self.expr(value);
                self.insts.push(Inst::print(value));
            }
            Stmt::Call { callee, args } => {
                // evaluated for effect; the result temporary is dead
                let call = Expr::Call {
                    callee: callee.clone(),
                    args: args.clone(),
                };
                self.expr(&call);
            }
        }
    }

    fn expr(&mut self, expr: &Expr) -> Operand {
        match expr {
            Expr::Num(n) => Operand::Imm(*n),
            Expr::Var(name) => Operand::Var(Name::user(name)),
            Expr::Binary { op, lhs, rhs } => {
                let a = self.expr(lhs);
                let b = self.expr(rhs);
                let dest = self.fresh();
                let op = match op {
                    BinOp::Add => Op::Add,
                    BinOp::Sub => Op::Sub,
                    BinOp::Mul => Op::Mul,
                    BinOp::Div => Op::Div,
                };
                self.insts.push(Inst::binary(op, dest.clone(), a, b));
                Operand::Var(dest)
            }
            Expr::Call { callee, args } => self.call(callee, args),
        }
    }

    /// Resolve a call against the built-in table.
    ///
    /// `multiply` expands structurally to a `*`; `factorial` of a literal
    /// is evaluated at compile time, otherwise it survives as a `Call`.
    /// Unknown names or arity mismatches lower to `const 0` rather than
    /// failing the compile.
    fn call(&mut self, callee: &str, args: &[Expr]) -> Operand {
        let arity_ok = builtins::lookup(callee).map(|b| b.arity) == Some(args.len());
        if !arity_ok {
            log::debug!("call to `{}` with {} args does not resolve; lowering to 0", callee, args.len());
            let dest = self.fresh();
            self.insts.push(Inst::constant(dest.clone(), 0));
            return Operand::Var(dest);
        }

        let args: Vec<Operand> = args.iter().map(|a| self.expr(a)).collect();
        let dest = self.fresh();
        match (callee, args.as_slice()) {
            ("multiply", [a, b]) => {
                self.insts
                    .push(Inst::binary(Op::Mul, dest.clone(), a.clone(), b.clone()));
            }
            ("factorial", [Operand::Imm(n)]) => {
                self.insts
                    .push(Inst::constant(dest.clone(), builtins::factorial(*n)));
            }
            ("factorial", [arg]) => {
                self.insts
                    .push(Inst::call(dest.clone(), Name::user(callee), arg.clone()));
            }
            _ => {
                self.insts.push(Inst::constant(dest.clone(), 0));
            }
        }
        Operand::Var(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn lower_source(source: &str) -> Vec<Inst> {
        lower(&parser::parse(source).unwrap())
    }

    #[test]
    fn test_binary_materializes_fresh_temporaries() {
        let ir = lower_source("let x = 2 + 3 * 4;");
        // 3 * 4 evaluates first (right operand of +), into %t0
        assert_eq!(
            ir[0],
            Inst::binary(Op::Mul, Name::Temp(0), Operand::Imm(3), Operand::Imm(4))
        );
        assert_eq!(
            ir[1],
            Inst::binary(
                Op::Add,
                Name::Temp(1),
                Operand::Imm(2),
                Operand::Var(Name::Temp(0))
            )
        );
        assert_eq!(
            ir[2],
            Inst::mov(Name::user("x"), Operand::Var(Name::Temp(1)))
        );
    }

    #[test]
    fn test_literal_assignment_is_const() {
        let ir = lower_source("let x = 7;");
        assert_eq!(ir, vec![Inst::constant(Name::user("x"), 7)]);
    }

    #[test]
    fn test_variable_assignment_is_mov() {
        let ir = lower_source("let y = x;");
        assert_eq!(
            ir,
            vec![Inst::mov(Name::user("y"), Operand::Var(Name::user("x")))]
        );
    }

    #[test]
    fn test_multiply_expands_to_mul() {
        let ir = lower_source("let x = multiply(2, y);");
        assert_eq!(
            ir[0],
            Inst::binary(
                Op::Mul,
                Name::Temp(0),
                Operand::Imm(2),
                Operand::Var(Name::user("y"))
            )
        );
    }

    #[test]
    fn test_factorial_of_literal_folds_at_compile_time() {
        let ir = lower_source("let x = factorial(5);");
        assert_eq!(ir[0], Inst::constant(Name::Temp(0), 120));
    }

    #[test]
    fn test_factorial_of_variable_stays_a_call() {
        let ir = lower_source("let x = factorial(n);");
        assert_eq!(
            ir[0],
            Inst::call(
                Name::Temp(0),
                Name::user("factorial"),
                Operand::Var(Name::user("n"))
            )
        );
    }

    #[test]
    fn test_unknown_call_lowers_to_zero() {
        let ir = lower_source("let x = pow(2, 8);");
        assert_eq!(ir[0], Inst::constant(Name::Temp(0), 0));
    }

    #[test]
    fn test_arity_mismatch_lowers_to_zero() {
        let ir = lower_source("let x = factorial(1, 2);");
        assert_eq!(ir[0], Inst::constant(Name::Temp(0), 0));
    }
}

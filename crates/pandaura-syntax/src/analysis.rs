//! AST walks shared by dependency analysis and safety checks.

use smol_str::SmolStr;

use crate::ast::{CallArg, Expr, Program, Stmt, Target};

/// Every identifier a program reads, writes or calls, deduplicated and
/// sorted. Declared variables are included; callers subtract the
/// declaration set to get external tag dependencies.
#[must_use]
pub fn referenced_identifiers(program: &Program) -> Vec<SmolStr> {
    let mut names = Vec::new();
    for stmt in &program.body {
        walk_stmt(stmt, &mut names);
    }
    names.sort();
    names.dedup();
    names
}

/// Identifiers the program's external dependencies resolve to: referenced
/// names minus its own declarations, case-insensitively.
#[must_use]
pub fn external_dependencies(program: &Program) -> Vec<SmolStr> {
    let declared: Vec<String> = program
        .decls
        .iter()
        .map(|d| d.name.to_ascii_uppercase())
        .collect();
    referenced_identifiers(program)
        .into_iter()
        .filter(|name| !declared.contains(&name.to_ascii_uppercase()))
        .collect()
}

/// Every identifier assigned anywhere in a statement list, deduplicated and
/// sorted.
#[must_use]
pub fn assigned_identifiers(body: &[Stmt]) -> Vec<SmolStr> {
    let mut names = Vec::new();
    collect_assigned(body, &mut names);
    names.sort();
    names.dedup();
    names
}

fn collect_assigned(body: &[Stmt], names: &mut Vec<SmolStr>) {
    for stmt in body {
        match stmt {
            Stmt::Assign { target, .. } => match target {
                Target::Var(name) | Target::Index { name, .. } => names.push(name.clone()),
            },
            Stmt::If {
                then_block,
                else_if,
                else_block,
                ..
            } => {
                collect_assigned(then_block, names);
                for (_, block) in else_if {
                    collect_assigned(block, names);
                }
                collect_assigned(else_block, names);
            }
            Stmt::While { body, .. } | Stmt::For { body, .. } => collect_assigned(body, names),
            Stmt::Call { .. } | Stmt::Nop => {}
        }
    }
}

fn walk_stmt(stmt: &Stmt, names: &mut Vec<SmolStr>) {
    match stmt {
        Stmt::Assign { target, value } => {
            match target {
                Target::Var(name) => names.push(name.clone()),
                Target::Index { name, index } => {
                    names.push(name.clone());
                    walk_expr(index, names);
                }
            }
            walk_expr(value, names);
        }
        Stmt::Call { name, args } => {
            names.push(name.clone());
            walk_args(args, names);
        }
        Stmt::If {
            condition,
            then_block,
            else_if,
            else_block,
        } => {
            walk_expr(condition, names);
            for inner in then_block {
                walk_stmt(inner, names);
            }
            for (cond, block) in else_if {
                walk_expr(cond, names);
                for inner in block {
                    walk_stmt(inner, names);
                }
            }
            for inner in else_block {
                walk_stmt(inner, names);
            }
        }
        Stmt::While { condition, body } => {
            walk_expr(condition, names);
            for inner in body {
                walk_stmt(inner, names);
            }
        }
        Stmt::For {
            control,
            start,
            end,
            step,
            body,
        } => {
            names.push(control.clone());
            walk_expr(start, names);
            walk_expr(end, names);
            if let Some(step) = step {
                walk_expr(step, names);
            }
            for inner in body {
                walk_stmt(inner, names);
            }
        }
        Stmt::Nop => {}
    }
}

fn walk_args(args: &[CallArg], names: &mut Vec<SmolStr>) {
    for arg in args {
        walk_expr(&arg.value, names);
    }
}

fn walk_expr(expr: &Expr, names: &mut Vec<SmolStr>) {
    match expr {
        Expr::Var(name) => names.push(name.clone()),
        Expr::Member { target, .. } => walk_expr(target, names),
        Expr::Index { name, index } => {
            names.push(name.clone());
            walk_expr(index, names);
        }
        Expr::Call { args, .. } => walk_args(args, names),
        Expr::Binary { left, right, .. } => {
            walk_expr(left, names);
            walk_expr(right, names);
        }
        Expr::Unary { expr, .. } => walk_expr(expr, names),
        Expr::Number(_) | Expr::Str(_) | Expr::Bool(_) | Expr::Time(_) => {}
    }
}

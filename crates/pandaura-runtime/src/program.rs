//! Program loading: declarations into variable cells.

use pandaura_syntax::ast::{Program, TypeRef};
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::eval::{eval_expr, EvalContext};
use crate::memory::Cells;
use crate::value::{CellType, Value};

/// Allocate a cell for every declaration in the program.
///
/// Initialisers are evaluated in declaration order, so later declarations may
/// reference earlier ones. An unresolved named type allocates a
/// function-block instance record (`Q=false`, `ET=0`) keyed by the type name.
pub fn load_declarations(
    program: &Program,
    cells: &mut Cells,
    now_ms: i64,
) -> Result<(), RuntimeError> {
    for decl in &program.decls {
        match lower_type(&decl.ty) {
            CellType::Fb(fb_type) => {
                let id = cells.allocate_instance(fb_type.clone());
                cells.allocate(decl.name.clone(), CellType::Fb(fb_type), Value::Instance(id));
            }
            ty => {
                let value = match &decl.init {
                    Some(init) => {
                        let mut ctx = EvalContext {
                            cells: &mut *cells,
                            now_ms,
                        };
                        let value = eval_expr(&mut ctx, init)?;
                        ty.coerce(value)
                    }
                    None => ty.default_value(),
                };
                cells.allocate(decl.name.clone(), ty, value);
            }
        }
    }
    Ok(())
}

fn lower_type(ty: &TypeRef) -> CellType {
    match ty {
        TypeRef::Bool => CellType::Bool,
        TypeRef::Int => CellType::Int,
        TypeRef::DInt => CellType::DInt,
        TypeRef::Real => CellType::Real,
        TypeRef::LReal => CellType::LReal,
        TypeRef::String => CellType::Str,
        TypeRef::Time => CellType::Time,
        TypeRef::Array { lo, hi, base } => CellType::Array {
            lo: *lo,
            hi: *hi,
            base: Box::new(lower_type(base)),
        },
        TypeRef::Named(name) => CellType::Fb(upper(name)),
    }
}

fn upper(name: &SmolStr) -> SmolStr {
    name.to_ascii_uppercase().into()
}

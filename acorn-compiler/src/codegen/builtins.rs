// Synthesized bodies for the builtin operator and indexing methods.

use acorn_ast::TypeId;
use inkwell::values::{BasicValueEnum, FunctionValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::typesystem::types::TypeKind;

use super::Generator;

impl<'ctx, 'c> Generator<'ctx, 'c> {
    pub(crate) fn generate_builtin_body(
        &mut self,
        name: &str,
        method: TypeId,
        function_value: FunctionValue<'ctx>,
    ) -> Result<(), String> {
        if function_value.count_basic_blocks() > 0 {
            return Ok(());
        }

        let parameter_types: Vec<TypeId> = self
            .universe
            .method_parameter_types(method)
            .iter()
            .map(|ty| self.resolve(*ty))
            .collect();

        let known = matches!(
            (name, parameter_types.len()),
            ("+", 2)
                | ("-", 2)
                | ("-", 1)
                | ("*", 2)
                | ("/", 2)
                | ("%", 2)
                | ("==", 2)
                | ("!=", 2)
                | ("<", 2)
                | ("<=", 2)
                | (">", 2)
                | (">=", 2)
                | ("not", 1)
                | ("and", 2)
                | ("or", 2)
                | ("to_integer", 1)
                | ("to_float", 1)
                | ("getindex", 2)
                | ("setindex", 3)
        );
        if !known {
            // body provided at link time; keep the external declaration
            return Ok(());
        }

        let entry = self.context.append_basic_block(function_value, "entry");
        self.builder.position_at_end(entry);

        let param = |index: usize| -> Result<BasicValueEnum<'ctx>, String> {
            function_value
                .get_nth_param(index as u32)
                .ok_or_else(|| format!("builtin {} is missing parameter {}", name, index))
        };

        let is_float = parameter_types
            .first()
            .map(|ty| matches!(self.universe.kind(*ty), TypeKind::Float(_)))
            .unwrap_or(false);

        let err = |e| format!("failed to build builtin {}: {}", name, e);

        let result: BasicValueEnum<'ctx> = match (name, parameter_types.len()) {
            ("+", 2) | ("-", 2) | ("*", 2) | ("/", 2) | ("%", 2) => {
                if is_float {
                    let a = param(0)?.into_float_value();
                    let b = param(1)?.into_float_value();
                    let value = match name {
                        "+" => self.builder.build_float_add(a, b, "sum"),
                        "-" => self.builder.build_float_sub(a, b, "difference"),
                        "*" => self.builder.build_float_mul(a, b, "product"),
                        "/" => self.builder.build_float_div(a, b, "quotient"),
                        _ => self.builder.build_float_rem(a, b, "remainder"),
                    };
                    value.map_err(err)?.into()
                } else {
                    let a = param(0)?.into_int_value();
                    let b = param(1)?.into_int_value();
                    let value = match name {
                        "+" => self.builder.build_int_add(a, b, "sum"),
                        "-" => self.builder.build_int_sub(a, b, "difference"),
                        "*" => self.builder.build_int_mul(a, b, "product"),
                        "/" => self.builder.build_int_signed_div(a, b, "quotient"),
                        _ => self.builder.build_int_signed_rem(a, b, "remainder"),
                    };
                    value.map_err(err)?.into()
                }
            }
            ("-", 1) => {
                if is_float {
                    let a = param(0)?.into_float_value();
                    self.builder
                        .build_float_neg(a, "negated")
                        .map_err(err)?
                        .into()
                } else {
                    let a = param(0)?.into_int_value();
                    self.builder
                        .build_int_neg(a, "negated")
                        .map_err(err)?
                        .into()
                }
            }
            ("==", 2) | ("!=", 2) | ("<", 2) | ("<=", 2) | (">", 2) | (">=", 2) => {
                if is_float {
                    let predicate = match name {
                        "==" => FloatPredicate::OEQ,
                        "!=" => FloatPredicate::ONE,
                        "<" => FloatPredicate::OLT,
                        "<=" => FloatPredicate::OLE,
                        ">" => FloatPredicate::OGT,
                        _ => FloatPredicate::OGE,
                    };
                    let a = param(0)?.into_float_value();
                    let b = param(1)?.into_float_value();
                    self.builder
                        .build_float_compare(predicate, a, b, "comparison")
                        .map_err(err)?
                        .into()
                } else {
                    let predicate = match name {
                        "==" => IntPredicate::EQ,
                        "!=" => IntPredicate::NE,
                        "<" => IntPredicate::SLT,
                        "<=" => IntPredicate::SLE,
                        ">" => IntPredicate::SGT,
                        _ => IntPredicate::SGE,
                    };
                    let a = param(0)?.into_int_value();
                    let b = param(1)?.into_int_value();
                    self.builder
                        .build_int_compare(predicate, a, b, "comparison")
                        .map_err(err)?
                        .into()
                }
            }
            ("not", 1) => {
                let a = param(0)?.into_int_value();
                self.builder.build_not(a, "negation").map_err(err)?.into()
            }
            ("and", 2) => {
                let a = param(0)?.into_int_value();
                let b = param(1)?.into_int_value();
                self.builder
                    .build_and(a, b, "conjunction")
                    .map_err(err)?
                    .into()
            }
            ("or", 2) => {
                let a = param(0)?.into_int_value();
                let b = param(1)?.into_int_value();
                self.builder
                    .build_or(a, b, "disjunction")
                    .map_err(err)?
                    .into()
            }
            ("to_integer", 1) => {
                let a = param(0)?.into_float_value();
                self.builder
                    .build_float_to_signed_int(a, self.context.i64_type(), "integer")
                    .map_err(err)?
                    .into()
            }
            ("to_float", 1) => {
                let a = param(0)?.into_int_value();
                self.builder
                    .build_signed_int_to_float(a, self.context.f64_type(), "float")
                    .map_err(err)?
                    .into()
            }
            ("getindex", 2) => {
                let pointer = param(0)?.into_pointer_value();
                let index = param(1)?.into_int_value();
                let element_type =
                    self.llvm_type(self.universe.method_return_type(method))?;
                let element = unsafe {
                    self.builder
                        .build_in_bounds_gep(element_type, pointer, &[index], "element")
                }
                .map_err(err)?;
                self.builder
                    .build_load(element_type, element, "value")
                    .map_err(err)?
            }
            ("setindex", 3) => {
                let pointer = param(0)?.into_pointer_value();
                let index = param(1)?.into_int_value();
                let value = param(2)?;
                let element_type = value.get_type();
                let element = unsafe {
                    self.builder
                        .build_in_bounds_gep(element_type, pointer, &[index], "element")
                }
                .map_err(err)?;
                self.builder.build_store(element, value).map_err(err)?;
                self.builder.build_return(None).map_err(err)?;
                return Ok(());
            }
            _ => return Err(format!("unhandled builtin {}", name)),
        };

        self.builder
            .build_return(Some(&result))
            .map_err(err)?;

        Ok(())
    }
}

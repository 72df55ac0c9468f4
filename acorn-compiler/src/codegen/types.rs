// Mapping from the type universe to LLVM types, and the link-time name
// scheme.

use acorn_ast::TypeId;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType};
use inkwell::AddressSpace;

use crate::typesystem::types::{TypeKind, TypeUniverse};

use super::Generator;

/// The deterministic link-time name of one method of a named function:
/// `_A_<name>_<method-mangle>`.
pub fn mangle_method(name: &str, universe: &TypeUniverse, method: TypeId) -> String {
    format!("_A_{}_{}", sanitise(name), universe.mangled_name(method))
}

pub(crate) fn sanitise(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            // distinct operators must stay distinct after sanitising
            out.push_str(&format!("${:x}", c as u32));
        }
    }
    out
}

impl<'ctx, 'c> Generator<'ctx, 'c> {
    /// The LLVM value type for an instance type. Generic slots resolve
    /// through the active specialisation first.
    pub(crate) fn llvm_type(&self, ty: TypeId) -> Result<BasicTypeEnum<'ctx>, String> {
        let ty = self.resolve(ty);

        match self.universe.kind(ty) {
            TypeKind::Boolean => Ok(self.context.bool_type().into()),
            TypeKind::Integer(bits) | TypeKind::UnsignedInteger(bits) => {
                Ok(self.context.custom_width_int_type(*bits).into())
            }
            TypeKind::Float(16) => Ok(self.context.f16_type().into()),
            TypeKind::Float(32) => Ok(self.context.f32_type().into()),
            TypeKind::Float(64) => Ok(self.context.f64_type().into()),
            TypeKind::Float(128) => Ok(self.context.f128_type().into()),
            TypeKind::Float(bits) => Err(format!("unsupported float width {}", bits)),
            TypeKind::UnsafePointer => {
                Ok(self.context.ptr_type(AddressSpace::default()).into())
            }
            TypeKind::Record { .. } => {
                let mut fields = Vec::new();
                for field in self.universe.parameters(ty).to_vec() {
                    fields.push(self.llvm_type(field)?);
                }
                Ok(self.context.struct_type(&fields, false).into())
            }
            TypeKind::Function | TypeKind::Method { .. } => {
                Ok(self.context.ptr_type(AddressSpace::default()).into())
            }
            TypeKind::Void => Err("void has no value representation".to_string()),
            other => Err(format!(
                "type {} has no LLVM representation",
                type_label(other)
            )),
        }
    }

    /// Function type for one method under the active specialisation. Inout
    /// parameters become pointers; a Void return becomes an LLVM void
    /// function.
    pub(crate) fn llvm_method_type(&self, method: TypeId) -> Result<FunctionType<'ctx>, String> {
        let parameter_types = self.universe.method_parameter_types(method);
        let inouts = self.universe.method_inouts(method);

        let mut parameters: Vec<BasicMetadataTypeEnum<'ctx>> = Vec::new();
        for (index, parameter) in parameter_types.iter().enumerate() {
            if inouts.get(index).copied().unwrap_or(false) {
                parameters.push(self.context.ptr_type(AddressSpace::default()).into());
            } else {
                parameters.push(self.llvm_type(*parameter)?.into());
            }
        }

        let return_type = self.resolve(self.universe.method_return_type(method));
        if matches!(self.universe.kind(return_type), TypeKind::Void) {
            Ok(self.context.void_type().fn_type(&parameters, false))
        } else {
            Ok(self.llvm_type(return_type)?.fn_type(&parameters, false))
        }
    }
}

fn type_label(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::Parameter { .. } => "an unresolved generic parameter",
        TypeKind::Union => "a union",
        _ => "a constructor",
    }
}

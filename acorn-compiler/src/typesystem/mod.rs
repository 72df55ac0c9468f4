pub mod checker;
pub mod types;

pub use checker::TypeChecker;
pub use types::{Specialisation, TypeKind, TypeUniverse};

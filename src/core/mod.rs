//! Language-level tables shared by the analyzer and the emitter.

pub mod gensym;
pub mod metadata;
pub mod namespace;
pub mod prelude;
pub mod recur;
pub mod special_forms;

pub use gensym::SymbolGenerator;
pub use metadata::{ArityFn, CompileTimeFns, ExpandFn, Meta};
pub use namespace::{GlobalTable, CORE_NAMESPACE, DEFAULT_NAMESPACE, HOST_NAMESPACE};
pub use recur::RecurFrame;
pub use special_forms::SpecialForm;

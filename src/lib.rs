//! Compiler for the Phel language, targeting PHP.
//!
//! Source text is read into [`form::Form`]s, analyzed into an
//! [`ast::Node`] tree and emitted as PHP by [`codegen::Emitter`].
//! [`compiler::Compiler`] runs the three stages over a whole file.

pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod core;
pub mod devtools;
pub mod env;
pub mod error;
pub mod form;
pub mod logging;
pub mod reader;

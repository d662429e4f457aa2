//! Compilador de expresiones aritméticas.
//!
//! # Front end
//! Cada programa es una única expresión formada por literales enteros
//! y los operadores `+ - * /`. El texto se somete primero a análisis
//! léxico en [`lex`], de lo cual se obtiene un flujo de tokens. El flujo
//! de tokens se dispone en un árbol sintáctico por medio de análisis
//! sintáctico en [`parse`], el cual resuelve precedencia y asociatividad.
//! El árbol puede evaluarse directamente con [`interp`].
//!
//! # Back end
//! En esta sección el compilador deja de ser agnóstico al sistema
//! objetivo. El árbol se recorre en orden posterior y se traduce a
//! instrucciones sobre un conjunto fijo de registros, expuesto en
//! [`target`]. Cada arquitectura define su propio conjunto de registros
//! y su formato de instrucciones. El ensamblado y enlazado del
//! resultado se delegan a la toolchain del sistema en [`link`].

#[macro_use]
mod macros;

pub mod error;
pub mod interp;
pub mod lex;
pub mod link;
pub mod parse;
pub mod source;

mod arch;
mod codegen;

/// Emisión de código.
///
/// Este módulo reexporta suficientes ítems internos relacionados a generación de código para
/// traducir un árbol sintáctico a alguna arquitectura en específico.
pub mod target {
    pub use crate::arch::{Aarch64, Arch, Emitter, X86_64};
    pub use crate::codegen::{
        emit,
        regs::{Register, RegisterPool},
        CodegenError, Context, Generator, Listing,
    };
}

//! Detalles específicos para cada arquitectura objetivo.
//!
//! Este módulo expone la interfaz de emisión que implementa cada
//! submódulo. En general, debe utilizarse la macro `dispatch_arch!()`
//! para seleccionar una implementación a partir de un [`Arch`].

use crate::{
    codegen::{regs::Register, CodegenError, Context},
    parse::BinOp,
};

/// Arquitectura de procesador (ISA).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arch {
    Aarch64,
    X86_64,
}

mod aarch64;
mod x86_64;

pub use aarch64::Emitter as Aarch64;
pub use x86_64::Emitter as X86_64;

/// Emisión de código ensamblador para una expresión.
///
/// Los tipos que implementan este trait traducen las operaciones del
/// árbol a instrucciones de la arquitectura objetivo. Cada operación
/// aritmética consume dos registros vivos, libera exactamente uno (el
/// derecho) y retorna el otro como destino.
///
/// Las operaciones aritméticas fallan con [`CodegenError::UnknownOperator`]
/// si la implementación no las sobrescribe.
pub trait Emitter: Sized {
    /// Registros de propósito general disponibles por omisión.
    const REGISTERS: &'static [&'static str];

    /// Construye con el conjunto de registros por omisión.
    fn new() -> Self {
        Self::with_registers(Self::REGISTERS.iter().copied())
    }

    /// Construye con un conjunto explícito de registros.
    fn with_registers<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>;

    /// Obtiene el contexto de emisión.
    ///
    /// Implicado aquí que todo `Emitter` debe guardar as-is el [`Context`]
    /// que construye en [`Emitter::with_registers()`].
    fn cx(&self) -> &Context;

    fn cx_mut(&mut self) -> &mut Context;

    /// Descarta el emisor y entrega su contexto.
    fn into_context(self) -> Context;

    /// Emite el punto de entrada del programa.
    fn preamble(&mut self) -> Result<(), CodegenError>;

    /// Emite la terminación del programa.
    fn postamble(&mut self) -> Result<(), CodegenError>;

    /// Toma un registro y carga una constante en él.
    fn load(&mut self, value: i64) -> Result<Register, CodegenError>;

    fn add(&mut self, _lhs: Register, _rhs: Register) -> Result<Register, CodegenError> {
        Err(CodegenError::UnknownOperator(BinOp::Add))
    }

    fn sub(&mut self, _lhs: Register, _rhs: Register) -> Result<Register, CodegenError> {
        Err(CodegenError::UnknownOperator(BinOp::Sub))
    }

    fn mul(&mut self, _lhs: Register, _rhs: Register) -> Result<Register, CodegenError> {
        Err(CodegenError::UnknownOperator(BinOp::Mul))
    }

    fn div(&mut self, _lhs: Register, _rhs: Register) -> Result<Register, CodegenError> {
        Err(CodegenError::UnknownOperator(BinOp::Div))
    }
}

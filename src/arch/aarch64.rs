//! Implementación para AArch64 sobre Darwin.
//!
//! El programa generado es un punto de entrada `_start` sin runtime que
//! termina con la llamada al sistema `exit` de Darwin (`x16 = 1`,
//! `svc #0x80`).

use crate::codegen::{
    regs::{Register, RegisterPool},
    CodegenError, Context,
};

/// Mayor inmediato que cabe en un solo `mov`.
const MOV_IMMEDIATE_MAX: i64 = 0xffff;

/// Implementación de emisión de código para AArch64.
pub struct Emitter {
    cx: Context,
}

impl super::Emitter for Emitter {
    // x8 a x11 son temporales caller-saved según la ABI
    const REGISTERS: &'static [&'static str] = &["x8", "x9", "x10", "x11"];

    fn with_registers<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Emitter {
            cx: Context::new(RegisterPool::new(names)),
        }
    }

    fn cx(&self) -> &Context {
        &self.cx
    }

    fn cx_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    fn into_context(self) -> Context {
        self.cx
    }

    fn preamble(&mut self) -> Result<(), CodegenError> {
        self.cx.push(".global _start");
        self.cx.push(".align 4");
        self.cx.push("_start:");

        Ok(())
    }

    fn postamble(&mut self) -> Result<(), CodegenError> {
        emit!(self.cx, "mov", "x0, #0");
        emit!(self.cx, "mov", "x16, #1");
        emit!(self.cx, "svc", "#0x80");

        Ok(())
    }

    fn load(&mut self, value: i64) -> Result<Register, CodegenError> {
        let reg = self.cx.regs_mut().allocate()?;

        if (0..=MOV_IMMEDIATE_MAX).contains(&value) {
            emit!(self.cx, "mov", "{}, #{}", reg, value);
        } else {
            // Constante ancha: se arma de 16 en 16 bits
            let bits = value as u64;
            emit!(self.cx, "movz", "{}, #{}", reg, bits & 0xffff);

            for shift in [16, 32, 48] {
                let chunk = (bits >> shift) & 0xffff;
                if chunk != 0 {
                    emit!(self.cx, "movk", "{}, #{}, lsl #{}", reg, chunk, shift);
                }
            }
        }

        Ok(reg)
    }

    fn add(&mut self, lhs: Register, rhs: Register) -> Result<Register, CodegenError> {
        self.three_operand("add", lhs, rhs)
    }

    fn sub(&mut self, lhs: Register, rhs: Register) -> Result<Register, CodegenError> {
        self.three_operand("sub", lhs, rhs)
    }

    fn mul(&mut self, lhs: Register, rhs: Register) -> Result<Register, CodegenError> {
        self.three_operand("mul", lhs, rhs)
    }

    fn div(&mut self, lhs: Register, rhs: Register) -> Result<Register, CodegenError> {
        self.three_operand("sdiv", lhs, rhs)
    }
}

impl Emitter {
    /// `op lhs, lhs, rhs`, liberando `rhs`.
    fn three_operand(
        &mut self,
        opcode: &str,
        lhs: Register,
        rhs: Register,
    ) -> Result<Register, CodegenError> {
        emit!(self.cx, opcode, "{0}, {0}, {1}", lhs, rhs);
        self.cx.regs_mut().free(&rhs)?;

        Ok(lhs)
    }
}

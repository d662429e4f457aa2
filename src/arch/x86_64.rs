//! Implementación para x86-64 sobre Linux, en sintaxis AT&T.

use crate::codegen::{
    regs::{Register, RegisterPool},
    CodegenError, Context,
};

/// Implementación de emisión de código para x86-64.
pub struct Emitter {
    cx: Context,
}

impl super::Emitter for Emitter {
    // %rax y %rdx quedan fuera del pool ya que `idivq` los ocupa
    const REGISTERS: &'static [&'static str] = &["r8", "r9", "r10", "r11"];

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
        self.cx.push(".globl _start");
        self.cx.push(".text");
        self.cx.push("_start:");

        Ok(())
    }

    fn postamble(&mut self) -> Result<(), CodegenError> {
        // exit(0)
        emit!(self.cx, "movq", "$60, %rax");
        emit!(self.cx, "xorq", "%rdi, %rdi");
        emit!(self.cx, "syscall");

        Ok(())
    }

    fn load(&mut self, value: i64) -> Result<Register, CodegenError> {
        let reg = self.cx.regs_mut().allocate()?;

        // `movq` solo acepta inmediatos de 32 bits con extensión de signo
        let opcode = if i32::try_from(value).is_ok() {
            "movq"
        } else {
            "movabsq"
        };

        emit!(self.cx, opcode, "${}, %{}", value, reg);
        Ok(reg)
    }

    fn add(&mut self, lhs: Register, rhs: Register) -> Result<Register, CodegenError> {
        self.two_operand("addq", lhs, rhs)
    }

    fn sub(&mut self, lhs: Register, rhs: Register) -> Result<Register, CodegenError> {
        self.two_operand("subq", lhs, rhs)
    }

    fn mul(&mut self, lhs: Register, rhs: Register) -> Result<Register, CodegenError> {
        self.two_operand("imulq", lhs, rhs)
    }

    fn div(&mut self, lhs: Register, rhs: Register) -> Result<Register, CodegenError> {
        // El dividendo vive en %rdx:%rax y el cociente queda en %rax
        emit!(self.cx, "movq", "%{}, %rax", lhs);
        emit!(self.cx, "cqto");
        emit!(self.cx, "idivq", "%{}", rhs);
        emit!(self.cx, "movq", "%rax, %{}", lhs);

        self.cx.regs_mut().free(&rhs)?;
        Ok(lhs)
    }
}

impl Emitter {
    /// `op %rhs, %lhs`, liberando `rhs`.
    fn two_operand(
        &mut self,
        opcode: &str,
        lhs: Register,
        rhs: Register,
    ) -> Result<Register, CodegenError> {
        emit!(self.cx, opcode, "%{}, %{}", rhs, lhs);
        self.cx.regs_mut().free(&rhs)?;

        Ok(lhs)
    }
}

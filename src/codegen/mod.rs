//! Generación de código.
//!
//! El árbol sintáctico se recorre en orden posterior. Cada hoja toma un
//! registro y carga su constante; cada nodo binario combina los registros
//! de sus dos hijos, libera el de la derecha y reutiliza el de la izquierda
//! como destino. Así, la cantidad de registros vivos en un punto dado es
//! la cantidad de hermanos derechos pendientes, no el tamaño del árbol.
//! No existe spilling: agotar el pool es un error.

use crate::{
    arch::{Arch, Emitter},
    parse::{BinOp, Expr},
};

use std::{
    fmt::{self, Display},
    io::{self, Write},
};

use thiserror::Error;
use tracing::{debug, trace};

pub mod regs;

use regs::{Register, RegisterPool};

/// Error de generación de código.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodegenError {
    /// No quedan registros libres.
    #[error("Out of registers")]
    RegisterExhaustion,

    /// Se liberó un registro que ya estaba libre.
    #[error("Register {0} is already free")]
    DoubleFree(String),

    /// Se entregó a un pool un registro que otro pool asignó.
    #[error("Register {0} does not belong to this pool")]
    ForeignRegister(String),

    /// La arquitectura objetivo no implementa este operador.
    #[error("Unknown AST operator {0:?}")]
    UnknownOperator(BinOp),

    /// No existe emisor para la combinación de sistema y arquitectura.
    #[error("Could not determine assembly engine for {system} {machine} platform")]
    UnsupportedPlatform { system: String, machine: String },
}

/// Listado de instrucciones emitidas, en orden.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing(Vec<String>);

impl Listing {
    /// Líneas emitidas, sin terminadores.
    pub fn lines(&self) -> &[String] {
        &self.0
    }

    /// Escribe el listado completo, una línea por instrucción.
    pub fn write_to<W: Write>(&self, output: &mut W) -> io::Result<()> {
        for line in &self.0 {
            writeln!(output, "{}", line)?;
        }

        output.flush()
    }
}

impl Display for Listing {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|line| writeln!(fmt, "{}", line))
    }
}

/// Contexto de emisión.
///
/// Todo [`Emitter`] guarda uno de estos: contiene el listado en
/// construcción y el pool de registros de la arquitectura.
pub struct Context {
    listing: Listing,
    regs: RegisterPool,
}

impl Context {
    pub fn new(regs: RegisterPool) -> Self {
        Context {
            listing: Listing::default(),
            regs,
        }
    }

    /// Agrega una línea al listado.
    pub fn push<S: Into<String>>(&mut self, line: S) {
        self.listing.0.push(line.into());
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn regs(&self) -> &RegisterPool {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut RegisterPool {
        &mut self.regs
    }

    pub fn into_listing(self) -> Listing {
        self.listing
    }

    /// Descarta el listado y libera todos los registros.
    pub fn reset(&mut self) {
        self.listing.0.clear();
        self.regs.free_all();
    }
}

/// Recorrido del árbol sobre un emisor concreto.
///
/// Cada invocación de [`Generator::generate()`] es una pasada completa y
/// no reentrante. El contexto se reinicia al inicio de cada pasada, y una
/// pasada fallida no deja líneas en el listado.
pub struct Generator<E> {
    emitter: E,
}

impl<E: Emitter> Generator<E> {
    pub fn new(emitter: E) -> Self {
        Generator { emitter }
    }

    /// Emite preámbulo, cuerpo y epílogo para una expresión.
    ///
    /// Retorna el registro que contiene el resultado, el cual permanece
    /// asignado al terminar.
    pub fn generate(&mut self, root: &Expr) -> Result<Register, CodegenError> {
        self.emitter.cx_mut().reset();

        match self.program(root) {
            Ok(result) => {
                debug!(%result, "generated expression");
                Ok(result)
            }

            Err(error) => {
                self.emitter.cx_mut().reset();
                Err(error)
            }
        }
    }

    pub fn registers(&self) -> &RegisterPool {
        self.emitter.cx().regs()
    }

    /// Termina y entrega el listado emitido.
    pub fn finish(self) -> Listing {
        self.emitter.into_context().into_listing()
    }

    fn program(&mut self, root: &Expr) -> Result<Register, CodegenError> {
        self.emitter.preamble()?;
        let result = self.expr(root)?;
        self.emitter.postamble()?;

        Ok(result)
    }

    fn expr(&mut self, expr: &Expr) -> Result<Register, CodegenError> {
        let (op, lhs, rhs) = match expr {
            Expr::Integer(value) => return self.emitter.load(*value),
            Expr::Binary { op, lhs, rhs } => (*op, lhs, rhs),
        };

        // El orden izquierda-derecha determina la asignación de registros
        let lhs = self.expr(lhs)?;
        let rhs = self.expr(rhs)?;

        trace!(%op, %lhs, %rhs, "combine");

        match op {
            BinOp::Add => self.emitter.add(lhs, rhs),
            BinOp::Sub => self.emitter.sub(lhs, rhs),
            BinOp::Mul => self.emitter.mul(lhs, rhs),
            BinOp::Div => self.emitter.div(lhs, rhs),
        }
    }
}

/// Genera el listado completo de una expresión para una arquitectura.
///
/// `registers` reemplaza el conjunto de registros por omisión del emisor.
pub fn emit(expr: &Expr, arch: Arch, registers: Option<&[String]>) -> Result<Listing, CodegenError> {
    dispatch_arch!(Target: arch => {
        let emitter = match registers {
            Some(names) => Target::with_registers(names),
            None => Target::new(),
        };

        let mut generator = Generator::new(emitter);
        generator.generate(expr)?;

        Ok(generator.finish())
    })
}

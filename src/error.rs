//! Reporte de errores con ubicación.
//!
//! Los errores de las fases delanteras se acumulan en [`Diagnostics`],
//! cuya forma de [`Display`] cita la línea original y subraya el rango
//! afectado.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn error(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

#[derive(Default)]
pub struct Diagnostics {
    errors: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl<E: 'static + Error> From<Located<E>> for Diagnostics {
    fn from(error: Located<E>) -> Self {
        Diagnostics {
            errors: vec![Box::new(error)],
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { errors } = self;

        if errors.is_empty() {
            return writeln!(fmt, "No errors were reported");
        }

        for error in errors {
            let location = error.location();
            writeln!(fmt, "error: {}", error.error())?;
            writeln!(fmt, " --> {}", location)?;

            let line = location.line();
            let digits = line.to_string().len();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            location.source().with_line(line, |text| {
                writeln!(fmt, "{:>digits$} | {}", line, text, digits = digits)
            })?;

            // Un rango que cruza líneas solo se subraya hasta el inicio
            let (start, end) = (location.start(), location.end());
            let from = start.column();
            let to = if end.line() == start.line() {
                end.column().max(from + 1)
            } else {
                from + 1
            };

            let skip = (from - 1) as usize;
            let highlight = (to - from) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let error_or_errors = if errors.len() == 1 { "error" } else { "errors" };
        writeln!(
            fmt,
            "Build failed with {} {}",
            errors.len(),
            error_or_errors
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn error(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

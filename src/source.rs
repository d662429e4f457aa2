//! Ubicaciones de tokens y nodos dentro del texto de entrada.
//!
//! El lexer consume la entrada carácter por carácter a través de
//! [`Input`], el cual lleva cuenta de la línea y columna actuales y
//! permite devolver un único carácter al flujo. Cada token y cada error
//! de las fases delanteras queda asociado a una [`Location`], lo cual
//! permite reportar el punto exacto en donde ocurrió un error.

use std::{
    cell::RefCell,
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    io::{self, BufRead},
    rc::Rc,
};

/// Separación entre topes de tabulador.
const TAB_STOP: u32 = 4;

/// Valor acompañado de la ubicación de la que proviene.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Entrega el valor, olvidando la ubicación.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Separa ubicación y valor.
    pub fn split(self) -> (Location, T) {
        (self.location, self.value)
    }

    /// Asocia un valor con su ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    /// Aplica `map` al valor y conserva la ubicación.
    pub fn map<U, F>(self, map: F) -> Located<U>
    where
        F: FnOnce(T) -> U,
    {
        Located {
            value: map(self.value),
            location: self.location,
        }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<E: Error> Display for Located<E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} on line {}", self.value, self.location.line())
    }
}

impl<E: Error> Error for Located<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.value.source()
    }
}

/// Rango de posiciones dentro de una entrada.
///
/// El fin del rango es exclusivo.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    start: Position,
    end: Position,
}

impl Location {
    /// Primera posición del rango.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Posición inmediatamente posterior al rango.
    pub fn end(&self) -> Position {
        self.end
    }

    /// Línea en la que inicia la ubicación.
    pub fn line(&self) -> u32 {
        self.start.line
    }

    /// Obtiene el origen de esta ubicación.
    pub fn source(&self) -> &Source {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:", self.from.name)?;

        if self.end == self.start.advance() || self.end == self.start {
            write!(formatter, "{}", self.start)
        } else {
            write!(formatter, "[{}-{}]", self.start, self.end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}

/// Par línea-columna dentro de una entrada.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Position {
    /// Línea, comenzando en 1.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Columna, comenzando en 1.
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Avanza una columna.
    pub fn advance(self) -> Position {
        Position {
            line: self.line,
            column: self.column + 1,
        }
    }

    /// Retrocede una columna.
    pub fn back(self) -> Position {
        Position {
            line: self.line,
            column: self.column.saturating_sub(1).max(1),
        }
    }

    /// Primera columna de la línea siguiente.
    pub fn newline(self) -> Position {
        Position {
            line: self.line + 1,
            column: 1,
        }
    }

    /// Avanza hasta el siguiente tope de tabulador.
    pub fn tab(self) -> Position {
        let column = 1 + ((self.column - 1) / TAB_STOP + 1) * TAB_STOP;
        Position {
            line: self.line,
            column,
        }
    }

    /// Posición que sigue a un carácter dado.
    fn after(self, c: char) -> Position {
        match c {
            '\n' => self.newline(),
            '\t' => self.tab(),
            _ => self.advance(),
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl Display for Position {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.line, self.column)
    }
}

/// Nombre de la entrada y las líneas leídas hasta ahora.
///
/// Las líneas se acumulan conforme [`Input`] las lee, de modo que
/// los diagnósticos pueden citar el texto original.
pub struct Source {
    name: String,
    lines: RefCell<Vec<String>>,
}

impl Source {
    /// Nombre del origen, usualmente una ruta.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoca a `f` con el texto de una línea (1-based). Las líneas
    /// que aún no se han leído se presentan vacías.
    pub fn with_line<T, F>(&self, line: u32, f: F) -> T
    where
        F: FnOnce(&str) -> T,
    {
        let lines = self.lines.borrow();
        let text = (line as usize)
            .checked_sub(1)
            .and_then(|index| lines.get(index))
            .map(String::as_str)
            .unwrap_or("");

        f(text)
    }
}

/// Flujo de entrada, carácter por carácter, con un carácter de pushback.
pub struct Input<R> {
    reader: R,
    source: Rc<Source>,
    line: Vec<char>,
    cursor: usize,
    position: Position,
    previous: Position,
    putback: Option<char>,
}

impl<R: BufRead> Input<R> {
    /// Construye a partir de un lector y un nombre de origen.
    pub fn new<S: Into<String>>(reader: R, name: S) -> Self {
        let source = Rc::new(Source {
            name: name.into(),
            lines: Default::default(),
        });

        Input {
            reader,
            source,
            line: Vec::new(),
            cursor: 0,
            position: Position::default(),
            previous: Position::default(),
            putback: None,
        }
    }

    /// Extrae el siguiente carácter, o `None` al final de la entrada.
    pub fn next(&mut self) -> io::Result<Option<char>> {
        if let Some(c) = self.putback.take() {
            self.position = self.previous.after(c);
            return Ok(Some(c));
        }

        if self.cursor == self.line.len() && !self.fill()? {
            return Ok(None);
        }

        let c = self.line[self.cursor];
        self.cursor += 1;

        self.previous = self.position;
        self.position = self.position.after(c);

        Ok(Some(c))
    }

    /// Devuelve al flujo el último carácter extraído.
    ///
    /// Solo se admite un carácter pendiente a la vez.
    pub fn putback(&mut self, c: char) {
        debug_assert!(self.putback.is_none(), "double putback");

        self.putback = Some(c);
        self.position = self.previous;
    }

    /// Número de línea actual (1-based).
    pub fn line(&self) -> u32 {
        self.position.line
    }

    /// Posición del siguiente carácter.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Posición del último carácter extraído.
    pub fn previous(&self) -> Position {
        self.previous
    }

    /// Ubicación de un solo carácter en la posición actual.
    pub fn here(&self) -> Location {
        Location {
            from: Rc::clone(&self.source),
            start: self.position,
            end: self.position.advance(),
        }
    }

    /// Ubicación desde `start` hasta la posición actual.
    pub fn span_from(&self, start: Position) -> Location {
        Location {
            from: Rc::clone(&self.source),
            start,
            end: self.position,
        }
    }

    /// Lee la siguiente línea completa. Retorna `false` al final de la entrada.
    fn fill(&mut self) -> io::Result<bool> {
        let mut text = String::new();
        if self.reader.read_line(&mut text)? == 0 {
            return Ok(false);
        }

        self.line = text.chars().collect();
        self.cursor = 0;

        let stripped = text.trim_end_matches(|c| c == '\n' || c == '\r');
        self.source.lines.borrow_mut().push(stripped.to_owned());

        Ok(true)
    }
}

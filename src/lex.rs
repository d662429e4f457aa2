//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un flujo de
//! caracteres ([`Input`]) en unidades léxicas denominadas tokens. Los
//! espacios en blanco se descartan durante esta operación. Cada token
//! emitido está asociado a una ubicación en el código fuente original.
//!
//! # Contenido de un token
//! Los operadores se identifican por el hecho de lo que son y no incluyen
//! lexemas. Las constantes literales se resuelven a sus valores en vez de
//! preservar sus lexemas. El fin de la entrada se representa con un token
//! explícito, [`Token::Eof`], en lugar de terminar el flujo.
//!
//! # Errores
//! A diferencia del parser, el lexer no intenta recuperarse: el primer
//! carácter que no puede iniciar un token termina el escaneo.

use crate::source::{Input, Located, Location};
use std::{
    fmt::{self, Display},
    io::BufRead,
};

use thiserror::Error;
use tracing::trace;

/// Literal entero máximo.
const INT_MAX: i64 = i64::MAX;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el flujo de entrada.
    #[error("I/O error")]
    Input(#[from] std::io::Error),

    /// Carácter que no puede iniciar ningún token.
    #[error("Unrecognized character \"{0}\"")]
    UnrecognizedChar(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {max}]", max = INT_MAX)]
    IntOverflow,
}

/// Objeto resultante del análisis léxico.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Star,

    /// `/`
    Slash,

    /// Literal de entero.
    IntLiteral(i64),

    /// Fin de la entrada.
    Eof,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Star => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            IntLiteral(integer) => write!(fmt, "literal `{}`", integer),
            Eof => fmt.write_str("end of input"),
        }
    }
}

/// Fuente de tokens consumida por el parser.
///
/// Cada invocación de [`TokenSource::scan()`] produce exactamente un token.
/// Una vez alcanzado el final, toda invocación posterior debe seguir
/// retornando [`Token::Eof`].
pub trait TokenSource {
    fn scan(&mut self) -> Result<Located<Token>, Located<LexerError>>;
}

impl<T: TokenSource + ?Sized> TokenSource for &mut T {
    fn scan(&mut self) -> Result<Located<Token>, Located<LexerError>> {
        (**self).scan()
    }
}

/// Escáner sobre un flujo de caracteres.
pub struct Lexer<R> {
    input: Input<R>,
}

impl<R: BufRead> Lexer<R> {
    /// Crea un lexer a partir de un lector y el nombre de su origen.
    pub fn new<S: Into<String>>(reader: R, name: S) -> Self {
        Lexer {
            input: Input::new(reader, name),
        }
    }

    /// Número de línea actual, para diagnósticos.
    pub fn line(&self) -> u32 {
        self.input.line()
    }

    /// Escanea hasta el final, incluyendo el [`Token::Eof`] terminal.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Located<LexerError>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan()?;
            let done = *token.val() == Token::Eof;

            tokens.push(token);
            if done {
                break Ok(tokens);
            }
        }
    }

    /// Descarta espacios en blanco y retorna el primer carácter útil.
    fn skip(&mut self) -> Result<Option<char>, LexerError> {
        loop {
            match self.input.next()? {
                Some(' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c') => continue,
                other => break Ok(other),
            }
        }
    }

    /// Acumula dígito por dígito una constante entera.
    ///
    /// El primer carácter que no es dígito se devuelve al flujo.
    fn integer(&mut self, first: char) -> Result<i64, LexerError> {
        let mut accumulated = digit_value(first);
        loop {
            match self.input.next()? {
                Some(c) if c.is_ascii_digit() => {
                    accumulated = accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit_value(c)))
                        .ok_or(LexerError::IntOverflow)?;
                }

                Some(c) => {
                    self.input.putback(c);
                    break Ok(accumulated);
                }

                None => break Ok(accumulated),
            }
        }
    }

    fn fail<T>(&self, error: LexerError, location: Location) -> Result<T, Located<LexerError>> {
        Err(Located::at(error, location))
    }
}

impl<R: BufRead> TokenSource for Lexer<R> {
    fn scan(&mut self) -> Result<Located<Token>, Located<LexerError>> {
        use Token::*;

        let next = match self.skip() {
            Ok(next) => next,
            Err(error) => return self.fail(error, self.input.here()),
        };

        let c = match next {
            Some(c) => c,
            None => return Ok(Located::at(Eof, self.input.here())),
        };

        let start = self.input.previous();
        let token = match c {
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => Slash,

            c if c.is_ascii_digit() => match self.integer(c) {
                Ok(integer) => IntLiteral(integer),
                Err(error) => return self.fail(error, self.input.span_from(start)),
            },

            c => {
                return self.fail(
                    LexerError::UnrecognizedChar(c),
                    self.input.span_from(start),
                )
            }
        };

        let location = self.input.span_from(start);
        trace!(%token, %location, "scanned token");

        Ok(Located::at(token, location))
    }
}

fn digit_value(c: char) -> i64 {
    i64::from(c as u8 - b'0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan_one(text: &str) -> Result<Located<Token>, Located<LexerError>> {
        Lexer::new(text.as_bytes(), "<test>").scan()
    }

    fn kinds(text: &str) -> Vec<Token> {
        Lexer::new(text.as_bytes(), "<test>")
            .try_exhaustive()
            .unwrap()
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    #[test]
    fn single_tokens() {
        let cases = [
            ("", Token::Eof),
            ("+", Token::Plus),
            ("-", Token::Minus),
            ("*", Token::Star),
            ("/", Token::Slash),
            ("1", Token::IntLiteral(1)),
            ("21", Token::IntLiteral(21)),
            ("321", Token::IntLiteral(321)),
            ("4321", Token::IntLiteral(4321)),
            ("54321", Token::IntLiteral(54321)),
        ];

        for (text, expected) in cases {
            assert_eq!(scan_one(text).unwrap().into_inner(), expected, "input {:?}", text);
        }
    }

    #[test]
    fn literal_stops_at_operator() {
        assert_eq!(
            kinds("12+3"),
            vec![
                Token::IntLiteral(12),
                Token::Plus,
                Token::IntLiteral(3),
                Token::Eof
            ]
        );
    }

    #[test]
    fn skips_whitespace() {
        assert_eq!(
            kinds(" 2 *\t7 \n / 1\n"),
            vec![
                Token::IntLiteral(2),
                Token::Star,
                Token::IntLiteral(7),
                Token::Slash,
                Token::IntLiteral(1),
                Token::Eof
            ]
        );
    }

    #[test]
    fn eof_is_sticky() {
        let mut lexer = Lexer::new("".as_bytes(), "<test>");
        assert_eq!(*lexer.scan().unwrap().val(), Token::Eof);
        assert_eq!(*lexer.scan().unwrap().val(), Token::Eof);
    }

    #[test]
    fn newline_advances_line() {
        let mut lexer = Lexer::new("\n".as_bytes(), "<test>");
        lexer.scan().unwrap();

        assert_eq!(lexer.line(), 2);
    }

    #[test]
    fn token_locations() {
        let tokens = Lexer::new("1 +\n  42".as_bytes(), "<test>")
            .try_exhaustive()
            .unwrap();

        let literal = tokens[2].location();
        assert_eq!(literal.line(), 2);
        assert_eq!(literal.start().column(), 3);
        assert_eq!(literal.end().column(), 5);
    }

    #[test]
    fn unrecognized_character() {
        let error = scan_one("#").unwrap_err();

        assert!(matches!(error.val(), LexerError::UnrecognizedChar('#')));
        assert_eq!(error.location().line(), 1);
        assert_eq!(error.to_string(), "Unrecognized character \"#\" on line 1");
    }

    #[test]
    fn only_ascii_whitespace_is_skipped() {
        assert_eq!(*scan_one("\x0b\x0c 3").unwrap().val(), Token::IntLiteral(3));

        let error = scan_one("\u{a0}3").unwrap_err();
        assert!(matches!(error.val(), LexerError::UnrecognizedChar('\u{a0}')));
    }

    #[test]
    fn unrecognized_character_after_newline() {
        let mut lexer = Lexer::new("12\n#".as_bytes(), "<test>");
        assert_eq!(*lexer.scan().unwrap().val(), Token::IntLiteral(12));

        let error = lexer.scan().unwrap_err();
        assert_eq!(error.to_string(), "Unrecognized character \"#\" on line 2");
    }

    #[test]
    fn integer_overflow() {
        let error = scan_one("99999999999999999999").unwrap_err();
        assert!(matches!(error.val(), LexerError::IntOverflow));
    }
}

//! Análisis sintáctico.
//!
//! Las expresiones se resuelven por *precedence climbing*: cada operador
//! binario tiene una precedencia numérica y el parser solo continúa
//! extendiendo el lado derecho mientras encuentre operadores que liguen
//! estrictamente más fuerte que el umbral actual. La comparación estricta
//! es lo que vuelve asociativos por la izquierda a los operadores de igual
//! precedencia.

use std::fmt::{self, Display};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    lex::{LexerError, Token, TokenSource},
    source::Located,
};

/// Árbol sintáctico de una expresión.
///
/// Cada nodo es dueño exclusivo de sus hijos. Un nodo binario siempre
/// tiene exactamente dos hijos y una hoja ninguno.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Integer(i64),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Construye un nodo binario.
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Determina si este nodo es una hoja.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Expr::Integer(_))
    }
}

/// Forma infija con paréntesis explícitos en cada nodo binario.
impl Display for Expr {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(integer) => write!(fmt, "{}", integer),
            Expr::Binary { op, lhs, rhs } => write!(fmt, "({} {} {})", lhs, op, rhs),
        }
    }
}

/// Operador binario aritmético.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    /// Precedencia del operador. Mayor precedencia liga más fuerte.
    pub fn precedence(self) -> u32 {
        match self {
            BinOp::Add | BinOp::Sub => 10,
            BinOp::Mul | BinOp::Div => 20,
        }
    }

    /// Operador correspondiente a un token, si lo hay.
    pub fn from_token(token: &Token) -> Option<BinOp> {
        match token {
            Token::Plus => Some(BinOp::Add),
            Token::Minus => Some(BinOp::Sub),
            Token::Star => Some(BinOp::Mul),
            Token::Slash => Some(BinOp::Div),
            _ => None,
        }
    }
}

impl Display for BinOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
        };

        fmt.write_str(symbol)
    }
}

/// Mayor profundidad de árbol que acepta el parser.
///
/// Todo recorrido posterior del árbol es recursivo, así que esta cota
/// también acota el uso de pila de evaluación y generación de código.
pub const MAX_DEPTH: usize = 1000;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Syntax error, expected an integer literal but found {0}")]
    ExpectedPrimary(Token),

    #[error("Syntax error, expected an arithmetic operator but found {0}")]
    ExpectedOperator(Token),

    #[error("Syntax error, unexpected {0} after expression")]
    TrailingInput(Token),

    #[error("Expression is too deep, at most {max} nested operations are supported", max = MAX_DEPTH)]
    TooDeep,

    #[error(transparent)]
    Lexer(#[from] LexerError),
}

type Parse<T> = Result<T, Located<ParserError>>;

/// Analiza una expresión completa.
///
/// La entrada debe agotarse: el token que sigue a la expresión tiene
/// que ser [`Token::Eof`].
pub fn parse<S: TokenSource>(tokens: S) -> Parse<Expr> {
    let mut parser = Parser::new(tokens);
    let (expr, lookahead) = parser.expression(0)?;

    if *lookahead.val() != Token::Eof {
        return Err(lookahead.map(ParserError::TrailingInput));
    }

    debug!(%expr, "parsed expression");
    Ok(expr)
}

/// Parser por precedence climbing sobre una fuente de tokens.
pub struct Parser<S> {
    tokens: S,
}

impl<S: TokenSource> Parser<S> {
    pub fn new(tokens: S) -> Self {
        Parser { tokens }
    }

    /// Analiza una expresión cuyos operadores liguen más fuerte que
    /// `min_precedence`.
    ///
    /// Retorna el árbol acumulado junto al token que lo terminó, el cual
    /// aún no ha sido consumido por ninguna regla.
    pub fn expression(&mut self, min_precedence: u32) -> Parse<(Expr, Located<Token>)> {
        let (expr, _, lookahead) = self.climb(min_precedence)?;
        Ok((expr, lookahead))
    }

    /// Igual que [`Parser::expression()`], pero lleva la profundidad del
    /// árbol acumulado.
    fn climb(&mut self, min_precedence: u32) -> Parse<(Expr, usize, Located<Token>)> {
        let mut lhs = self.primary()?;
        let mut depth = 0;
        let mut lookahead = self.next()?;

        while *lookahead.val() != Token::Eof {
            let op = self.operator(&lookahead)?;
            if op.precedence() <= min_precedence {
                break;
            }

            trace!(%op, min_precedence, "climbing");

            let (rhs, rhs_depth, next) = self.climb(op.precedence())?;
            depth = 1 + depth.max(rhs_depth);
            if depth > MAX_DEPTH {
                return Err(lookahead.map(|_| ParserError::TooDeep));
            }

            lhs = Expr::binary(op, lhs, rhs);
            lookahead = next;
        }

        Ok((lhs, depth, lookahead))
    }

    /// Expresión primaria. Por el momento solo existen literales enteros.
    fn primary(&mut self) -> Parse<Expr> {
        let (location, token) = self.next()?.split();
        match token {
            Token::IntLiteral(integer) => Ok(Expr::Integer(integer)),
            _ => Err(Located::at(ParserError::ExpectedPrimary(token), location)),
        }
    }

    fn operator(&self, token: &Located<Token>) -> Parse<BinOp> {
        BinOp::from_token(token.val()).ok_or_else(|| {
            Located::at(
                ParserError::ExpectedOperator(*token.val()),
                token.location().clone(),
            )
        })
    }

    fn next(&mut self) -> Parse<Located<Token>> {
        self.tokens
            .scan()
            .map_err(|error| error.map(ParserError::Lexer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::Lexer;
    use pretty_assertions::assert_eq;

    use BinOp::*;

    fn int(value: i64) -> Expr {
        Expr::Integer(value)
    }

    fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::binary(op, lhs, rhs)
    }

    fn parse_str(text: &str) -> Parse<Expr> {
        parse(Lexer::new(text.as_bytes(), "<test>"))
    }

    #[test]
    fn single_literal() {
        let expr = parse_str("5").unwrap();

        assert_eq!(expr, int(5));
        assert!(expr.is_leaf());
    }

    #[test]
    fn expression_returns_eof_lookahead() {
        let mut lexer = Lexer::new("1 + 2".as_bytes(), "<test>");
        let (expr, lookahead) = Parser::new(&mut lexer).expression(0).unwrap();

        assert_eq!(expr, bin(Add, int(1), int(2)));
        assert_eq!(*lookahead.val(), Token::Eof);
    }

    #[test]
    fn addition_is_left_associative() {
        assert_eq!(
            parse_str("1 + 2 + 3").unwrap(),
            bin(Add, bin(Add, int(1), int(2)), int(3))
        );
    }

    #[test]
    fn multiplication_is_left_associative() {
        assert_eq!(
            parse_str("1 * 2 * 3").unwrap(),
            bin(Mul, bin(Mul, int(1), int(2)), int(3))
        );
    }

    #[test]
    fn subtraction_and_division_are_left_associative() {
        assert_eq!(
            parse_str("8 - 4 - 2").unwrap(),
            bin(Sub, bin(Sub, int(8), int(4)), int(2))
        );

        assert_eq!(
            parse_str("8 / 4 / 2").unwrap(),
            bin(Div, bin(Div, int(8), int(4)), int(2))
        );
    }

    #[test]
    fn multiplication_binds_tighter_on_the_left() {
        assert_eq!(
            parse_str("1 * 2 + 3").unwrap(),
            bin(Add, bin(Mul, int(1), int(2)), int(3))
        );
    }

    #[test]
    fn multiplication_binds_tighter_on_the_right() {
        assert_eq!(
            parse_str("1 + 2 * 3").unwrap(),
            bin(Add, int(1), bin(Mul, int(2), int(3)))
        );
    }

    #[test]
    fn mixed_chain() {
        // 2 * 3 + 4 * 5 - 6 / 2
        assert_eq!(
            parse_str("2 * 3 + 4 * 5 - 6 / 2").unwrap(),
            bin(
                Sub,
                bin(Add, bin(Mul, int(2), int(3)), bin(Mul, int(4), int(5))),
                bin(Div, int(6), int(2)),
            )
        );
    }

    #[test]
    fn display_is_fully_parenthesized() {
        let expr = parse_str("1 + 2 * 3 - 4").unwrap();
        assert_eq!(expr.to_string(), "((1 + (2 * 3)) - 4)");
    }

    #[test]
    fn missing_primary() {
        let error = parse_str("*").unwrap_err();

        assert!(matches!(error.val(), ParserError::ExpectedPrimary(Token::Star)));
        assert_eq!(
            error.to_string(),
            "Syntax error, expected an integer literal but found `*` on line 1"
        );
    }

    #[test]
    fn dangling_operator() {
        let error = parse_str("1 +\n").unwrap_err();
        assert!(matches!(error.val(), ParserError::ExpectedPrimary(Token::Eof)));
    }

    #[test]
    fn empty_input() {
        let error = parse_str("").unwrap_err();
        assert!(matches!(error.val(), ParserError::ExpectedPrimary(Token::Eof)));
    }

    #[test]
    fn literal_where_operator_expected() {
        let error = parse_str("1 +\n2 3").unwrap_err();

        assert!(matches!(
            error.val(),
            ParserError::ExpectedOperator(Token::IntLiteral(3))
        ));
        assert_eq!(error.location().line(), 2);
    }

    #[test]
    fn lexer_errors_propagate() {
        let error = parse_str("1 + #").unwrap_err();
        assert!(matches!(
            error.val(),
            ParserError::Lexer(LexerError::UnrecognizedChar('#'))
        ));
    }

    #[test]
    fn precedence_table() {
        assert_eq!(Add.precedence(), Sub.precedence());
        assert_eq!(Mul.precedence(), Div.precedence());
        assert!(Mul.precedence() > Add.precedence());
        assert_eq!(BinOp::from_token(&Token::IntLiteral(1)), None);
        assert_eq!(BinOp::from_token(&Token::Slash), Some(Div));
    }

    /// Reproduce tokens ya escaneados, repitiendo el último al agotarse.
    struct Replay(Vec<Located<Token>>);

    impl TokenSource for Replay {
        fn scan(&mut self) -> Result<Located<Token>, Located<LexerError>> {
            let token = if self.0.len() > 1 {
                self.0.remove(0)
            } else {
                self.0[0].clone()
            };

            Ok(token)
        }
    }

    #[test]
    fn parses_from_any_token_source() {
        let tokens = Lexer::new("2 * 3 + 4".as_bytes(), "<test>")
            .try_exhaustive()
            .unwrap();

        assert_eq!(
            parse(Replay(tokens)).unwrap(),
            bin(Add, bin(Mul, int(2), int(3)), int(4))
        );
    }

    fn chain(operations: usize) -> String {
        let mut text = String::from("1");
        for _ in 0..operations {
            text.push_str("+1");
        }

        text
    }

    #[test]
    fn deepest_accepted_tree() {
        let expr = parse_str(&chain(MAX_DEPTH)).unwrap();
        assert_eq!(crate::interp::evaluate(&expr).unwrap(), MAX_DEPTH as i64 + 1);
    }

    #[test]
    fn long_chain_is_too_deep() {
        let error = parse_str(&format!("2 *\n{}", chain(30_000))).unwrap_err();

        assert!(matches!(error.val(), ParserError::TooDeep));
        assert_eq!(error.location().line(), 2);
        assert_eq!(
            error.to_string(),
            format!(
                "Expression is too deep, at most {} nested operations are supported on line 2",
                MAX_DEPTH
            )
        );
    }
}

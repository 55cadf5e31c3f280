//! Angular Expression AST
//!
//! Node types produced by the expression parser for bindings, interpolations and event
//! handlers. The parser itself lives outside this crate; ingestion consumes these trees.

use serde::{Deserialize, Serialize};

/// Absolute source span for mapping back to source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsoluteSourceSpan {
    pub start: usize,
    pub end: usize,
}

impl AbsoluteSourceSpan {
    pub fn new(start: usize, end: usize) -> Self {
        AbsoluteSourceSpan { start, end }
    }
}

/// Main AST enum containing all node types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AST {
    EmptyExpr(EmptyExpr),
    ImplicitReceiver(ImplicitReceiver),
    ThisReceiver(ThisReceiver),
    Chain(Chain),
    Conditional(Conditional),
    PropertyRead(PropertyRead),
    SafePropertyRead(SafePropertyRead),
    KeyedRead(KeyedRead),
    SafeKeyedRead(SafeKeyedRead),
    BindingPipe(BindingPipe),
    LiteralPrimitive(LiteralPrimitive),
    LiteralArray(LiteralArray),
    LiteralMap(LiteralMap),
    Interpolation(Interpolation),
    Binary(Binary),
    PrefixNot(PrefixNot),
    Unary(Unary),
    TypeofExpression(TypeofExpression),
    NonNullAssert(NonNullAssert),
    Call(Call),
    SafeCall(SafeCall),
    PropertyWrite(PropertyWrite),
    KeyedWrite(KeyedWrite),
    ParenthesizedExpression(ParenthesizedExpression),
}

/// Empty expression
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmptyExpr {
    pub source_span: AbsoluteSourceSpan,
}

/// Implicit receiver (the component instance)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImplicitReceiver {
    pub source_span: AbsoluteSourceSpan,
}

/// This receiver (explicit `this`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThisReceiver {
    pub source_span: AbsoluteSourceSpan,
}

/// Chain of expressions (e.g., `a; b; c`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub source_span: AbsoluteSourceSpan,
    pub expressions: Vec<AST>,
}

/// Ternary conditional (e.g., `condition ? true : false`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conditional {
    pub source_span: AbsoluteSourceSpan,
    pub condition: Box<AST>,
    pub true_exp: Box<AST>,
    pub false_exp: Box<AST>,
}

/// Property read (e.g., `obj.property`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRead {
    pub source_span: AbsoluteSourceSpan,
    pub receiver: Box<AST>,
    pub name: String,
}

/// Property write (e.g., `obj.property = value`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyWrite {
    pub source_span: AbsoluteSourceSpan,
    pub receiver: Box<AST>,
    pub name: String,
    pub value: Box<AST>,
}

/// Safe property read (e.g., `obj?.property`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafePropertyRead {
    pub source_span: AbsoluteSourceSpan,
    pub receiver: Box<AST>,
    pub name: String,
}

/// Keyed read (e.g., `obj[key]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedRead {
    pub source_span: AbsoluteSourceSpan,
    pub receiver: Box<AST>,
    pub key: Box<AST>,
}

/// Keyed write (e.g., `obj[key] = value`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedWrite {
    pub source_span: AbsoluteSourceSpan,
    pub receiver: Box<AST>,
    pub key: Box<AST>,
    pub value: Box<AST>,
}

/// Safe keyed read (e.g., `obj?.[key]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeKeyedRead {
    pub source_span: AbsoluteSourceSpan,
    pub receiver: Box<AST>,
    pub key: Box<AST>,
}

/// Pipe binding (e.g., `value | pipeName:arg1:arg2`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingPipe {
    pub source_span: AbsoluteSourceSpan,
    pub exp: Box<AST>,
    pub name: String,
    pub args: Vec<AST>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "literalType", content = "value")]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
}

/// Literal primitive (string, number, boolean, null, undefined)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralPrimitive {
    pub source_span: AbsoluteSourceSpan,
    pub value: LiteralValue,
}

/// Array literal (e.g., `[1, 2, 3]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralArray {
    pub source_span: AbsoluteSourceSpan,
    pub expressions: Vec<AST>,
}

/// Map literal key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralMapKey {
    pub key: String,
    pub quoted: bool,
}

/// Object literal (e.g., `{a: 1, b: 2}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralMap {
    pub source_span: AbsoluteSourceSpan,
    pub keys: Vec<LiteralMapKey>,
    pub values: Vec<AST>,
}

/// Interpolation (e.g., `Hello {{name}}!`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interpolation {
    pub source_span: AbsoluteSourceSpan,
    pub strings: Vec<String>,
    pub expressions: Vec<AST>,
}

/// Binary operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binary {
    pub source_span: AbsoluteSourceSpan,
    pub operation: String,
    pub left: Box<AST>,
    pub right: Box<AST>,
}

/// Prefix not operator (e.g., `!expr`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixNot {
    pub source_span: AbsoluteSourceSpan,
    pub expression: Box<AST>,
}

/// Unary operator (e.g., `+expr`, `-expr`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unary {
    pub source_span: AbsoluteSourceSpan,
    pub operator: String,
    pub expr: Box<AST>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeofExpression {
    pub source_span: AbsoluteSourceSpan,
    pub expression: Box<AST>,
}

/// Function call (e.g., `fn(a, b)`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub source_span: AbsoluteSourceSpan,
    pub receiver: Box<AST>,
    pub args: Vec<AST>,
}

/// Safe function call (e.g., `fn?.(a, b)`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeCall {
    pub source_span: AbsoluteSourceSpan,
    pub receiver: Box<AST>,
    pub args: Vec<AST>,
}

/// Non-null assertion (e.g., `expr!`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonNullAssert {
    pub source_span: AbsoluteSourceSpan,
    pub expression: Box<AST>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParenthesizedExpression {
    pub source_span: AbsoluteSourceSpan,
    pub expression: Box<AST>,
}

impl AST {
    pub fn source_span(&self) -> AbsoluteSourceSpan {
        match self {
            AST::EmptyExpr(e) => e.source_span,
            AST::ImplicitReceiver(e) => e.source_span,
            AST::ThisReceiver(e) => e.source_span,
            AST::Chain(e) => e.source_span,
            AST::Conditional(e) => e.source_span,
            AST::PropertyRead(e) => e.source_span,
            AST::SafePropertyRead(e) => e.source_span,
            AST::KeyedRead(e) => e.source_span,
            AST::SafeKeyedRead(e) => e.source_span,
            AST::BindingPipe(e) => e.source_span,
            AST::LiteralPrimitive(e) => e.source_span,
            AST::LiteralArray(e) => e.source_span,
            AST::LiteralMap(e) => e.source_span,
            AST::Interpolation(e) => e.source_span,
            AST::Binary(e) => e.source_span,
            AST::PrefixNot(e) => e.source_span,
            AST::Unary(e) => e.source_span,
            AST::TypeofExpression(e) => e.source_span,
            AST::NonNullAssert(e) => e.source_span,
            AST::Call(e) => e.source_span,
            AST::SafeCall(e) => e.source_span,
            AST::PropertyWrite(e) => e.source_span,
            AST::KeyedWrite(e) => e.source_span,
            AST::ParenthesizedExpression(e) => e.source_span,
        }
    }

    pub fn is_implicit_receiver(&self) -> bool {
        matches!(self, AST::ImplicitReceiver(_))
    }

    // Helper constructors, used by callers that assemble trees without the parser.

    pub fn empty() -> AST {
        AST::EmptyExpr(EmptyExpr::default())
    }

    /// `name` read from the implicit receiver.
    pub fn read(name: impl Into<String>) -> AST {
        AST::ImplicitReceiver(ImplicitReceiver::default()).prop(name)
    }

    pub fn prop(self, name: impl Into<String>) -> AST {
        AST::PropertyRead(PropertyRead {
            source_span: AbsoluteSourceSpan::default(),
            receiver: Box::new(self),
            name: name.into(),
        })
    }

    pub fn safe_prop(self, name: impl Into<String>) -> AST {
        AST::SafePropertyRead(SafePropertyRead {
            source_span: AbsoluteSourceSpan::default(),
            receiver: Box::new(self),
            name: name.into(),
        })
    }

    pub fn key_read(self, key: AST) -> AST {
        AST::KeyedRead(KeyedRead {
            source_span: AbsoluteSourceSpan::default(),
            receiver: Box::new(self),
            key: Box::new(key),
        })
    }

    pub fn call(self, args: Vec<AST>) -> AST {
        AST::Call(Call {
            source_span: AbsoluteSourceSpan::default(),
            receiver: Box::new(self),
            args,
        })
    }

    pub fn pipe(self, name: impl Into<String>, args: Vec<AST>) -> AST {
        AST::BindingPipe(BindingPipe {
            source_span: AbsoluteSourceSpan::default(),
            exp: Box::new(self),
            name: name.into(),
            args,
        })
    }

    pub fn binary(operation: impl Into<String>, left: AST, right: AST) -> AST {
        AST::Binary(Binary {
            source_span: AbsoluteSourceSpan::default(),
            operation: operation.into(),
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn assign(self, value: AST) -> AST {
        match self {
            AST::KeyedRead(read) => AST::KeyedWrite(KeyedWrite {
                source_span: read.source_span,
                receiver: read.receiver,
                key: read.key,
                value: Box::new(value),
            }),
            AST::PropertyRead(read) => AST::PropertyWrite(PropertyWrite {
                source_span: read.source_span,
                receiver: read.receiver,
                name: read.name,
                value: Box::new(value),
            }),
            other => AST::binary("=", other, value),
        }
    }

    pub fn string(value: impl Into<String>) -> AST {
        AST::literal(LiteralValue::String(value.into()))
    }

    pub fn number(value: f64) -> AST {
        AST::literal(LiteralValue::Number(value))
    }

    pub fn boolean(value: bool) -> AST {
        AST::literal(LiteralValue::Boolean(value))
    }

    pub fn literal(value: LiteralValue) -> AST {
        AST::LiteralPrimitive(LiteralPrimitive {
            source_span: AbsoluteSourceSpan::default(),
            value,
        })
    }

    pub fn array(expressions: Vec<AST>) -> AST {
        AST::LiteralArray(LiteralArray {
            source_span: AbsoluteSourceSpan::default(),
            expressions,
        })
    }

    pub fn map(entries: Vec<(&str, AST)>) -> AST {
        let (keys, values) = entries
            .into_iter()
            .map(|(key, value)| {
                (
                    LiteralMapKey {
                        key: key.to_string(),
                        quoted: false,
                    },
                    value,
                )
            })
            .unzip();
        AST::LiteralMap(LiteralMap {
            source_span: AbsoluteSourceSpan::default(),
            keys,
            values,
        })
    }

    pub fn chain(expressions: Vec<AST>) -> AST {
        AST::Chain(Chain {
            source_span: AbsoluteSourceSpan::default(),
            expressions,
        })
    }

    /// An interpolation; `strings` must have one more entry than `expressions`.
    pub fn interpolation(strings: Vec<&str>, expressions: Vec<AST>) -> AST {
        AST::Interpolation(Interpolation {
            source_span: AbsoluteSourceSpan::default(),
            strings: strings.into_iter().map(str::to_string).collect(),
            expressions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_uses_implicit_receiver() {
        match AST::read("name") {
            AST::PropertyRead(read) => {
                assert_eq!(read.name, "name");
                assert!(read.receiver.is_implicit_receiver());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn assign_turns_reads_into_writes() {
        assert!(matches!(AST::read("a").assign(AST::number(1.0)), AST::PropertyWrite(_)));
        assert!(matches!(
            AST::read("a").key_read(AST::number(0.0)).assign(AST::number(1.0)),
            AST::KeyedWrite(_)
        ));
    }

    #[test]
    fn ast_round_trips_through_json() {
        let ast = AST::read("user").safe_prop("name").pipe("uppercase", vec![]);
        let json = serde_json::to_string(&ast).unwrap();
        let back: AST = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, AST::BindingPipe(pipe) if pipe.name == "uppercase"));
    }
}

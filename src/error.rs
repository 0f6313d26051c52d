//! Error types for template compilation, rendering, rules and routing.

use thiserror::Error;

/// Malformed template syntax found while tokenizing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("expression opened at offset {0} is never closed")]
    UnterminatedExpression(usize),
    #[error("string literal starting at offset {0} is never closed")]
    UnterminatedString(usize),
    #[error("variable name at offset {0} can't be empty")]
    EmptyVariableName(usize),
    #[error("block name at offset {0} can't be empty")]
    EmptyBlockName(usize),
    #[error("invalid number at offset {0}")]
    InvalidNumber(usize),
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },
}

/// Grammar violations found while building the node tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expression contains more nodes than expected")]
    TooManyNodes,
    #[error("block '{0}' can't be used inside a sub-expression")]
    BlockInSubExpression(String),
    #[error("block '{expected}' closed by '/{found}'")]
    MismatchedBlockEnd { expected: String, found: String },
    #[error("block '{0}' is never closed")]
    UnclosedBlock(String),
    #[error("unexpected block end '/{0}'")]
    UnexpectedBlockEnd(String),
    #[error("expected {expected}, but got {found}")]
    UnexpectedToken { expected: String, found: String },
}

/// Either half of template compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

/// Fatal rendering failure. Aborts the whole render.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("variable '{0}' doesn't exist")]
    UndefinedVariable(String),
    #[error("function '{0}' is not defined")]
    UndefinedFunction(String),
    #[error("{function}: {message}")]
    InvalidArguments { function: String, message: String },
    #[error("#{block}: {message}")]
    InvalidBlock { block: String, message: String },
    #[error("unknown block '#{0}'")]
    UnknownBlock(String),
    #[error("unknown faker path '{0}'")]
    UnknownFakerPath(String),
}

impl EvalError {
    pub(crate) fn args(function: &str, message: impl Into<String>) -> Self {
        EvalError::InvalidArguments {
            function: function.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn block(block: &str, message: impl Into<String>) -> Self {
        EvalError::InvalidBlock {
            block: block.to_string(),
            message: message.into(),
        }
    }
}

/// A rule definition that can't be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleConstructionError {
    #[error("rule key can't be empty")]
    EmptyKey,
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
    #[error("unknown rule operation '{0}'")]
    UnknownOperation(String),
    #[error("rule needs either a 'type' or an aggregate 'operation' with 'rules'")]
    MissingDiscriminator,
    #[error("unknown rule type '{0}'")]
    UnknownRuleType(String),
    #[error("aggregate rule '{0}' has no 'rules' list")]
    MissingRules(String),
}

/// A rule was evaluated against an input that can't serve its field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleEvaluationError {
    #[error("rule input has no {0} data")]
    MissingCapability(&'static str),
}

/// A route URL template that can't be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlTemplateError {
    #[error("unbalanced braces in template '{0}'")]
    UnbalancedBraces(String),
    #[error("parameter name can't be empty in template '{0}'")]
    EmptyParameterName(String),
    #[error("parameter '{0}' is declared twice")]
    DuplicateParameter(String),
    #[error("unknown route constraint '{0}'")]
    UnknownConstraint(String),
    #[error("invalid route constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },
    #[error("catch-all parameter '{0}' must be the last segment")]
    CatchAllNotLast(String),
    #[error("parameter '{0}' can't be both optional and have a default value")]
    OptionalWithDefault(String),
    #[error("parameter '{0}' in a complex segment can't be optional, defaulted or catch-all")]
    ComplexSegmentParameter(String),
}

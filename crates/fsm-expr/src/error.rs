// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character {ch:?} at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unterminated string literal starting at position {pos}")]
    UnterminatedString { pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEof,
    #[error("unexpected token at position {pos}: {found}")]
    UnexpectedToken { pos: usize, found: String },
    #[error("trailing input after a complete expression at position {pos}")]
    TrailingInput { pos: usize },
    #[error("type error: {0}")]
    TypeMismatch(String),
    #[error("division by zero")]
    DivisionByZero,
}

pub type Result<T> = std::result::Result<T, ExprError>;

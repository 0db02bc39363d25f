// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for runtime construction and dispatch (§7).

use fsm_core::{DeclarationError, DispatchError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{} declaration error(s)", .0.len())]
    Declaration(Vec<DeclarationError>),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Storage(#[from] fsm_storage::StorageError),

    #[error("expression error evaluating {context}: {source}")]
    Expression {
        context: String,
        #[source]
        source: fsm_expr::ExprError,
    },
}

impl EngineError {
    pub fn declaration_errors(&self) -> Option<&[DeclarationError]> {
        match self {
            EngineError::Declaration(errs) => Some(errs),
            _ => None,
        }
    }
}

// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Equity calculator errors.
use thiserror::Error;

pub use riverline_cards::ParseError;

/// Errors returned by the equity calculator.
///
/// A run stopped with [EquityCalculator::stop](crate::EquityCalculator::stop)
/// is not an error, its results are valid and are reported with the
/// [StopReason::UserStopped](crate::StopReason::UserStopped) reason.
#[derive(Debug, Error)]
pub enum EquityError {
    /// Malformed card or range text.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// The simulation configuration is not valid.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The calculator API was called out of sequence or a run failed.
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl EquityError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}

//! Error types for the entiq core.

use crate::specification::Sign;
use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in entiq core operations.
///
/// The variants fall into distinct kinds so calling code can react
/// appropriately: validation failures (`InvalidId`), capability mismatches
/// (`ComparisonNotSupported`, `OnlyAndCompositeSupported`,
/// `SpecificationNotSupported`), mutation-protocol violations
/// (`NestedMutationNotSupported`, `MutationOutsideOfContext`), the expected
/// sequence-contract signal (`NoElementMatchingPredicateFound`) and faults
/// reported by the underlying store (`Store`).
#[derive(Debug, Error)]
pub enum Error {
    /// The given string is not a valid UUID.
    #[error("'{value}' is not a valid uuid")]
    InvalidId {
        /// The rejected input.
        value: String,
    },

    /// The criteria compiler only accepts equality comparisons.
    #[error("comparison not supported: {sign}")]
    ComparisonNotSupported {
        /// The sign that cannot be expressed as criteria.
        sign: Sign,
    },

    /// The criteria compiler only accepts AND composites.
    #[error("only and composites are supported")]
    OnlyAndCompositeSupported,

    /// The query compiler was given a specification it cannot express.
    #[error("specification not supported: {message}")]
    SpecificationNotSupported {
        /// Why the specification is not compilable.
        message: String,
    },

    /// A mutation context was opened inside another mutation context.
    #[error("nested mutations are not supported")]
    NestedMutationNotSupported,

    /// A write was attempted outside of a mutation context.
    #[error("mutation outside of a mutation context")]
    MutationOutsideOfContext,

    /// `find` ran through the whole sequence without a match.
    ///
    /// This is an expected control-flow signal, not a bug indicator.
    #[error("no element matching the predicate found")]
    NoElementMatchingPredicateFound,

    /// Fault reported by the underlying store.
    #[error("store fault: {message}")]
    Store {
        /// Description of the fault, as reported by the store.
        message: String,
    },
}

impl Error {
    /// Creates an invalid identifier error.
    pub fn invalid_id(value: impl Into<String>) -> Self {
        Self::InvalidId {
            value: value.into(),
        }
    }

    /// Creates an unsupported specification error.
    pub fn specification_not_supported(message: impl Into<String>) -> Self {
        Self::SpecificationNotSupported {
            message: message.into(),
        }
    }

    /// Creates a store fault.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}

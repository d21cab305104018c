//! Criteria compiler.
//!
//! Flattens a specification tree into the flat property→value map accepted
//! by stores without a query-builder capability. Only AND composites of
//! equality comparators can be expressed that way; anything else fails
//! fast rather than being partially translated.

use crate::error::{Error, Result};
use crate::specification::{Operator, Sign, Specification};
use crate::store::Criteria;

/// Flattens `specification` into a criteria map.
///
/// AND composites merge left then right, the right side overwriting on a
/// key collision. A comparator with a sign other than equality fails with
/// [`Error::ComparisonNotSupported`]; an OR composite or a negation fails
/// with [`Error::OnlyAndCompositeSupported`]. A child specification
/// degrades to the AND composite it is.
pub fn to_criteria(specification: &Specification) -> Result<Criteria> {
    match specification {
        Specification::Comparator(comparator) => {
            if comparator.sign() != Sign::Equality {
                return Err(Error::ComparisonNotSupported {
                    sign: comparator.sign(),
                });
            }

            let mut criteria = Criteria::new();
            criteria.insert(comparator.property().to_owned(), comparator.value().clone());
            Ok(criteria)
        }
        Specification::JsonArray(comparator) => Err(Error::ComparisonNotSupported {
            sign: comparator.sign(),
        }),
        Specification::Composite(composite) => {
            if composite.operator() != Operator::And {
                return Err(Error::OnlyAndCompositeSupported);
            }

            let mut criteria = to_criteria(composite.left())?;
            criteria.extend(to_criteria(composite.right())?);
            Ok(criteria)
        }
        Specification::Child(child) => {
            let mut criteria = to_criteria(&Specification::from(child.left().clone()))?;
            criteria.extend(to_criteria(child.right())?);
            Ok(criteria)
        }
        Specification::Not(_) => Err(Error::OnlyAndCompositeSupported),
    }
}

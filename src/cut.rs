//! A `Cut` is the predicate attached to a branch. The wire format only has
//! two operator glyphs, `<` and `>`, where `>` stands for "greater than or
//! equal" — the original tool's convention, kept here for round-trip
//! fidelity with the weights file.

use crate::error::DataError;
use crate::row::RowCursor;

#[derive(Debug, Clone, PartialEq)]
pub enum Cut {
    Less { variable: String, threshold: f64 },
    GreaterEq { variable: String, threshold: f64 },
}

impl Cut {
    pub fn pass(&self, cursor: &dyn RowCursor) -> Result<bool, DataError> {
        match self {
            Cut::Less { variable, threshold } => Ok(cursor.value(variable)? < *threshold),
            Cut::GreaterEq { variable, threshold } => Ok(cursor.value(variable)? >= *threshold),
        }
    }

    pub fn variable(&self) -> &str {
        match self {
            Cut::Less { variable, .. } | Cut::GreaterEq { variable, .. } => variable,
        }
    }

    pub fn threshold(&self) -> f64 {
        match self {
            Cut::Less { threshold, .. } | Cut::GreaterEq { threshold, .. } => *threshold,
        }
    }

    pub fn is_greater_eq(&self) -> bool {
        matches!(self, Cut::GreaterEq { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::InMemoryRows;

    #[test]
    fn less_and_greater_eq_partition_a_threshold() {
        let mut rows = InMemoryRows::new("w").with_column("pt", vec![0.5, 1.0, 1.5]);
        let low = Cut::Less {
            variable: "pt".into(),
            threshold: 1.0,
        };
        let high = Cut::GreaterEq {
            variable: "pt".into(),
            threshold: 1.0,
        };
        for i in 0..3 {
            rows.get_row(i).unwrap();
            assert_ne!(low.pass(&rows).unwrap(), high.pass(&rows).unwrap());
        }
    }
}

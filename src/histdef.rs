//! Range discovery: before any tree grows, every variable's [xmin, xmax)
//! is found by scanning target rows then source rows, mirroring
//! `HistDefs::UpdateVariableRanges` being called first on the target tree
//! and then the source tree in each `Algorithm::Initialize`.

use crate::error::DataError;
use crate::row::RowCursor;
use crate::variable::VariableRegistry;

pub const DEFAULT_NBINS: usize = 100;

#[derive(Debug, Clone)]
pub struct HistDef {
    pub variable: String,
    pub xmin: f64,
    pub xmax: f64,
    pub nbins: usize,
}

pub fn discover_ranges(
    registry: &VariableRegistry,
    target: &mut dyn RowCursor,
    source: &mut dyn RowCursor,
) -> Result<Vec<HistDef>, DataError> {
    let n = registry.len();
    let mut mins = vec![f64::INFINITY; n];
    let mut maxs = vec![f64::NEG_INFINITY; n];

    scan_into(target, registry, &mut mins, &mut maxs)?;
    scan_into(source, registry, &mut mins, &mut maxs)?;

    registry
        .names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if !(mins[i] < maxs[i]) {
                return Err(DataError::InvalidHistRange {
                    variable: name.clone(),
                    xmin: mins[i],
                    xmax: maxs[i],
                });
            }
            Ok(HistDef {
                variable: name.clone(),
                xmin: mins[i],
                xmax: maxs[i],
                nbins: DEFAULT_NBINS,
            })
        })
        .collect()
}

fn scan_into(
    cursor: &mut dyn RowCursor,
    registry: &VariableRegistry,
    mins: &mut [f64],
    maxs: &mut [f64],
) -> Result<(), DataError> {
    for i in 0..cursor.row_count() {
        cursor.get_row(i)?;
        for (vi, name) in registry.names().iter().enumerate() {
            let v = cursor.value(name)?;
            if v < mins[vi] {
                mins[vi] = v;
            }
            if v > maxs[vi] {
                maxs[vi] = v;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::InMemoryRows;

    #[test]
    fn range_spans_both_samples() {
        let mut reg = VariableRegistry::new();
        reg.register("pt").unwrap();
        let mut target = InMemoryRows::new("w")
            .with_column("pt", vec![1.0, 5.0])
            .with_column("w", vec![1.0, 1.0]);
        let mut source = InMemoryRows::new("w")
            .with_column("pt", vec![-2.0, 3.0])
            .with_column("w", vec![1.0, 1.0]);
        let defs = discover_ranges(&reg, &mut target, &mut source).unwrap();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].xmin, -2.0);
        assert_eq!(defs[0].xmax, 5.0);
    }

    #[test]
    fn constant_variable_is_an_error() {
        let mut reg = VariableRegistry::new();
        reg.register("pt").unwrap();
        let mut target = InMemoryRows::new("w")
            .with_column("pt", vec![1.0, 1.0])
            .with_column("w", vec![1.0, 1.0]);
        let mut source = InMemoryRows::new("w")
            .with_column("pt", vec![1.0])
            .with_column("w", vec![1.0]);
        assert!(discover_ranges(&reg, &mut target, &mut source).is_err());
    }
}

//! Joining persisted change data back into a new grid version.

use gridworks_model::{Grid, Row};

use crate::error::ChangeError;
use crate::store::ChangeData;

/// Produce a new grid whose covered rows are rewritten by `joiner`; every
/// uncovered row is carried over untouched. Pure: the same change data and
/// grid always yield the same result.
///
/// The change data must have been computed against exactly this grid
/// version; anything else is rejected rather than silently applied to the
/// wrong rows.
pub fn join_rows<T, F>(
    grid: &Grid,
    change_data: &ChangeData<T>,
    joiner: F,
) -> Result<Grid, ChangeError>
where
    F: Fn(u64, &Row, &T) -> Row,
{
    if change_data.version != grid.version() {
        return Err(ChangeError::GridMismatch {
            expected: change_data.version,
            found: grid.version(),
        });
    }

    let rows = grid
        .iter_indexed()
        .map(|ir| match change_data.get(ir.index) {
            Some(value) => joiner(ir.index, ir.row, value),
            None => ir.row.clone(),
        })
        .collect();

    Ok(grid.with_rows(rows))
}

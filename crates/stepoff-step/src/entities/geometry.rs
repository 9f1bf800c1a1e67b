//! Point geometry.

use super::{expect_kind, EntityArgs};
use crate::error::StepError;
use crate::parser::Record;
use nalgebra::Point3;

/// Parse a CARTESIAN_POINT record.
///
/// STEP syntax: `CARTESIAN_POINT(name, (x, y, z))`. Extra coordinates are
/// ignored; fewer than three is an error.
pub fn parse_cartesian_point(record: &Record) -> Result<Point3<f64>, StepError> {
    expect_kind(record, &["CARTESIAN_POINT"])?;
    let coords = record.number_list(1)?;
    if coords.len() < 3 {
        return Err(StepError::argument(
            Some(record.id),
            format!("CARTESIAN_POINT needs 3 coordinates, got {}", coords.len()),
        ));
    }
    Ok(Point3::new(coords[0], coords[1], coords[2]))
}

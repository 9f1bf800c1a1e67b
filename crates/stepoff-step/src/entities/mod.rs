//! Typed readers for the STEP entities the mesh pipeline needs.
//!
//! Each reader takes a single [`Record`] and pulls out only the reference and
//! position information used later. Wrong arity or a non-reference where a
//! reference is expected yields a [`StepError`] for that record alone.

pub mod geometry;
pub mod topology;

pub use geometry::*;
pub use topology::*;

use crate::error::StepError;
use crate::parser::{Param, Record};

/// Helper trait for extracting parameter values from STEP records.
pub trait EntityArgs {
    /// Get a required parameter at index.
    fn param(&self, idx: usize) -> Result<&Param, StepError>;

    /// Get a required entity reference at index.
    fn reference(&self, idx: usize) -> Result<u64, StepError>;

    /// Get a required list argument at index.
    fn list(&self, idx: usize) -> Result<&[Param], StepError>;

    /// Get a list of numbers at index.
    fn number_list(&self, idx: usize) -> Result<Vec<f64>, StepError>;

    /// Get the references in the list at index. Items that are not
    /// references are skipped.
    fn reference_list(&self, idx: usize) -> Result<Vec<u64>, StepError>;

    /// Get a required boolean enumeration (`.T.` / `.F.`) at index.
    fn flag(&self, idx: usize) -> Result<bool, StepError>;
}

impl EntityArgs for Record {
    fn param(&self, idx: usize) -> Result<&Param, StepError> {
        self.params.get(idx).ok_or_else(|| {
            StepError::argument(
                Some(self.id),
                format!(
                    "{} has {} parameters, needs at least {}",
                    self.keyword,
                    self.params.len(),
                    idx + 1
                ),
            )
        })
    }

    fn reference(&self, idx: usize) -> Result<u64, StepError> {
        self.param(idx)?.as_reference().ok_or_else(|| {
            StepError::argument(
                Some(self.id),
                format!("expected entity ref at arg {idx} in {}", self.keyword),
            )
        })
    }

    fn list(&self, idx: usize) -> Result<&[Param], StepError> {
        self.param(idx)?.as_list().ok_or_else(|| {
            StepError::argument(
                Some(self.id),
                format!("expected list at arg {idx} in {}", self.keyword),
            )
        })
    }

    fn number_list(&self, idx: usize) -> Result<Vec<f64>, StepError> {
        let list = self.list(idx)?;
        list.iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_number().ok_or_else(|| {
                    StepError::argument(
                        Some(self.id),
                        format!("expected number at list[{i}] in arg {idx}"),
                    )
                })
            })
            .collect()
    }

    fn reference_list(&self, idx: usize) -> Result<Vec<u64>, StepError> {
        Ok(self.list(idx)?.iter().filter_map(Param::as_reference).collect())
    }

    fn flag(&self, idx: usize) -> Result<bool, StepError> {
        match self.param(idx)?.as_enum() {
            Some("T" | "TRUE") => Ok(true),
            Some("F" | "FALSE") => Ok(false),
            _ => Err(StepError::argument(
                Some(self.id),
                format!("expected .T. or .F. at arg {idx} in {}", self.keyword),
            )),
        }
    }
}

/// Fail with a type mismatch unless the record has one of the given keywords.
pub(crate) fn expect_kind(record: &Record, keywords: &[&str]) -> Result<(), StepError> {
    if keywords.contains(&record.keyword.as_str()) {
        Ok(())
    } else {
        Err(StepError::type_mismatch(keywords.join(" | "), &record.keyword))
    }
}

//! Learning-curve snapshots as delimited text.

use std::io;

use crate::{Error, Measurement, Result};

/// Rows of measurement snapshots with a fixed header.
///
/// The first snapshot fixes the column names; every later snapshot must report the same
/// names in the same order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningCurve {
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl LearningCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one snapshot.
    pub fn insert(&mut self, snapshot: &[Measurement]) -> Result<()> {
        if self.rows.is_empty() && self.names.is_empty() {
            self.names = snapshot.iter().map(|m| m.name.clone()).collect();
        } else if snapshot.len() != self.names.len()
            || snapshot.iter().zip(&self.names).any(|(m, n)| m.name != *n)
        {
            return Err(Error::ColumnMismatch);
        }
        self.rows.push(snapshot.iter().map(|m| m.value).collect());
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of column `name` in row `row`.
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.names.iter().position(|n| n == name)?;
        self.rows.get(row)?.get(col).copied()
    }

    pub fn header_line(&self) -> String {
        self.names.join(",")
    }

    pub fn row_line(&self, row: usize) -> Option<String> {
        let values = self.rows.get(row)?;
        Some(
            values
                .iter()
                .map(|v| format!("{v}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Header plus every row, one line each.
    pub fn write_csv<W: io::Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}", self.header_line())?;
        for row in 0..self.rows.len() {
            if let Some(line) = self.row_line(row) {
                writeln!(out, "{line}")?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(a: f64, b: f64) -> Vec<Measurement> {
        vec![Measurement::new("instances", a), Measurement::new("bin 0:accuracy", b)]
    }

    #[test]
    fn first_snapshot_fixes_the_header() {
        let mut c = LearningCurve::new();
        c.insert(&snap(100.0, 0.5)).unwrap();
        c.insert(&snap(200.0, 0.75)).unwrap();
        assert_eq!(c.header_line(), "instances,bin 0:accuracy");
        assert_eq!(c.row_line(1).unwrap(), "200,0.75");
        assert_eq!(c.value(0, "bin 0:accuracy"), Some(0.5));
        assert!(c.row_line(2).is_none());
    }

    #[test]
    fn mismatched_snapshot_is_rejected() {
        let mut c = LearningCurve::new();
        c.insert(&snap(1.0, 1.0)).unwrap();
        let renamed = vec![Measurement::new("instances", 2.0), Measurement::new("x", 0.0)];
        assert!(matches!(c.insert(&renamed), Err(Error::ColumnMismatch)));
        assert!(matches!(c.insert(&snap(1.0, 1.0)[..1]), Err(Error::ColumnMismatch)));
        assert_eq!(c.num_rows(), 1);
    }

    #[test]
    fn write_csv_emits_header_then_rows() {
        let mut c = LearningCurve::new();
        c.insert(&snap(10.0, 0.25)).unwrap();
        c.insert(&snap(20.0, 1.0)).unwrap();
        let mut buf = Vec::new();
        c.write_csv(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "instances,bin 0:accuracy\n10,0.25\n20,1\n"
        );
    }
}

//! Date-indexed frames and series.
//!
//! A [`Frame`] is a dense table of optional values: one row per date, one
//! column per ticker. `None` marks a value that is undefined (missing input,
//! incomplete rolling window, division by zero). Undefined values are never
//! silently replaced by zero here; each consumer applies its own policy.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    /// `rows[i][j]` is the value of `columns[j]` on `dates[i]`.
    pub rows: Vec<Vec<Option<f64>>>,
}

impl Frame {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<String>, rows: Vec<Vec<Option<f64>>>) -> Self {
        debug_assert_eq!(dates.len(), rows.len());
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self {
            dates,
            columns,
            rows,
        }
    }

    /// Build a frame from per-column vectors sharing one date index.
    pub fn from_columns(dates: Vec<NaiveDate>, columns: Vec<(String, Vec<Option<f64>>)>) -> Self {
        let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
        let rows = (0..dates.len())
            .map(|i| {
                columns
                    .iter()
                    .map(|(_, values)| values.get(i).copied().flatten())
                    .collect()
            })
            .collect();
        Self::new(dates, names, rows)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let j = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[j]).collect())
    }

    /// Series view of a single column.
    pub fn series(&self, name: &str) -> Option<Series> {
        self.column(name)
            .map(|values| Series::new(self.dates.clone(), values))
    }

    pub fn row_index(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// True when every cell of row `i` is undefined (also for zero columns).
    pub fn row_all_missing(&self, i: usize) -> bool {
        self.rows[i].iter().all(Option::is_none)
    }

    /// Copy of the frame without `name`; a no-op if the column is absent.
    pub fn without_column(&self, name: &str) -> Frame {
        match self.column_index(name) {
            None => self.clone(),
            Some(skip) => {
                let columns = self
                    .columns
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != skip)
                    .map(|(_, c)| c.clone())
                    .collect();
                let rows = self
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .enumerate()
                            .filter(|(j, _)| *j != skip)
                            .map(|(_, v)| *v)
                            .collect()
                    })
                    .collect();
                Frame::new(self.dates.clone(), columns, rows)
            }
        }
    }

    /// The named columns in the given order; names not present are skipped.
    pub fn select(&self, names: &[&str]) -> Frame {
        let picked: Vec<(String, usize)> = names
            .iter()
            .filter_map(|n| self.column_index(n).map(|j| (n.to_string(), j)))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| picked.iter().map(|(_, j)| row[*j]).collect())
            .collect();
        Frame::new(
            self.dates.clone(),
            picked.into_iter().map(|(n, _)| n).collect(),
            rows,
        )
    }

    /// Apply a column-wise transform that preserves length.
    pub fn map_columns<F>(&self, f: F) -> Frame
    where
        F: Fn(&[Option<f64>]) -> Vec<Option<f64>>,
    {
        let transformed: Vec<(String, Vec<Option<f64>>)> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let values: Vec<Option<f64>> = self.rows.iter().map(|row| row[j]).collect();
                (name.clone(), f(&values))
            })
            .collect();
        Frame::from_columns(self.dates.clone(), transformed)
    }

    /// Fractional change over `periods` rows: `x[t] / x[t - periods] - 1`.
    ///
    /// Undefined when either end is missing or the base is zero.
    pub fn pct_change(&self, periods: usize) -> Frame {
        self.map_columns(|values| pct_change(values, periods))
    }

    /// Carry the last defined value forward over gaps.
    pub fn forward_fill(&self) -> Frame {
        self.map_columns(|values| {
            let mut last = None;
            values
                .iter()
                .map(|v| {
                    if v.is_some() {
                        last = *v;
                    }
                    last
                })
                .collect()
        })
    }

    /// Forward-fill, then keep the last observation of every calendar month,
    /// labelled with the month's final calendar day.
    ///
    /// Every month between the first and last observation gets a row; months
    /// with no observation are entirely undefined.
    pub fn resample_month_end(&self) -> Frame {
        let filled = self.forward_fill();
        let mut last_in_month: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for (i, date) in filled.dates.iter().enumerate() {
            last_in_month.insert(month_end(*date), i);
        }

        let labels = month_ends_between(self.dates.first(), self.dates.last());
        let width = self.columns.len();
        let rows = labels
            .iter()
            .map(|label| match last_in_month.get(label) {
                Some(&i) => filled.rows[i].clone(),
                None => vec![None; width],
            })
            .collect();
        Frame::new(labels, self.columns.clone(), rows)
    }

    /// Align rows to `dates` by exact match; unmatched dates are undefined.
    pub fn reindex(&self, dates: &[NaiveDate]) -> Frame {
        let width = self.columns.len();
        let rows = dates
            .iter()
            .map(|d| match self.row_index(*d) {
                Some(i) => self.rows[i].clone(),
                None => vec![None; width],
            })
            .collect();
        Frame::new(dates.to_vec(), self.columns.clone(), rows)
    }

    /// Keep only rows where every column is defined.
    pub fn drop_incomplete_rows(&self) -> Frame {
        let (dates, rows): (Vec<NaiveDate>, Vec<Vec<Option<f64>>>) = self
            .dates
            .iter()
            .zip(self.rows.iter())
            .filter(|(_, row)| row.iter().all(Option::is_some))
            .map(|(d, row)| (*d, row.clone()))
            .unzip();
        Frame::new(dates, self.columns.clone(), rows)
    }

    /// Share of undefined cells; zero for an empty frame.
    pub fn missing_ratio(&self) -> f64 {
        let total = self.len() * self.columns.len();
        if total == 0 {
            return 0.0;
        }
        let missing = self.rows.iter().flatten().filter(|v| v.is_none()).count();
        missing as f64 / total as f64
    }
}

/// A single date-indexed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self { dates, values }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .and_then(|i| self.values[i])
    }

    /// Align to `dates` by exact match; unmatched dates are undefined.
    pub fn reindex(&self, dates: &[NaiveDate]) -> Series {
        Series::new(dates.to_vec(), dates.iter().map(|d| self.get(*d)).collect())
    }

    pub fn map<F>(&self, mut f: F) -> Series
    where
        F: FnMut(Option<f64>) -> Option<f64>,
    {
        Series::new(
            self.dates.clone(),
            self.values.iter().map(|v| f(*v)).collect(),
        )
    }

    /// Defined values only, in date order.
    pub fn defined(&self) -> Vec<(NaiveDate, f64)> {
        self.dates
            .iter()
            .zip(self.values.iter())
            .filter_map(|(d, v)| v.map(|x| (*d, x)))
            .collect()
    }

    pub fn missing_ratio(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let missing = self.values.iter().filter(|v| v.is_none()).count();
        missing as f64 / self.values.len() as f64
    }
}

pub fn pct_change(values: &[Option<f64>], periods: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            if periods == 0 || i < periods {
                return None;
            }
            match (values[i - periods], values[i]) {
                (Some(base), Some(current)) if base != 0.0 => {
                    let change = current / base - 1.0;
                    change.is_finite().then_some(change)
                }
                _ => None,
            }
        })
        .collect()
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Month-end labels covering `first..=last`, one per calendar month.
pub fn month_ends_between(first: Option<&NaiveDate>, last: Option<&NaiveDate>) -> Vec<NaiveDate> {
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };
    let stop = month_end(*last);
    let mut labels = Vec::new();
    let mut current = month_end(*first);
    while current <= stop {
        labels.push(current);
        match current.succ_opt() {
            Some(next) => current = month_end(next),
            None => break,
        }
    }
    labels
}

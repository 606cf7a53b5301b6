//! Clock intervals and shifts.
//!
//! Each clock owns an optional interval and a shift. The decimal form is the
//! stored form; fractional reads are computed on demand through
//! [`decimal_to_fraction`]. Every write is checked to be exactly
//! representable as a reduced fraction so that later fractional reads cannot
//! fail.

use std::collections::{BTreeMap, BTreeSet};

use cosim_types::{ConversionError, Fraction, ValueReference, decimal_to_fraction};
use serde::{Deserialize, Serialize};

/// Interval and shift of one clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockEntry {
    pub reference: ValueReference,
    /// `None` until an interval has been set or declared.
    pub interval: Option<f64>,
    pub shift: f64,
}

impl ClockEntry {
    pub fn new(reference: u32, interval: f64, shift: f64) -> Self {
        Self {
            reference: ValueReference::new(reference),
            interval: Some(interval),
            shift,
        }
    }

    fn unset(reference: ValueReference) -> Self {
        Self {
            reference,
            interval: None,
            shift: 0.0,
        }
    }
}

/// Qualifier reported alongside each interval read.
///
/// Discriminants follow the wire numbering. Intervals are reported as
/// changed on every read, so the "unchanged" qualifier (1) has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum IntervalQualifier {
    NotYetKnown = 0,
    Changed = 2,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClockError {
    #[error("value reference {0} is not a clock")]
    NotAClock(ValueReference),

    #[error("{references} clock references but {values} values")]
    LengthMismatch { references: usize, values: usize },

    #[error("interval {value} for clock {reference} must be positive")]
    InvalidInterval { reference: ValueReference, value: f64 },

    #[error("shift {value} for clock {reference} must not be negative")]
    InvalidShift { reference: ValueReference, value: f64 },

    #[error("clock value conversion failed: {0}")]
    Conversion(#[from] ConversionError),
}

/// Decimal intervals with their qualifiers.
pub type DecimalIntervals = (Vec<f64>, Vec<IntervalQualifier>);

/// Fractional intervals as `(counters, resolutions, qualifiers)`.
pub type FractionIntervals = (Vec<u64>, Vec<u64>, Vec<IntervalQualifier>);

/// Interval and shift of every declared clock of a model instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockTable {
    clocks: BTreeSet<ValueReference>,
    entries: BTreeMap<ValueReference, ClockEntry>,
    defaults: BTreeMap<ValueReference, ClockEntry>,
}

impl ClockTable {
    /// Creates a table for the declared clocks, seeded with `defaults`.
    pub fn new(
        clocks: impl IntoIterator<Item = ValueReference>,
        defaults: Vec<ClockEntry>,
    ) -> Result<Self, ClockError> {
        let clocks: BTreeSet<ValueReference> = clocks.into_iter().collect();
        let mut table = Self {
            entries: clocks.iter().map(|&r| (r, ClockEntry::unset(r))).collect(),
            clocks,
            defaults: BTreeMap::new(),
        };

        for entry in defaults {
            table.validate_entry(&entry)?;
            table.entries.insert(entry.reference, entry);
        }
        table.defaults = table.entries.clone();
        Ok(table)
    }

    /// Entries in ascending reference order.
    pub fn entries(&self) -> impl Iterator<Item = &ClockEntry> {
        self.entries.values()
    }

    pub fn is_clock(&self, reference: ValueReference) -> bool {
        self.clocks.contains(&reference)
    }

    pub fn entry(&self, reference: ValueReference) -> Result<&ClockEntry, ClockError> {
        self.entries
            .get(&reference)
            .ok_or(ClockError::NotAClock(reference))
    }

    /// Restores the declared default intervals and shifts.
    pub fn reset(&mut self) {
        self.entries = self.defaults.clone();
    }

    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    pub fn set_interval_decimal(
        &mut self,
        refs: &[ValueReference],
        intervals: &[f64],
    ) -> Result<(), ClockError> {
        self.validate_batch(refs, intervals.len())?;
        for (&reference, &value) in refs.iter().zip(intervals) {
            check_interval(reference, value)?;
        }
        for (&reference, &value) in refs.iter().zip(intervals) {
            self.entry_mut(reference).interval = Some(value);
        }
        Ok(())
    }

    pub fn set_shift_decimal(
        &mut self,
        refs: &[ValueReference],
        shifts: &[f64],
    ) -> Result<(), ClockError> {
        self.validate_batch(refs, shifts.len())?;
        for (&reference, &value) in refs.iter().zip(shifts) {
            check_shift(reference, value)?;
        }
        for (&reference, &value) in refs.iter().zip(shifts) {
            self.entry_mut(reference).shift = value;
        }
        Ok(())
    }

    pub fn set_interval_fraction(
        &mut self,
        refs: &[ValueReference],
        counters: &[u64],
        resolutions: &[u64],
    ) -> Result<(), ClockError> {
        let decimals = self.fractions_to_decimals(refs, counters, resolutions)?;
        self.set_interval_decimal(refs, &decimals)
    }

    pub fn set_shift_fraction(
        &mut self,
        refs: &[ValueReference],
        counters: &[u64],
        resolutions: &[u64],
    ) -> Result<(), ClockError> {
        let decimals = self.fractions_to_decimals(refs, counters, resolutions)?;
        self.set_shift_decimal(refs, &decimals)
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Intervals of the given clocks. An unknown interval reads as `0.0`
    /// with qualifier [`IntervalQualifier::NotYetKnown`].
    pub fn interval_decimal(&self, refs: &[ValueReference]) -> Result<DecimalIntervals, ClockError> {
        let mut intervals = Vec::with_capacity(refs.len());
        let mut qualifiers = Vec::with_capacity(refs.len());
        for &reference in refs {
            match self.entry(reference)?.interval {
                Some(interval) => {
                    intervals.push(interval);
                    qualifiers.push(IntervalQualifier::Changed);
                }
                None => {
                    intervals.push(0.0);
                    qualifiers.push(IntervalQualifier::NotYetKnown);
                }
            }
        }
        Ok((intervals, qualifiers))
    }

    /// Intervals as `counter / resolution`. An unknown interval reads as
    /// `0 / 1` with qualifier [`IntervalQualifier::NotYetKnown`].
    pub fn interval_fraction(
        &self,
        refs: &[ValueReference],
    ) -> Result<FractionIntervals, ClockError> {
        let mut counters = Vec::with_capacity(refs.len());
        let mut resolutions = Vec::with_capacity(refs.len());
        let mut qualifiers = Vec::with_capacity(refs.len());
        for &reference in refs {
            match self.entry(reference)?.interval {
                Some(interval) => {
                    let fraction = decimal_to_fraction(interval)?;
                    counters.push(fraction.counter()?);
                    resolutions.push(fraction.denominator());
                    qualifiers.push(IntervalQualifier::Changed);
                }
                None => {
                    counters.push(0);
                    resolutions.push(1);
                    qualifiers.push(IntervalQualifier::NotYetKnown);
                }
            }
        }
        Ok((counters, resolutions, qualifiers))
    }

    pub fn shift_decimal(&self, refs: &[ValueReference]) -> Result<Vec<f64>, ClockError> {
        refs.iter()
            .map(|&reference| self.entry(reference).map(|entry| entry.shift))
            .collect()
    }

    /// Shifts as `(counters, resolutions)`.
    pub fn shift_fraction(
        &self,
        refs: &[ValueReference],
    ) -> Result<(Vec<u64>, Vec<u64>), ClockError> {
        let mut counters = Vec::with_capacity(refs.len());
        let mut resolutions = Vec::with_capacity(refs.len());
        for &reference in refs {
            let fraction = decimal_to_fraction(self.entry(reference)?.shift)?;
            counters.push(fraction.counter()?);
            resolutions.push(fraction.denominator());
        }
        Ok((counters, resolutions))
    }

    /// Replaces every entry at once. The entries must cover exactly the
    /// declared clocks; nothing is written on failure.
    pub(crate) fn replace_entries(&mut self, entries: Vec<ClockEntry>) -> Result<(), ClockError> {
        let mut replacement = BTreeMap::new();
        for entry in entries {
            self.validate_entry(&entry)?;
            replacement.insert(entry.reference, entry);
        }
        if let Some(missing) = self.clocks.iter().find(|r| !replacement.contains_key(r)) {
            return Err(ClockError::NotAClock(*missing));
        }
        self.entries = replacement;
        Ok(())
    }

    fn validate_entry(&self, entry: &ClockEntry) -> Result<(), ClockError> {
        if !self.is_clock(entry.reference) {
            return Err(ClockError::NotAClock(entry.reference));
        }
        if let Some(interval) = entry.interval {
            check_interval(entry.reference, interval)?;
        }
        check_shift(entry.reference, entry.shift)
    }

    fn validate_batch(&self, refs: &[ValueReference], values: usize) -> Result<(), ClockError> {
        if refs.len() != values {
            return Err(ClockError::LengthMismatch {
                references: refs.len(),
                values,
            });
        }
        match refs.iter().find(|r| !self.is_clock(**r)) {
            Some(&reference) => Err(ClockError::NotAClock(reference)),
            None => Ok(()),
        }
    }

    fn fractions_to_decimals(
        &self,
        refs: &[ValueReference],
        counters: &[u64],
        resolutions: &[u64],
    ) -> Result<Vec<f64>, ClockError> {
        self.validate_batch(refs, counters.len())?;
        self.validate_batch(refs, resolutions.len())?;
        counters
            .iter()
            .zip(resolutions)
            .map(|(&counter, &resolution)| -> Result<f64, ClockError> {
                Ok(Fraction::from_counter(counter, resolution)?.to_decimal())
            })
            .collect()
    }

    fn entry_mut(&mut self, reference: ValueReference) -> &mut ClockEntry {
        // Callers validate references against `clocks`, and every declared
        // clock has an entry.
        self.entries
            .entry(reference)
            .or_insert_with(|| ClockEntry::unset(reference))
    }
}

fn check_interval(reference: ValueReference, value: f64) -> Result<(), ClockError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ClockError::InvalidInterval { reference, value });
    }
    decimal_to_fraction(value)?;
    Ok(())
}

fn check_shift(reference: ValueReference, value: f64) -> Result<(), ClockError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ClockError::InvalidShift { reference, value });
    }
    decimal_to_fraction(value)?;
    Ok(())
}

//! Category filter for log effects.

use std::collections::BTreeSet;

use cosim_types::LogCategory;

/// Decides which log categories reach the host.
///
/// A blacklist passes everything it does not name; a whitelist passes only
/// what it names. Enabling or disabling every category switches polarity and
/// clears the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    Blacklist(BTreeSet<LogCategory>),
    Whitelist(BTreeSet<LogCategory>),
}

impl CategoryFilter {
    /// Everything enabled when `logging_on`, nothing otherwise.
    pub fn new(logging_on: bool) -> Self {
        if logging_on {
            CategoryFilter::Blacklist(BTreeSet::new())
        } else {
            CategoryFilter::Whitelist(BTreeSet::new())
        }
    }

    pub fn enabled(&self, category: &LogCategory) -> bool {
        match self {
            CategoryFilter::Blacklist(set) => !set.contains(category),
            CategoryFilter::Whitelist(set) => set.contains(category),
        }
    }

    pub fn enable(&mut self, category: LogCategory) {
        match self {
            CategoryFilter::Blacklist(set) => {
                set.remove(&category);
            }
            CategoryFilter::Whitelist(set) => {
                set.insert(category);
            }
        }
    }

    pub fn disable(&mut self, category: LogCategory) {
        match self {
            CategoryFilter::Blacklist(set) => {
                set.insert(category);
            }
            CategoryFilter::Whitelist(set) => {
                set.remove(&category);
            }
        }
    }

    pub fn enable_all(&mut self) {
        *self = CategoryFilter::Blacklist(BTreeSet::new());
    }

    pub fn disable_all(&mut self) {
        *self = CategoryFilter::Whitelist(BTreeSet::new());
    }

    /// Applies a debug-logging request: with no categories the switch covers
    /// every category, otherwise only the listed ones.
    pub fn apply(&mut self, logging_on: bool, categories: Vec<LogCategory>) {
        match (logging_on, categories.is_empty()) {
            (true, true) => self.enable_all(),
            (false, true) => self.disable_all(),
            (true, false) => categories.into_iter().for_each(|c| self.enable(c)),
            (false, false) => categories.into_iter().for_each(|c| self.disable(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_polarity_follows_logging_flag() {
        assert!(CategoryFilter::new(true).enabled(&LogCategory::Events));
        assert!(!CategoryFilter::new(false).enabled(&LogCategory::Events));
    }

    #[test]
    fn enable_specific_categories_from_off() {
        let mut filter = CategoryFilter::new(false);
        filter.apply(true, vec![LogCategory::StatusWarning]);
        assert!(filter.enabled(&LogCategory::StatusWarning));
        assert!(!filter.enabled(&LogCategory::StatusError));
    }

    #[test]
    fn disable_specific_categories_from_on() {
        let mut filter = CategoryFilter::new(true);
        filter.apply(false, vec![LogCategory::Events]);
        assert!(!filter.enabled(&LogCategory::Events));
        assert!(filter.enabled(&LogCategory::StatusWarning));
    }

    #[test]
    fn empty_category_list_switches_everything() {
        let mut filter = CategoryFilter::new(false);
        filter.apply(true, Vec::new());
        assert!(filter.enabled(&LogCategory::UserDefined("custom".into())));
        filter.apply(false, Vec::new());
        assert_eq!(filter, CategoryFilter::new(false));
    }
}

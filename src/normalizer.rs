//! Cleanup of scraped stock fields.

use regex::Regex;

use crate::models::{FieldValue, Fields};

/// Magnitude suffixes in precedence order
const SUFFIXES: [(char, i32); 4] = [('T', 12), ('B', 9), ('M', 6), ('K', 3)];

/// Strips junk characters and expands suffix-scaled numbers such as `2.5M`
#[derive(Debug, Clone)]
pub struct Normalizer {
    chars_to_remove: Vec<char>,
    patterns: Vec<(Regex, f64)>,
}

impl Normalizer {
    pub fn new(chars_to_remove: &[char]) -> Self {
        let patterns = SUFFIXES
            .iter()
            .map(|(suffix, exponent)| {
                let pattern = Regex::new(&format!(r"\d[\d.]*{}$", suffix)).expect("suffix pattern is valid");
                (pattern, 10f64.powi(*exponent))
            })
            .collect();

        Self {
            chars_to_remove: chars_to_remove.to_vec(),
            patterns,
        }
    }

    /// Clean every text field in place; numbers are left alone.
    pub fn normalize(&self, fields: &mut Fields) {
        for value in fields.values_mut() {
            if let FieldValue::Text(text) = value {
                let cleaned: String = text.chars().filter(|c| !self.chars_to_remove.contains(c)).collect();
                *value = match self.expand_suffix(&cleaned) {
                    Some(number) => FieldValue::Number(number),
                    None => FieldValue::Text(cleaned),
                };
            }
        }
    }

    /// Value of a suffix-scaled number, if `text` is one.
    pub fn expand_suffix(&self, text: &str) -> Option<f64> {
        let text = text.trim();
        let (_, scale) = self.patterns.iter().find(|(pattern, _)| pattern.is_match(text))?;
        let prefix = &text[..text.len() - 1];
        prefix.trim().parse::<f64>().ok().map(|number| number * scale)
    }
}

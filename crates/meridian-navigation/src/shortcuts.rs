//! Quick-search shortcuts: `<letter><space><terms>` in the address bar

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Letter → search template (`%s` is replaced by the encoded terms)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortcutTable(BTreeMap<char, String>);

impl ShortcutTable {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, letter: char, template: impl Into<String>) {
        self.0.insert(letter, template.into());
    }

    pub fn template(&self, letter: char) -> Option<&str> {
        self.0.get(&letter).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split `input` into (template, terms) if it starts with a known
    /// shortcut letter followed by a space.
    pub fn parse<'a>(&'a self, input: &'a str) -> Option<(&'a str, &'a str)> {
        let mut chars = input.chars();
        let letter = chars.next()?;
        if chars.next()? != ' ' {
            return None;
        }

        let terms = chars.as_str().trim();
        if terms.is_empty() {
            return None;
        }
        Some((self.template(letter)?, terms))
    }
}

impl Default for ShortcutTable {
    fn default() -> Self {
        let mut table = Self::new();
        table.insert('g', "http://www.google.com/m?q=%s");
        table.insert('w', "http://en.wikipedia.org/w/index.php?search=%s&go=Go");
        table.insert('d', "http://dictionary.reference.com/search?q=%s");
        table.insert(
            'l',
            "http://www.google.com/m/search?site=local&q=%s&near=mountain+view",
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shortcut() {
        let table = ShortcutTable::default();
        let (template, terms) = table.parse("w rust language").unwrap();
        assert!(template.contains("wikipedia"));
        assert_eq!(terms, "rust language");
    }

    #[test]
    fn test_not_a_shortcut() {
        let table = ShortcutTable::default();
        assert!(table.parse("x terms").is_none());
        assert!(table.parse("go terms").is_none());
        assert!(table.parse("g").is_none());
        assert!(table.parse("g ").is_none());
        assert!(table.parse("G terms").is_none());
    }
}

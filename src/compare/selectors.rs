//! Ignore selectors: `#id`, `.class`, `tag` and compounds like `div#hero.banner`.
//!
//! Matching is case-insensitive. Combinators, attribute selectors and
//! pseudo-classes are rejected at parse time. Any other character can be
//! written with a backslash escape, so `.md\:flex` names the class `md:flex`.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::error::{LvrError, Result};
use crate::types::VisualNode;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

impl Selector {
    /// Compound selector requiring every class in `classes`.
    pub fn for_classes<'a>(classes: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            classes: classes.into_iter().map(str::to_ascii_lowercase).collect(),
            ..Self::default()
        }
    }

    pub fn for_tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty()
    }

    pub fn matches(&self, node: &VisualNode) -> bool {
        if let Some(tag) = &self.tag {
            if !node.tag_name.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if !node.dom_id().is_some_and(|node_id| node_id.eq_ignore_ascii_case(id)) {
                return false;
            }
        }
        self.classes.iter().all(|class| node.has_class(class))
    }

    fn push_segment(&mut self, marker: Option<char>, name: String, raw: &str) -> Result<()> {
        match marker {
            None => {
                if !name.is_empty() {
                    self.tag = Some(name);
                }
            }
            Some(marker) if name.is_empty() => {
                return Err(LvrError::InvalidSelector(format!(
                    "'{marker}' without a name in selector '{raw}'"
                )));
            }
            Some('#') => {
                if self.id.is_some() {
                    return Err(LvrError::InvalidSelector(format!(
                        "more than one id in selector '{raw}'"
                    )));
                }
                self.id = Some(name);
            }
            Some(_) => self.classes.push(name),
        }
        Ok(())
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
}

impl FromStr for Selector {
    type Err = LvrError;

    fn from_str(raw: &str) -> Result<Self> {
        let input = raw.trim().to_ascii_lowercase();
        if input.is_empty() {
            return Err(LvrError::InvalidSelector("empty selector".to_string()));
        }

        let mut selector = Selector::default();
        // `None` while reading the leading tag, then the '#' or '.' that opened the segment.
        let mut marker = None;
        let mut name = String::new();
        let mut chars = input.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => name.push(escaped),
                    None => {
                        return Err(LvrError::InvalidSelector(format!(
                            "dangling escape in selector '{raw}'"
                        )));
                    }
                },
                '#' | '.' => {
                    selector.push_segment(marker, std::mem::take(&mut name), raw)?;
                    marker = Some(c);
                }
                c if is_name_char(c) => name.push(c),
                bad => {
                    return Err(LvrError::InvalidSelector(format!(
                        "unsupported character '{bad}' in selector '{raw}'"
                    )));
                }
            }
        }
        selector.push_segment(marker, name, raw)?;
        Ok(selector)
    }
}

fn write_name(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    for c in name.chars() {
        if !is_name_char(c) {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    Ok(())
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write_name(f, tag)?;
        }
        if let Some(id) = &self.id {
            f.write_char('#')?;
            write_name(f, id)?;
        }
        for class in &self.classes {
            f.write_char('.')?;
            write_name(f, class)?;
        }
        Ok(())
    }
}

/// Split a comma-separated selector list, dropping empty entries.
pub fn parse_ignore_selectors(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .filter_map(|part| {
                let trimmed = part.trim().to_ascii_lowercase();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            })
            .collect()
    })
    .unwrap_or_default()
}

pub fn compile_selectors(raw: &[String]) -> Result<Vec<Selector>> {
    raw.iter().map(|s| s.parse()).collect()
}

pub fn matches_any(node: &VisualNode, selectors: &[Selector]) -> bool {
    selectors.iter().any(|sel| sel.matches(node))
}

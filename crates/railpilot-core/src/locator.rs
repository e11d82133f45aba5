//! Element targeting for DOM actions.
//!
//! A [`Locator`] resolves in three steps:
//!
//! 1. If a scope is set, pick the `index`-th element matching the scope
//!    selector; the rest of the search is confined to its descendants.
//! 2. Collect elements matching `css` (optionally only the `index`-th one).
//! 3. If `containing` is set, descend to the deepest element whose text
//!    contains it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Nth match of a selector, used to confine a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub css: String,
    pub index: usize,
}

/// Target of a DOM action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub scope: Option<Scope>,
    pub css: String,
    pub index: Option<usize>,
    pub containing: Option<String>,
}

impl Locator {
    /// Locate by CSS selector.
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            scope: None,
            css: css.into(),
            index: None,
            containing: None,
        }
    }

    /// Restrict to the `index`-th match.
    #[must_use]
    pub fn nth(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Descend to the deepest element containing `text`.
    #[must_use]
    pub fn containing(mut self, text: impl Into<String>) -> Self {
        self.containing = Some(text.into());
        self
    }

    /// Confine the search to the `index`-th match of `css`.
    #[must_use]
    pub fn within(mut self, css: impl Into<String>, index: usize) -> Self {
        self.scope = Some(Scope {
            css: css.into(),
            index,
        });
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{}[{}] >> ", scope.css, scope.index)?;
        }
        write!(f, "{}", self.css)?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        if let Some(text) = &self.containing {
            write!(f, " ~ {:?}", text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_all_parts() {
        let loc = Locator::css(".row")
            .nth(2)
            .containing("Book Now")
            .within(".bull-back", 1);
        assert_eq!(loc.index, Some(2));
        assert_eq!(loc.containing.as_deref(), Some("Book Now"));
        assert_eq!(
            loc.scope,
            Some(Scope {
                css: ".bull-back".into(),
                index: 1
            })
        );
    }

    #[test]
    fn display_is_readable() {
        let loc = Locator::css(".row").nth(0).containing("3A").within(".train", 4);
        assert_eq!(loc.to_string(), ".train[4] >> .row[0] ~ \"3A\"");
        assert_eq!(Locator::css("#captcha").to_string(), "#captcha");
    }
}

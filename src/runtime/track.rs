//! Track chain - patterns played end to end in track mode.
//!
//! Built from the user's selection right before track playback starts, so
//! edits to the library between runs are always picked up.

use crate::io::library::LibraryEntry;
use crate::sequencing::pattern::Pattern;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackChain {
    patterns: Vec<Pattern>,
}

impl TrackChain {
    pub fn from_patterns(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Self {
            patterns: patterns.into_iter().collect(),
        }
    }

    /// Look up each selected id in the library, in selection order.
    ///
    /// Unknown ids and blank slots are skipped. The same id may appear more
    /// than once.
    pub fn from_library<S: AsRef<str>>(selection: &[S], library: &[LibraryEntry]) -> Self {
        let patterns = selection
            .iter()
            .map(AsRef::as_ref)
            .filter(|id| !id.is_empty())
            .filter_map(|id| library.iter().find(|e| e.id == id))
            .map(|e| e.pattern.clone())
            .collect();
        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

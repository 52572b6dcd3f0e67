//! Chain resolution: grouping slid and tied steps into one voice.
//!
//! A chain is the run of steps a single synth voice plays. It starts at a
//! step with a note and keeps absorbing the following step (wrapping at the
//! end of the pattern) while one of two links holds, checked in this order:
//!
//! - **slide**: the current step has `slide` and the next step has a note.
//!   The pitch glides into the next note.
//! - **tie**: the next step has `extend`. The pitch is held and the filter
//!   envelope restarts.
//!
//! Steps absorbed into a chain never start a voice of their own.

use super::notes::Note;
use super::pattern::Step;

/// How a chain step was reached from its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Start,
    Slide,
    Tie,
}

/// One resolved step of a chain, with the pitch it actually sounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainStep {
    /// Index in the pattern
    pub index: usize,
    pub note: Note,
    pub accent: bool,
    pub slide: bool,
    pub extend: bool,
    pub link: Link,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    steps: Vec<ChainStep>,
}

impl Chain {
    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    /// Number of step durations the voice spans
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn start(&self) -> usize {
        self.steps.first().map(|s| s.index).unwrap_or(0)
    }

    /// Only the starter's accent counts
    pub fn accent(&self) -> bool {
        self.steps.first().is_some_and(|s| s.accent)
    }

    pub fn notes(&self) -> impl Iterator<Item = Note> + '_ {
        self.steps.iter().map(|s| s.note)
    }

    /// Pattern indices covered by this chain, in playback order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().map(|s| s.index)
    }
}

/// Link from step `prev` into step `next`, if the walk may continue
fn link(prev: &Step, next: &Step) -> Option<Link> {
    if prev.slide && next.note.is_some() {
        Some(Link::Slide)
    } else if next.extend {
        Some(Link::Tie)
    } else {
        None
    }
}

fn prev_index(i: usize, len: usize) -> usize {
    (i + len - 1) % len
}

/// True if step `index` would be absorbed by a chain started earlier.
///
/// Walks backwards over links until it meets a step with a note (the step
/// is part of that note's chain) or a broken link (it is not). A ring of
/// noteless links never reaches a note and is not linked.
pub fn is_linked(steps: &[Step], index: usize) -> bool {
    let len = steps.len();
    if index >= len {
        return false;
    }
    let mut current = index;
    for _ in 0..len {
        let prev = prev_index(current, len);
        if link(&steps[prev], &steps[current]).is_none() {
            return false;
        }
        if steps[prev].note.is_some() {
            return true;
        }
        current = prev;
    }
    false
}

/// A step starts a voice iff it has a note and is not absorbed by a chain
pub fn is_chain_starter(steps: &[Step], index: usize) -> bool {
    steps.get(index).is_some_and(|s| s.note.is_some()) && !is_linked(steps, index)
}

/// Walk forward from `start` and collect its chain.
///
/// Returns `None` if `start` is out of bounds or has no note. The walk is
/// bounded by the pattern length, so a ring of slides ends after one lap.
pub fn resolve(steps: &[Step], start: usize) -> Option<Chain> {
    let first = steps.get(start)?;
    let note = first.note?;
    let len = steps.len();

    let mut chain = vec![ChainStep {
        index: start,
        note,
        accent: first.accent,
        slide: first.slide,
        extend: first.extend,
        link: Link::Start,
    }];

    let mut idx = start;
    let mut held = note;
    while chain.len() < len {
        let next_idx = (idx + 1) % len;
        let (prev, next) = (&steps[idx], &steps[next_idx]);
        let Some(kind) = link(prev, next) else {
            break;
        };
        let sounding = match kind {
            Link::Slide => next.note.unwrap_or(held),
            _ => held,
        };
        chain.push(ChainStep {
            index: next_idx,
            note: sounding,
            accent: next.accent,
            slide: next.slide,
            extend: next.extend,
            link: kind,
        });
        held = sounding;
        idx = next_idx;
    }

    Some(Chain { steps: chain })
}

/// The chain a transport tick at `index` should play, if any
pub fn chain_at(steps: &[Step], index: usize) -> Option<Chain> {
    if is_chain_starter(steps, index) {
        resolve(steps, index)
    } else {
        None
    }
}

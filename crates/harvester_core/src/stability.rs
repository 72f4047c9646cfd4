/// Outcome of comparing two successive measurements of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Grew,
    NoChange,
}

/// Classify one load step. Strict comparison: equal counts and shrinking
/// counts (recycled nodes in a virtualized list) are both `NoChange`.
pub fn classify(previous: usize, current: usize) -> Stability {
    if current > previous {
        Stability::Grew
    } else {
        Stability::NoChange
    }
}

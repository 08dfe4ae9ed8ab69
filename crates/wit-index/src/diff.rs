//! File-set diffing.

use crate::index::Index;

/// How a path differs between two file sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Deleted => write!(f, "deleted"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    pub path: String,
    pub change: ChangeKind,
}

/// Classify every path in `base ∪ target`.
///
/// Equality compares `(content_hash, size, permission_class)` only;
/// `mod_time` is deliberately excluded, so a touch without a content change
/// is not "modified" even though it does change the root hash at commit
/// time. Output is path-sorted.
pub fn diff(base: &Index, target: &Index) -> Vec<DiffEntry> {
    let mut out = Vec::new();

    // Both indexes iterate path-sorted, so a merge walk keeps the output
    // sorted without a second pass.
    let mut base_iter = base.iter().peekable();
    let mut target_iter = target.iter().peekable();

    loop {
        match (base_iter.peek(), target_iter.peek()) {
            (Some((bp, bm)), Some((tp, tm))) => match bp.cmp(tp) {
                std::cmp::Ordering::Less => {
                    out.push(DiffEntry {
                        path: (*bp).clone(),
                        change: ChangeKind::Deleted,
                    });
                    base_iter.next();
                }
                std::cmp::Ordering::Greater => {
                    out.push(DiffEntry {
                        path: (*tp).clone(),
                        change: ChangeKind::Added,
                    });
                    target_iter.next();
                }
                std::cmp::Ordering::Equal => {
                    if !bm.same_content(tm) {
                        out.push(DiffEntry {
                            path: (*bp).clone(),
                            change: ChangeKind::Modified,
                        });
                    }
                    base_iter.next();
                    target_iter.next();
                }
            },
            (Some((bp, _)), None) => {
                out.push(DiffEntry {
                    path: (*bp).clone(),
                    change: ChangeKind::Deleted,
                });
                base_iter.next();
            }
            (None, Some((tp, _))) => {
                out.push(DiffEntry {
                    path: (*tp).clone(),
                    change: ChangeKind::Added,
                });
                target_iter.next();
            }
            (None, None) => break,
        }
    }

    out
}

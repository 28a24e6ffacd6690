//! 带修订号的本地快照

use std::sync::{PoisonError, RwLock, RwLockReadGuard};

pub(crate) struct Versioned<S> {
    pub revision: u64,
    pub value: S,
}

/// 并发写入时通知可能乱序到达，只接受不旧于当前快照的修订
pub(crate) struct Snapshot<S> {
    inner: RwLock<Versioned<S>>,
}

impl<S> Snapshot<S> {
    pub(crate) fn new(value: S) -> Self {
        Self {
            inner: RwLock::new(Versioned { revision: 0, value }),
        }
    }

    /// 替换快照，修订号比当前旧时丢弃并返回 `false`
    pub(crate) fn replace(&self, revision: u64, value: S) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if revision < inner.revision {
            return false;
        }
        *inner = Versioned { revision, value };
        true
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Versioned<S>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_revision_is_dropped() {
        let snapshot = Snapshot::new("initial");
        assert!(snapshot.replace(2, "second"));
        assert!(!snapshot.replace(1, "first"));
        assert_eq!(snapshot.read().value, "second");

        // 同一修订重复到达时照常接受
        assert!(snapshot.replace(2, "second again"));
        assert_eq!(snapshot.read().revision, 2);
    }
}

//! Namespace batches.

use crate::op::ReplayOp;
use nsreplay_store::Namespace;
use std::collections::HashMap;

/// An ordered run of operations targeting one namespace.
///
/// Operation order is source log order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBatch {
    namespace: Namespace,
    ops: Vec<ReplayOp>,
}

impl NamespaceBatch {
    /// Creates a batch.
    pub fn new(namespace: Namespace, ops: Vec<ReplayOp>) -> Self {
        Self { namespace, ops }
    }

    /// Splits a log-ordered stream into one batch per namespace.
    ///
    /// Batches come out in the order their namespace first appears, and
    /// each keeps the relative order of its operations.
    pub fn group<I>(entries: I) -> Vec<NamespaceBatch>
    where
        I: IntoIterator<Item = (Namespace, ReplayOp)>,
    {
        let mut batches: Vec<NamespaceBatch> = Vec::new();
        let mut slots: HashMap<Namespace, usize> = HashMap::new();

        for (namespace, op) in entries {
            match slots.get(&namespace) {
                Some(&slot) => batches[slot].ops.push(op),
                None => {
                    slots.insert(namespace.clone(), batches.len());
                    batches.push(NamespaceBatch::new(namespace, vec![op]));
                }
            }
        }
        batches
    }

    /// Returns the target namespace.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Returns the operations in log order.
    pub fn ops(&self) -> &[ReplayOp] {
        &self.ops
    }

    /// Returns the number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the batch has no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_preserves_order() {
        let a = Namespace::new("db", "a");
        let b = Namespace::new("db", "b");
        let batches = NamespaceBatch::group(vec![
            (b.clone(), ReplayOp::delete(1)),
            (a.clone(), ReplayOp::delete(2)),
            (b.clone(), ReplayOp::delete(3)),
            (a.clone(), ReplayOp::delete(4)),
        ]);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].namespace(), &b);
        assert_eq!(
            batches[0].ops(),
            &[ReplayOp::delete(1), ReplayOp::delete(3)]
        );
        assert_eq!(batches[1].namespace(), &a);
        assert_eq!(batches[1].len(), 2);
    }

    #[test]
    fn empty_group() {
        assert!(NamespaceBatch::group(Vec::new()).is_empty());
        assert!(NamespaceBatch::new(Namespace::new("d", "c"), vec![]).is_empty());
    }
}

//! Transactions, relabelling and scope pruning

use super::Collection;
use crate::model::Hash;
use crate::trie::NodeId;
use crate::{Error, Result};
use tracing::{debug, trace};

impl Collection {
    /// Start grouping mutations. Labels are only recomputed at `end`.
    pub fn begin(&mut self) -> Result<()> {
        if self.transaction.ongoing {
            return Err(Error::TransactionAlreadyOngoing);
        }
        self.transaction.ongoing = true;
        trace!(target: "collection::transaction", epoch = self.transaction.id, "begin");
        Ok(())
    }

    /// Undo every mutation since `begin`
    pub fn rollback(&mut self) -> Result<()> {
        if !self.transaction.ongoing {
            return Err(Error::NoTransaction);
        }

        let touched = std::mem::take(&mut self.transaction.touched);
        let created = std::mem::take(&mut self.transaction.created);
        self.transaction.detached.clear();

        for &id in &touched {
            self.arena[id].restore();
        }
        for &id in &created {
            self.arena.release(id);
        }

        self.transaction.ongoing = false;
        self.transaction.id += 1;
        debug!(
            target: "collection::transaction",
            restored = touched.len(),
            released = created.len(),
            epoch = self.transaction.id,
            "rollback"
        );
        Ok(())
    }

    /// Make every mutation since `begin` permanent and bring labels up to
    /// date
    pub fn end(&mut self) -> Result<()> {
        if !self.transaction.ongoing {
            return Err(Error::NoTransaction);
        }

        self.confirm();
        self.fix();

        self.transaction.ongoing = false;
        self.transaction.id += 1;
        debug!(
            target: "collection::transaction",
            epoch = self.transaction.id,
            root = %self.root_label().short(),
            "end"
        );

        if self.auto_collect {
            self.collect();
        }
        Ok(())
    }

    /// Drop backups and release nodes unlinked during the transaction
    fn confirm(&mut self) {
        for id in std::mem::take(&mut self.transaction.touched) {
            self.arena[id].confirm();
        }
        for id in std::mem::take(&mut self.transaction.detached) {
            self.arena.release(id);
        }
        self.transaction.created.clear();
    }

    /// Recompute labels and aggregates of every node marked inconsistent,
    /// children before parents
    pub(crate) fn fix(&mut self) {
        self.fix_node(self.root);
    }

    fn fix_node(&mut self, id: NodeId) {
        if !self.arena[id].inconsistent {
            return;
        }
        self.arena[id].inconsistent = false;

        if !self.arena[id].known {
            return;
        }
        if let Some(children) = self.arena[id].children {
            self.fix_node(children.left);
            self.fix_node(children.right);
        }
        self.arena.refresh(id, &self.fields);
    }

    /// Forget every subtree outside the scope, keeping only its label
    pub fn collect(&mut self) {
        self.fix();

        let before = self.arena.len();
        let mut path = Hash::ZERO;
        self.collect_node(self.root, &mut path, 0);

        debug!(
            target: "collection::scope",
            pruned = before.saturating_sub(self.arena.len()),
            nodes = self.arena.len(),
            "collect"
        );
    }

    fn collect_node(&mut self, id: NodeId, path: &mut Hash, depth: usize) {
        if !self.arena[id].known {
            return;
        }

        if !self.scope.matches(path, depth) {
            self.prune(id);
            return;
        }

        if let Some(children) = self.arena[id].children {
            if depth >= Hash::BITS {
                return;
            }
            path.set_bit(depth, false);
            self.collect_node(children.left, path, depth + 1);
            path.set_bit(depth, true);
            self.collect_node(children.right, path, depth + 1);
            path.set_bit(depth, false);
        }
    }

    /// Replace a subtree by its label
    fn prune(&mut self, id: NodeId) {
        self.preserve(id);
        for below in self.arena.descendants(id) {
            self.detach(below);
        }
        let node = &mut self.arena[id];
        node.forget();
        node.inconsistent = false;
    }
}

//! Port for the hierarchical config tree.
//!
//! The tree is string-keyed and read through short-lived read transactions;
//! dropping the transaction releases it on every exit path.

/// Read-only access to the config tree.
pub trait ConfigTree: Send + Sync {
    /// Opens a read transaction rooted at `path`.
    fn read_txn(&self, path: &str) -> Box<dyn ConfigTxn>;
}

/// One read transaction, scoped to a node.
///
/// `children` returns one sub-reader per child node, in config order, all
/// sharing the parent's snapshot.
pub trait ConfigTxn {
    /// The node name (last path segment).
    fn name(&self) -> &str;

    /// The node's full path in the tree.
    fn path(&self) -> &str;

    /// Reads a boolean leaf under this node, with a default for absent keys.
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Reads a string leaf under this node; `None` when the key is absent.
    fn get_string(&self, key: &str) -> Option<String>;

    /// Returns sub-readers for the children of `key`, in config order.
    fn children(&self, key: &str) -> Vec<Box<dyn ConfigTxn>>;
}

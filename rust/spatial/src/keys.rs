// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key types for the tree's arenas.
//!
//! Keys are created by `slotmap::SlotMap` and stay valid while other items
//! are removed (generational indices). A key from a removed item never
//! aliases a later insertion.

use slotmap::new_key_type;

new_key_type! {
    /// Key for an item stored in a [`DdTree`](crate::DdTree).
    pub struct ItemKey;

    /// Key for a node in the tree's node arena.
    pub struct NodeKey;
}

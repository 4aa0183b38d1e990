//! A portable library of ordered and associative containers and a
//! lock-free single-producer/single-consumer byte ring, for embedding in
//! latency-sensitive hosts (audio engines, plugin hosts, loaders, caches).
//!
//! The crate comprises five independent components — [`avl`], [`btree`],
//! [`hash_table`], [`rank_tree`], and [`ring`] — plus the collaborators
//! they share: an allocator capability ([`alloc`]), a flat error taxonomy
//! ([`status`]), a non-cryptographic digest ([`digest`]), and a packed
//! bitset ([`bitset`]). Components do not call each other; the only
//! shared state is the collaborators each one is constructed with.

pub mod alloc;
pub mod avl;
pub mod bitset;
pub mod btree;
pub mod digest;
pub mod hash_table;
pub mod rank_tree;
pub mod ring;
pub mod status;

pub use alloc::{Allocator, AllocatorHandle};
pub use avl::AvlTree;
pub use bitset::Bitset;
pub use btree::BTree;
pub use hash_table::HashTable;
pub use rank_tree::RankTree;
pub use ring::{Ring, RingTransaction};
pub use status::Status;

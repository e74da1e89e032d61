//! Persistent collections. Every update returns a new collection and leaves
//! the receiver untouched.

pub mod lazy;
pub mod list;
pub mod map;
pub mod seq;
pub mod set;
pub mod vector;

pub use lazy::{Delay, Invoke, LazySeq};
pub use list::List;
pub use map::ArrayMap;
pub use seq::{ConsCell, MapView, Seq};
pub use set::PersistentSet;
pub use vector::PersistentVector;

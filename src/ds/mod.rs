pub mod intrusive_list;
pub mod load_slot;
pub mod recency_index;
pub mod slot_arena;

pub use intrusive_list::IntrusiveList;
pub use load_slot::{Acquire, LoadGuard, LoadSlot};
pub use recency_index::{RecencyIndex, Touch};
pub use slot_arena::{SlotArena, SlotId};

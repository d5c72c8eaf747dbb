pub mod health;
pub mod messages;

pub use health::record_entry;
pub use messages::merge_read_marks;

pub mod recent;

pub use recent::{RecentEntries, RecentMatch};

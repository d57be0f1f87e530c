pub mod group;

pub use group::{flatten_legs, group_by_match, Constituent, MatchEntry};

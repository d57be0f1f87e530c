pub mod grants;
pub mod purchase;
pub mod resolver;

pub use grants::issue_grant;
pub use purchase::{expand_to_entries, plan_purchase, PurchasePlan};
pub use resolver::{is_entry_unlocked, Viewer};

pub mod application;
pub mod posting;

pub use application::{ApplicationRow, ApplicationStatus};
pub use posting::Posting;

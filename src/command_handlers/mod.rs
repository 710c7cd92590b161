pub mod dispatch;
pub mod install;
pub mod list;
pub mod vmu;

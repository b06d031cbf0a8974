pub mod measurements;
pub mod nutrition;
pub mod profiles;
pub mod routines;
pub mod sessions;

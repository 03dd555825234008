pub mod combo;
pub mod leveling;
pub mod profile;
pub mod session;

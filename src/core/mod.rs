pub mod clock;
pub mod combo_driver;
pub mod input;

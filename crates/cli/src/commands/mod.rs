pub mod coins;
pub mod configure;
pub mod doctor;
pub mod helpers;
pub mod store;

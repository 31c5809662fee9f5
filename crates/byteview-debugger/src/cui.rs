pub mod dump;
pub mod session;

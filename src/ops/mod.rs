pub mod blend;
pub mod outline;

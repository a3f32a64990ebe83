pub mod preview;
pub mod send;
pub mod status;
pub mod upload;

pub mod layout;
pub mod codec;

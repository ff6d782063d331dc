pub mod local;
pub mod null;

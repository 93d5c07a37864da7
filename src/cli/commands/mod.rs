pub mod migrate;
pub mod modules;
pub mod tenant;

//! In-place edits of the model's namelist and stream configuration files.

pub mod namelist;
pub mod streams;

pub use namelist::nml_replace;
pub use streams::update_stream_node;

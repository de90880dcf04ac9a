pub mod channel;
pub mod data;
pub mod error;
pub mod region;
pub mod signal_format;
pub mod support_array;

pub use channel::*;
pub use data::*;
pub use error::*;
pub use region::*;
pub use signal_format::*;
pub use support_array::*;

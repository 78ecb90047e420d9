pub mod boiler;
pub mod observation;

pub use boiler::*;
pub use observation::*;

pub mod devices;
pub mod macros;
pub mod reading;
pub mod report;
pub mod series;
pub mod time;

pub use devices::*;
pub use reading::*;
pub use report::*;
pub use series::*;

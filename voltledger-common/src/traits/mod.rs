pub mod gateway_traits;
pub mod repository_traits;

pub use gateway_traits::*;
pub use repository_traits::*;

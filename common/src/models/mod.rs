pub mod content;
pub mod progress;
pub mod user;

pub use content::*;
pub use progress::*;
pub use user::*;

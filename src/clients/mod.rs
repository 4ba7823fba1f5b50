//! HTTP clients for the score spreadsheet and the social platform.

pub mod error;
pub mod sheets;
pub mod social;

pub use error::{ClientError, ClientResult};
pub use sheets::{SheetSnapshot, SheetsClient};
pub use social::{SocialClient, SocialPost};

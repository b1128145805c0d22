pub mod config;
pub mod exception;
pub mod gophermap;
pub mod menu;
pub mod param;
pub mod request;
pub mod response;
pub mod server;
pub mod util;

pub use config::{CliArgs, Config};
pub use exception::Exception;
pub use gophermap::Gophermap;
pub use menu::MenuEntry;
pub use param::ItemType;
pub use request::Request;
pub use response::Served;
pub use server::Server;

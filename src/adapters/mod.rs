pub mod email;
pub mod image;
pub mod oracle;
#[cfg(feature = "push")]
pub mod push;
pub mod store;
#[cfg(feature = "browser")]
pub mod webdriver;

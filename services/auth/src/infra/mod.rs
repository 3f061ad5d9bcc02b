pub mod backend;
pub mod cache;
pub mod clock;
pub mod mailer;
pub mod memory;
pub mod sweeper;

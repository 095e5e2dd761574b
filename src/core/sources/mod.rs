// Event sources: turn external signals into coordinator commands.
//
// - listener.rs: JSON-lines feed of posted notifications and stop requests
// - poller.rs: Periodic HTTP poll of a remote alert endpoint

pub mod listener;
pub mod poller;

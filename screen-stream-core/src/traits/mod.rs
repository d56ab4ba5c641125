pub mod authorization_requester;
pub mod capture_delegate;
pub mod mode_flags;
pub mod pcm_source;
pub mod projection;

pub mod bounded_queue;
pub mod mixer_engine;
pub mod pcm;

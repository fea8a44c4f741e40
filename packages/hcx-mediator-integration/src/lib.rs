pub mod common;

mod claim;
mod dispatch;
mod token_cache;

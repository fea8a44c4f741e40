mod dispatcher;
mod headers;
mod operations;

pub use dispatcher::{Dispatch, Dispatcher};
pub use headers::ProtocolHeaders;
pub use operations::Operation;

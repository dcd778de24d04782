//! `reqtrace` Core — task-scoped request context, emitter re-scoping, and the
//! context-enriching logging facade.

pub mod context;
pub mod emitter;
pub mod logger;
pub mod payload;
pub mod rescope;

pub use context::{
    push_request_context, push_user, request_context, run_with_context, sync_scope,
    try_request_context, ContextFutureExt, ContextRecord, REQUEST_ID_KEY, USER_KEY,
};
pub use emitter::{EventEmitter, HandlerId};
pub use logger::Logger;
pub use payload::{ErrorDetails, HttpErrorDetails, LogPayload};
pub use rescope::ScopedEmitter;

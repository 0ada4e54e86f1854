mod forms;
mod handlers;

pub(super) use handlers::*;

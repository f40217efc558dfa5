pub(crate) mod dispatcher;
pub(crate) mod scheduler;

pub(crate) mod access;
pub(crate) mod certificates;
pub(crate) mod completion;
pub(crate) mod enrollment;
pub(crate) mod errors;
pub(crate) mod facts;
pub(crate) mod moderation;
pub(crate) mod progress;

pub(in crate::app) mod interaction;
pub(in crate::app) mod scene;
pub(in crate::app) mod view;
pub(in crate::app) mod viewport;

pub mod compose;
pub mod derive;
pub mod discrete;
pub mod layer;
pub mod zorder;

mod coordinator;
mod event;
mod view;

pub use coordinator::Coordinator;
pub use event::{Event, UserCommand};
pub use view::{Controls, Presenter, ViewState};

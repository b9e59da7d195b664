pub mod cloze;
pub mod event;
pub mod stream;

mod doc_store;

pub use self::doc_store::{
    DocStore, DocStoreError, DocStoreOperation, DocStoreOutput, DocStoreResult,
};

// Render comes straight from Crux; the document store is ours.
pub use crux_core::render::Render;

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub doc_store: DocStore<Event>,
}

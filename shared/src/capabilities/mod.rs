mod journal;
mod kv;
mod timer;

pub use self::journal::{
    ApiFailure, Journal, JournalOperation, JournalOutput, JournalResult, NewRecord,
    RecordChanges,
};
pub use self::kv::{decode_section, encode_section, KvError, ACTIVE_SECTION_KEY};
pub use self::timer::{Timer, TimerId, TimerIds, TimerOperation, TimerOutput};

// Render is Crux's built-in capability; it needs nothing beyond the default.
pub use crux_core::render::Render;
pub use crux_kv::KeyValue;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub journal: Journal<Event>,
    pub timer: Timer<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
}

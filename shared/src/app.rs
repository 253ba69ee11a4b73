use tracing::{debug, error};

use crate::capabilities::{encode_section, Capabilities, TimerOutput, ACTIVE_SECTION_KEY};
use crate::command::Command;
use crate::event::Event;
use crate::model::Model;
use crate::view::ViewModel;

#[derive(Default)]
pub struct App;

impl App {
    /// Hands one command to the capability that performs it. Every async
    /// answer comes back as an `Event` for the next `update`.
    fn perform(command: Command, caps: &Capabilities) {
        match command {
            Command::Api { operation, reply } => {
                debug!(op = operation.name(), mutation = operation.is_mutation(), "journal request");
                caps.journal.request(operation, move |result| Event::JournalResponded {
                    reply,
                    result: Box::new(result),
                });
            }
            Command::StartTimer { id, after_ms } => {
                caps.timer.start(id, after_ms, move |output| match output {
                    TimerOutput::Fired => Event::TimerFired { id },
                    TimerOutput::Cancelled => Event::Noop,
                });
            }
            Command::CancelTimer { id } => caps.timer.cancel(id),
            Command::LoadSection => {
                caps.kv.get(ACTIVE_SECTION_KEY.to_string(), |result| {
                    Event::SectionLoaded(result.ok().flatten())
                });
            }
            Command::PersistSection(section) => match encode_section(section) {
                Ok(bytes) => {
                    caps.kv.set(ACTIVE_SECTION_KEY.to_string(), bytes, |result| {
                        Event::SectionPersisted {
                            ok: result.is_ok(),
                        }
                    });
                }
                Err(e) => error!(error = %e, section = section.as_str(), "section not persisted"),
            },
            Command::Render => caps.render.render(),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(
            event = event.name(),
            user_initiated = event.is_user_initiated(),
            "update"
        );

        for command in model.controller.handle(event) {
            Self::perform(command, caps);
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from(&model.controller)
    }
}

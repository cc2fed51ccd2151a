use super::CodePilotError;

/// Events produced by a generation worker, tagged with the generation number
/// of the session that spawned it.
#[derive(Debug)]
pub enum Event {
    Fragment(u64, String),
    StreamDone(u64),
    StreamFailed(u64, CodePilotError),
}

impl Event {
    pub fn generation(&self) -> u64 {
        match self {
            Event::Fragment(generation, _) => return *generation,
            Event::StreamDone(generation) => return *generation,
            Event::StreamFailed(generation, _) => return *generation,
        }
    }
}

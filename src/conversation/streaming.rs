use crate::conversation::model::{MessageLog, Role};
use crate::types::events::agent::{ResponsePart, ResponsePartType};

/// Merges `start`/`delta`/`stop` parts into one agent message.
///
/// Parts carry no response id, so there is at most one open message and every
/// delta targets it. A delta or stop with nothing open starts a new message
/// rather than reopening a closed one.
#[derive(Debug, Clone, Default)]
pub struct StreamingAssembler {
    open: Option<usize>,
}

impl StreamingAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, log: &mut MessageLog, part: &ResponsePart) {
        match part.part_type() {
            ResponsePartType::Start => {
                if let Some(previous) = self.open.take() {
                    tracing::debug!("start part closes the previous streamed message");
                    log.close(previous);
                }
                self.open = Some(log.push(Role::Agent, part.text(), true));
            }
            ResponsePartType::Delta => match self.open {
                Some(index) => log.append_text(index, part.text()),
                None => self.open = Some(log.push(Role::Agent, part.text(), true)),
            },
            ResponsePartType::Stop => match self.open.take() {
                Some(index) => {
                    log.append_text(index, part.text());
                    log.close(index);
                }
                None if part.text().is_empty() => {}
                None => {
                    log.push(Role::Agent, part.text(), false);
                }
            },
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.open.is_some()
    }

    /// Detaches the open message, if any, without closing it in the log.
    pub(crate) fn take_open(&mut self) -> Option<usize> {
        self.open.take()
    }

    pub fn reset(&mut self) {
        self.open = None;
    }
}

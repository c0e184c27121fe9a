//! Reader pipeline (spec §4.1 "reader pipeline"): consumers register for a
//! message type (or every type, as a wildcard), and each message in an
//! incoming packet is handed to every matching consumer in registration
//! order until one asks to drop it.

use super::message::Message;
use super::packet::Packet;

/// What a consumer wants done with the message (and, transitively, the
/// packet) it just looked at.
///
/// Declaration order doubles as severity order for the `Ord` derive below
/// (worst-wins aggregation picks the `max` across every matching consumer):
/// `Accept < DropMessageButForward < DropMessage < DropPacket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConsumerResult {
    /// Keep processing; the message is eligible for forwarding.
    Accept,
    /// Stop running consumers on this message, but forward it anyway (the
    /// consumer couldn't use it locally but it's still valid to relay).
    DropMessageButForward,
    /// Stop running consumers on this message; do not forward it.
    DropMessage,
    /// Abort the entire packet: no further message in it is processed or
    /// forwarded. Used for transport-level corruption, not routine
    /// "not for me" rejections.
    DropPacket,
}

pub trait MessageConsumer {
    /// `None` means "every message type" (e.g. duplicate-set bookkeeping).
    fn msg_type(&self) -> Option<u8>;
    fn process(&mut self, msg: &Message) -> ConsumerResult;
}

#[derive(Debug, Default)]
pub struct ReaderOutcome {
    /// Messages that survived every consumer and should be considered for
    /// forwarding by the caller (which applies hop-limit/hop-count rules
    /// and duplicate-set bookkeeping is itself just another consumer).
    pub to_forward: Vec<Message>,
}

#[derive(Default)]
pub struct Reader {
    consumers: Vec<Box<dyn MessageConsumer>>,
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, consumer: Box<dyn MessageConsumer>) {
        self.consumers.push(consumer);
    }

    pub fn process_packet(&mut self, packet: &Packet) -> ReaderOutcome {
        let mut outcome = ReaderOutcome::default();
        for msg in &packet.messages {
            match self.process_message(msg) {
                ConsumerResult::Accept | ConsumerResult::DropMessageButForward => {
                    outcome.to_forward.push(msg.clone());
                }
                ConsumerResult::DropMessage => {}
                ConsumerResult::DropPacket => {
                    outcome.to_forward.clear();
                    return outcome;
                }
            }
        }
        outcome
    }

    /// Worst-wins aggregation across every matching consumer:
    /// `DropPacket` > `DropMessage` > `DropMessageButForward` > `Accept`.
    fn process_message(&mut self, msg: &Message) -> ConsumerResult {
        let mut worst = ConsumerResult::Accept;
        for consumer in &mut self.consumers {
            if !matches!(consumer.msg_type(), None | Some(t) if t == msg.msg_type) {
                continue;
            }
            let result = consumer.process(msg);
            if result > worst {
                worst = result;
            }
            if worst == ConsumerResult::DropPacket {
                break;
            }
        }
        worst
    }
}

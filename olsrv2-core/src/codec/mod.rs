//! RFC 5444 binary packet/message/TLV codec (spec §4.1).
//!
//! Layering, outside in: [`packet`] (packet header + message list) wraps
//! [`message`] (message header + TLV block + address block) which in turn
//! uses [`addrblock`] (head/tail-compressed address list) and [`tlv`]
//! (generic TLV). [`reader`] and [`writer`] are the consumer-facing
//! pipelines built on top: decode/dispatch and pack/fragment respectively.

pub mod addrblock;
pub mod message;
pub mod packet;
pub mod reader;
pub mod tlv;
pub mod writer;

pub use message::Message;
pub use packet::Packet;
pub use reader::{ConsumerResult, MessageConsumer, Reader, ReaderOutcome};
pub use tlv::Tlv;
pub use writer::{MessageTooLarge, PacketSeqGenerator, Writer};

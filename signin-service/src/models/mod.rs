pub mod identity;
pub mod ticket;

pub use identity::{AuxiliaryFields, Identity, NewIdentity};
pub use ticket::{FlowType, Ticket, TicketParseError, TicketValue};

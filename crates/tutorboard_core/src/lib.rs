pub mod domain;
pub mod funnel;
pub mod ports;
pub mod schedule;

pub use domain::{BookingConfirmation, CreditBalance, Session, SessionStatus, Teacher};
pub use funnel::{EntryMode, FunnelStage, SelectionFunnel};
pub use ports::{AuthContext, MarketplaceService, PortError, PortResult};

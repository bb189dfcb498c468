pub mod broker;
pub mod errors;
pub mod models;
pub mod provision;
pub mod services;

pub use broker::credentials::BrokerCredentials;
pub use broker::kis::KisClient;
pub use broker::traits::{BrokerClient, BrokerSession};
pub use errors::CoreError;
pub use models::balance::Balance;
pub use models::benchmark::{BenchmarkSeries, BenchmarkTrack};
pub use models::pnl::{PlPoint, ReportPeriod};
pub use models::position::Position;
pub use models::quote::Quote;
pub use models::transaction::{TradeSide, Transaction};
pub use services::data_service::{DataService, DataServiceConfig};

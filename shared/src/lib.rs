mod errors;
mod logging;
pub mod testing;

pub use errors::{FixtureError, LoggingError};
pub use logging::{DEFAULT_LOG_FILTER, init_logging, init_test_logging};
pub use testing::{
    TestSockets, create_test_sockets, exchange_raw, missing_test_asset, write_test_asset,
};

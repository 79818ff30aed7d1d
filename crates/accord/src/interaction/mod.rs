//! Interaction records: what the consumer sends and what it expects back.

mod builder;
mod observed;
mod types;

pub(crate) use builder::validate_method;
pub use builder::InteractionBuilder;
pub use observed::{parse_query_string, ObservedRequest, ObservedResponse};
pub use types::{Interaction, RequestExpectation, ResponseExpectation};

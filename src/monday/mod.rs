/// Monday.com integration: GraphQL client, file upload and item-to-inputs mapping

pub mod client;
pub mod inputs;
pub mod types;

pub use client::{MondayClient, MondayError};
pub use inputs::{
    decide_mode, find_missing, item_to_field_inputs, normalize_fields, required_fields,
    FieldInputs,
};
pub use types::{Item, ItemSummary};

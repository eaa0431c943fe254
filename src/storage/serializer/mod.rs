pub mod record_serializer;

pub use record_serializer::{
    hint_from_bytes, hint_to_bytes, history_from_bytes, history_to_bytes, norm_query_from_bytes,
    norm_query_to_bytes, raw_query_from_bytes, raw_query_to_bytes,
};

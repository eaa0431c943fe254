use crate::core::StorageError;
use crate::storage::records::{
    ActiveHintRecord, NormalizedQueryRecord, PlanHistoryRecord, RawQueryRecord,
};

pub fn history_to_bytes(record: &PlanHistoryRecord) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(record).map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub fn history_from_bytes(bytes: &[u8]) -> Result<PlanHistoryRecord, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub fn norm_query_to_bytes(record: &NormalizedQueryRecord) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(record).map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub fn norm_query_from_bytes(bytes: &[u8]) -> Result<NormalizedQueryRecord, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub fn raw_query_to_bytes(record: &RawQueryRecord) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(record).map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub fn raw_query_from_bytes(bytes: &[u8]) -> Result<RawQueryRecord, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub fn hint_to_bytes(record: &ActiveHintRecord) -> Result<Vec<u8>, StorageError> {
    serde_json::to_vec(record).map_err(|e| StorageError::SerializationError(e.to_string()))
}

pub fn hint_from_bytes(bytes: &[u8]) -> Result<ActiveHintRecord, StorageError> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::SerializationError(e.to_string()))
}

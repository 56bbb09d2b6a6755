/// Remote raw-model (base asset) identifier.
pub type AssetId = i64;

/// Remote rapid-model (optimization job) identifier.
pub type JobId = i64;

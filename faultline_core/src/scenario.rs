//! Fault-injection scenarios and the traffic each one needs.
//!
//! A scenario is identified by its string key (the same key the external
//! injection API uses as `error_type`). Definitions are built once at
//! startup into a [`ScenarioCatalog`] and never mutated.

use serde::{Deserialize, Serialize};

/// Shape of the synthetic request a scenario generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestShape {
    /// `GET {sample_api}/items`
    ReadCollection,

    /// `GET {sample_api}/items/{test_id}`
    ReadById,

    /// `POST {sample_api}/items` with a timestamped body
    Write,
}

impl std::fmt::Display for RequestShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestShape::ReadCollection => write!(f, "get_items"),
            RequestShape::ReadById => write!(f, "get_by_id"),
            RequestShape::Write => write!(f, "post_items"),
        }
    }
}

/// Built-in scenario identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Bucket policy blocks writes to the backing store
    S3Access,

    /// 3000ms latency injected into the collection read
    Latency,

    /// Reads by id return 404
    WrongIds,

    /// Function concurrency limited to 1, bursts trigger 429s
    LambdaThrottle,

    /// Table throughput exceeded, writes return 500
    DynamodbThrottle,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::S3Access,
            ScenarioId::Latency,
            ScenarioId::WrongIds,
            ScenarioId::LambdaThrottle,
            ScenarioId::DynamodbThrottle,
        ]
    }

    /// Returns the scenario key.
    pub fn key(&self) -> &'static str {
        match self {
            ScenarioId::S3Access => "s3_access",
            ScenarioId::Latency => "latency",
            ScenarioId::WrongIds => "wrong_ids",
            ScenarioId::LambdaThrottle => "lambda_throttle",
            ScenarioId::DynamodbThrottle => "dynamodb_throttle",
        }
    }

    /// Returns the display name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::S3Access => "Scenario 1: S3 access denied",
            ScenarioId::Latency => "Scenario 2: API latency",
            ScenarioId::WrongIds => "Scenario 3: Resource not found (404)",
            ScenarioId::LambdaThrottle => "Scenario 4: Lambda throttling",
            ScenarioId::DynamodbThrottle => "Scenario 5: DynamoDB throttling",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::S3Access => "Bucket policy blocks S3 writes, simulating a permissions misconfiguration",
            ScenarioId::Latency => "Injects 3000ms delay into GET /items, simulating a slow network or backend",
            ScenarioId::WrongIds => "Returns 404, simulating requests for resource ids that do not exist",
            ScenarioId::LambdaThrottle => "Limits Lambda concurrency to 1, producing 429s under concurrent load",
            ScenarioId::DynamodbThrottle => "Simulates DynamoDB throughput exceeded, returning 500s",
        }
    }

    /// Returns the alarm expected to fire while the fault is active.
    pub fn alarm(&self) -> &'static str {
        match self {
            ScenarioId::S3Access => "PostItems-5XX",
            ScenarioId::Latency => "GetAllItems-Latency",
            ScenarioId::WrongIds => "GetItemById-4XX",
            ScenarioId::LambdaThrottle => "PostItems-4XX",
            ScenarioId::DynamodbThrottle => "PostItems-5XX",
        }
    }

    /// Returns the request shape the scenario's traffic uses.
    pub fn request_shape(&self) -> RequestShape {
        match self {
            ScenarioId::Latency => RequestShape::ReadCollection,
            ScenarioId::WrongIds => RequestShape::ReadById,
            ScenarioId::S3Access | ScenarioId::LambdaThrottle | ScenarioId::DynamodbThrottle => {
                RequestShape::Write
            }
        }
    }

    /// Returns true if the scenario needs concurrent bursts to show up.
    pub fn is_burst(&self) -> bool {
        matches!(self, ScenarioId::LambdaThrottle)
    }

    /// Builds the static definition for this scenario.
    pub fn definition(&self) -> ScenarioDefinition {
        ScenarioDefinition {
            key: self.key().to_string(),
            name: self.name().to_string(),
            description: self.description().to_string(),
            alarm: self.alarm().to_string(),
            request_shape: self.request_shape(),
            concurrent_burst: self.is_burst(),
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3_access" | "s3access" | "1" => Ok(ScenarioId::S3Access),
            "latency" | "2" => Ok(ScenarioId::Latency),
            "wrong_ids" | "wrongids" | "3" => Ok(ScenarioId::WrongIds),
            "lambda_throttle" | "lambdathrottle" | "4" => Ok(ScenarioId::LambdaThrottle),
            "dynamodb_throttle" | "dynamodbthrottle" | "5" => Ok(ScenarioId::DynamodbThrottle),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Static, immutable description of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Key shared with the injection API (`error_type`)
    pub key: String,

    /// Human-readable name
    pub name: String,

    /// What the fault simulates
    pub description: String,

    /// Alarm the fault should trip
    pub alarm: String,

    /// Request shape of the background traffic
    pub request_shape: RequestShape,

    /// Whether traffic is sent in concurrent bursts
    pub concurrent_burst: bool,
}

impl ScenarioDefinition {
    /// True when each cycle fires a burst instead of a single request.
    ///
    /// Only write scenarios of the burst kind qualify.
    pub fn uses_burst(&self) -> bool {
        self.concurrent_burst && self.request_shape == RequestShape::Write
    }
}

/// The fixed set of scenarios known to a registry.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    definitions: Vec<ScenarioDefinition>,
}

impl ScenarioCatalog {
    /// Creates a catalog from explicit definitions.
    ///
    /// Later duplicates of a key are dropped.
    pub fn new(definitions: Vec<ScenarioDefinition>) -> Self {
        let mut unique: Vec<ScenarioDefinition> = Vec::with_capacity(definitions.len());
        for def in definitions {
            if !unique.iter().any(|d| d.key == def.key) {
                unique.push(def);
            }
        }
        Self { definitions: unique }
    }

    /// Catalog of the built-in scenarios.
    pub fn builtin() -> Self {
        Self::new(ScenarioId::all().iter().map(ScenarioId::definition).collect())
    }

    /// Looks up a definition by key.
    pub fn get(&self, key: &str) -> Option<&ScenarioDefinition> {
        self.definitions.iter().find(|d| d.key == key)
    }

    /// True if the key is known.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.key.as_str())
    }

    /// Definitions in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ScenarioDefinition> {
        self.definitions.iter()
    }

    /// Number of scenarios.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// True if the catalog has no scenarios.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for ScenarioCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_keys() {
        let catalog = ScenarioCatalog::builtin();
        let keys: Vec<&str> = catalog.keys().collect();
        assert_eq!(
            keys,
            vec!["s3_access", "latency", "wrong_ids", "lambda_throttle", "dynamodb_throttle"]
        );
    }

    #[test]
    fn test_only_lambda_throttle_bursts() {
        let bursting: Vec<String> = ScenarioCatalog::builtin()
            .iter()
            .filter(|d| d.uses_burst())
            .map(|d| d.key.clone())
            .collect();
        assert_eq!(bursting, vec!["lambda_throttle".to_string()]);
    }

    #[test]
    fn test_burst_flag_requires_write_shape() {
        let mut def = ScenarioId::Latency.definition();
        def.concurrent_burst = true;
        assert!(!def.uses_burst());
    }

    #[test]
    fn test_parse_round_trips_keys() {
        for id in ScenarioId::all() {
            assert_eq!(id.key().parse::<ScenarioId>(), Ok(id));
        }
        assert!("meteor_strike".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_catalog_drops_duplicate_keys() {
        let catalog = ScenarioCatalog::new(vec![
            ScenarioId::Latency.definition(),
            ScenarioId::Latency.definition(),
        ]);
        assert_eq!(catalog.len(), 1);
    }
}

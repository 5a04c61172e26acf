// GPTC Library
// Generative pre-trained traffic controller: telemetry in, validated commands out

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod mode;
pub mod oracle;
pub mod prompt;
pub mod query_loop;
pub mod scenario;
pub mod scheduler;
pub mod secrets;
pub mod separation;
pub mod telemetry;
pub mod validation;

// Re-export the types most callers need
pub use config::{ConfigError, GptcConfig};
pub use controller::{GptcController, SlowTickOutcome};
pub use dispatch::{CommandDispatcher, DispatchReport};
pub use error::{GptcError, GptcResult};
pub use host::{CommandSink, DispatchError, MemoryHost, TelemetryProvider};
pub use mode::{Mode, ValidationPolicy};
pub use oracle::{Oracle, OracleConfig, OracleError, OracleFactory, ScriptedOracle};
pub use prompt::{BuiltinPromptStore, FilePromptStore, Prompt, PromptAssembler, PromptStore};
pub use query_loop::{ExhaustionPolicy, QueryError, QueryLoop, QueryOutcome, RetryConfig};
pub use scheduler::{TickHandler, TickScheduler};
pub use secrets::SecretStore;
pub use separation::{SeparationMinima, SeparationMonitor, SeparationViolation};
pub use telemetry::{AircraftTelemetry, TelemetryEncoder, TelemetrySnapshot};
pub use validation::{ResponseValidator, ValidationVerdict};

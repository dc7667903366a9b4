//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use weft_core::{
    CacheConfig, Graph, Tier, TieredCache, WeftError,
    path,
    primitives::{LONG_MAX_DEPTH, MAX_SCRIPT_OPS, MEDIUM_MAX_DEPTH},
};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for script execution (10 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_SCRIPT_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum file size for configuration files (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &PathBuf, max_size: u64) -> Result<(), WeftError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| WeftError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(WeftError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate file path for security.
///
/// This function:
/// 1. Canonicalizes the path to resolve symlinks and ".."
/// 2. Ensures the path exists
/// 3. Ensures the path is a file (not a directory)
///
/// # Security Note
///
/// This prevents path traversal attacks where a malicious path like
/// "../../../etc/passwd" could be used to access sensitive files.
fn validate_file_path(path: &Path) -> Result<PathBuf, WeftError> {
    // Canonicalize resolves "..", symlinks, and validates existence
    let canonical = path
        .canonicalize()
        .map_err(|e| WeftError::IoError(format!("Invalid file path '{}': {}", path.display(), e)))?;

    // Ensure it's a file, not a directory
    if !canonical.is_file() {
        return Err(WeftError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Server configuration file contents.
///
/// Every field is optional: missing fields keep the CLI values, and a
/// partial `[cache]` table keeps the built-in defaults for whatever it
/// does not mention.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: Option<String>,
    port: Option<u16>,
    cache: Option<CacheConfig>,
}

/// Load a TOML server configuration file.
fn load_server_config(config_path: &Path) -> Result<ServerConfig, WeftError> {
    let validated_path = validate_file_path(config_path)?;
    validate_file_size(&validated_path, MAX_CONFIG_FILE_SIZE)?;

    let contents = std::fs::read_to_string(&validated_path)
        .map_err(|e| WeftError::IoError(format!("Read config: {}", e)))?;

    toml::from_str(&contents)
        .map_err(|e| WeftError::SerializationError(format!("Parse config: {}", e)))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
///
/// Values from the config file (when given) override the CLI flags; the
/// cache tuning comes from the file's `[cache]` table or the built-in
/// defaults.
pub async fn cmd_server(host: &str, port: u16, config_file: Option<&Path>) -> Result<(), WeftError> {
    let config = match config_file {
        Some(config_path) => load_server_config(config_path)?,
        None => ServerConfig::default(),
    };
    let host = config.host.as_deref().unwrap_or(host);
    let port = config.port.unwrap_or(port);
    let cache_config = config.cache.unwrap_or_default();

    println!("Weft Dependency-Aware State Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:   {}", host);
    println!("  Port:   {}", port);
    match config_file {
        Some(config_path) => println!("  Config: {:?}", config_path),
        None => println!("  Config: built-in defaults"),
    }
    println!(
        "  Cache:  short {} / medium {} (demote after {} idle cycles)",
        cache_config.short_capacity, cache_config.medium_capacity, cache_config.demotion_after_cycles
    );
    println!();
    println!("Endpoints:");
    println!("  POST   /fact         - Write a base fact");
    println!("  GET    /fact/{{name}}  - Read a fact");
    println!("  POST   /facts/query  - Pattern query over facts");
    println!("  GET    /graph/edges  - Dependency introspection");
    println!("  POST   /cache        - Store a cache entry");
    println!("  GET    /cache/{{key}}  - Cache lookup");
    println!("  POST   /cache/tick   - Advance the maintenance cycle");
    println!("  GET    /cache/stats  - Occupancy snapshot");
    println!("  GET    /health       - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let graph: Graph<Value> = Graph::new();
    let cache: TieredCache<Value> = TieredCache::with_config(cache_config);

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, graph, cache).await
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Execute a script of operations against fresh in-memory instances.
///
/// The script is a JSON array of operation objects, each carrying an `op`
/// field (`set`, `read`, `query`, `put`, `get`, `exists`, `delete`,
/// `cache_query`, `tick`, `stats`, `history`). Operations run in order
/// against one fresh graph and one fresh cache; the first failing
/// operation aborts the script.
pub fn cmd_run(file: &Path, json_mode: bool) -> Result<(), WeftError> {
    tracing::info!("Running script from {:?}", file);

    // Validate file path for security (prevents path traversal)
    let validated_path = validate_file_path(file)?;

    // Validate file size before reading to prevent DoS
    validate_file_size(&validated_path, MAX_SCRIPT_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| WeftError::SerializationError(format!("Read file: {}", e)))?;

    let ops: Vec<Value> = serde_json::from_slice(&contents)
        .map_err(|e| WeftError::SerializationError(format!("Parse script: {}", e)))?;

    // Validate operation count to prevent DoS
    if ops.len() > MAX_SCRIPT_OPS {
        return Err(WeftError::SerializationError(format!(
            "Operation count {} exceeds maximum allowed {}",
            ops.len(),
            MAX_SCRIPT_OPS
        )));
    }

    let mut graph: Graph<Value> = Graph::new();
    let mut cache: TieredCache<Value> = TieredCache::new();

    if !json_mode {
        println!("Executing script: {:?} ({} operations)", file, ops.len());
        println!();
    }

    let mut results = Vec::with_capacity(ops.len());
    for (index, op) in ops.iter().enumerate() {
        let result = execute_op(&mut graph, &mut cache, op)?;
        if !json_mode {
            println!("  [{}] {}", index, describe(&result));
        }
        results.push(result);
    }

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&results).unwrap_or_default()
        );
        return Ok(());
    }

    let stats = cache.stats();
    println!();
    println!("Script complete: {} operations", results.len());
    println!(
        "Graph: {} facts ({} dirty)",
        graph.node_count(),
        graph.dirty_count()
    );
    println!(
        "Cache: long {} / medium {} / short {} (cycle {})",
        stats.long_count, stats.medium_count, stats.short_count, stats.cycle
    );

    Ok(())
}

/// Error for a script operation missing a required field.
fn missing_field(op: &str, field: &str) -> WeftError {
    WeftError::SerializationError(format!("Operation '{}' is missing field '{}'", op, field))
}

/// Parse a tier name from a script operation.
fn parse_tier(name: &str) -> Result<Tier, WeftError> {
    match name {
        "long" => Ok(Tier::Long),
        "medium" => Ok(Tier::Medium),
        "short" => Ok(Tier::Short),
        _ => Err(WeftError::SerializationError(format!(
            "Unknown tier: {}. Use: long, medium, short",
            name
        ))),
    }
}

/// Execute one script operation, returning its JSON result.
fn execute_op(
    graph: &mut Graph<Value>,
    cache: &mut TieredCache<Value>,
    op: &Value,
) -> Result<Value, WeftError> {
    let kind = op["op"]
        .as_str()
        .ok_or_else(|| missing_field("?", "op"))?;

    match kind {
        "set" => {
            let name = op["name"].as_str().ok_or_else(|| missing_field("set", "name"))?;
            let value = op
                .get("value")
                .cloned()
                .ok_or_else(|| missing_field("set", "value"))?;
            let created = !graph.contains(name);
            graph.set(name, value)?;
            Ok(json!({ "op": "set", "name": name, "created": created }))
        }

        "read" => {
            let name = op["name"].as_str().ok_or_else(|| missing_field("read", "name"))?;
            let value = graph.read(name);
            Ok(json!({
                "op": "read",
                "name": name,
                "found": value.is_some(),
                "value": value,
            }))
        }

        "query" => {
            let pattern = op["pattern"]
                .as_str()
                .ok_or_else(|| missing_field("query", "pattern"))?;
            let results = graph.query(pattern);
            Ok(json!({
                "op": "query",
                "pattern": pattern,
                "count": results.len(),
                "results": results,
            }))
        }

        "put" => {
            let key = op["key"].as_str().ok_or_else(|| missing_field("put", "key"))?;
            let value = op
                .get("value")
                .cloned()
                .ok_or_else(|| missing_field("put", "value"))?;
            let tier = match op.get("tier").and_then(|t| t.as_str()) {
                Some(name) => cache.put_in(key, value, parse_tier(name)?),
                None => cache.put(key, value),
            };
            Ok(json!({ "op": "put", "key": key, "tier": tier }))
        }

        "get" => {
            let key = op["key"].as_str().ok_or_else(|| missing_field("get", "key"))?;
            let value = cache.get(key);
            Ok(json!({
                "op": "get",
                "key": key,
                "found": value.is_some(),
                "value": value,
                "tier": cache.tier_of(key),
            }))
        }

        "exists" => {
            let key = op["key"].as_str().ok_or_else(|| missing_field("exists", "key"))?;
            Ok(json!({ "op": "exists", "key": key, "exists": cache.exists(key) }))
        }

        "delete" => {
            let key = op["key"].as_str().ok_or_else(|| missing_field("delete", "key"))?;
            cache.delete(key)?;
            Ok(json!({ "op": "delete", "key": key }))
        }

        "cache_query" => {
            let pattern = op["pattern"]
                .as_str()
                .ok_or_else(|| missing_field("cache_query", "pattern"))?;
            let results = cache.query_pattern(pattern);
            Ok(json!({
                "op": "cache_query",
                "pattern": pattern,
                "count": results.len(),
                "results": results,
            }))
        }

        "tick" => {
            let demoted = cache.tick();
            Ok(json!({ "op": "tick", "cycle": cache.cycle(), "demoted": demoted }))
        }

        "stats" => {
            let stats = serde_json::to_value(cache.stats())
                .map_err(|e| WeftError::SerializationError(e.to_string()))?;
            Ok(json!({ "op": "stats", "stats": stats }))
        }

        "history" => {
            let n = op["n"].as_u64().map_or(usize::MAX, |n| n as usize);
            let keys = cache.recent_history(n);
            Ok(json!({ "op": "history", "count": keys.len(), "keys": keys }))
        }

        _ => Err(WeftError::SerializationError(format!(
            "Unknown operation: {}. Use: set, read, query, put, get, exists, delete, cache_query, tick, stats, history",
            kind
        ))),
    }
}

/// Render a script operation result as a one-line summary.
fn describe(result: &Value) -> String {
    match result["op"].as_str().unwrap_or("?") {
        "set" => {
            let verb = if result["created"].as_bool().unwrap_or(false) {
                "created"
            } else {
                "updated"
            };
            format!("set {} ({})", result["name"].as_str().unwrap_or("?"), verb)
        }
        "read" => {
            let name = result["name"].as_str().unwrap_or("?");
            if result["found"].as_bool().unwrap_or(false) {
                format!("read {} -> {}", name, result["value"])
            } else {
                format!("read {} -> not found", name)
            }
        }
        "query" | "cache_query" => format!(
            "{} {} -> {} matches",
            result["op"].as_str().unwrap_or("?"),
            result["pattern"].as_str().unwrap_or("?"),
            result["count"].as_u64().unwrap_or(0)
        ),
        "put" => format!(
            "put {} -> {}",
            result["key"].as_str().unwrap_or("?"),
            result["tier"].as_str().unwrap_or("?")
        ),
        "get" => {
            let key = result["key"].as_str().unwrap_or("?");
            if result["found"].as_bool().unwrap_or(false) {
                format!(
                    "get {} -> {} (tier: {})",
                    key,
                    result["value"],
                    result["tier"].as_str().unwrap_or("?")
                )
            } else {
                format!("get {} -> miss", key)
            }
        }
        "exists" => format!(
            "exists {} -> {}",
            result["key"].as_str().unwrap_or("?"),
            result["exists"].as_bool().unwrap_or(false)
        ),
        "delete" => format!("delete {}", result["key"].as_str().unwrap_or("?")),
        "tick" => format!(
            "tick -> cycle {}, demoted {}",
            result["cycle"].as_u64().unwrap_or(0),
            result["demoted"].as_u64().unwrap_or(0)
        ),
        "stats" => format!(
            "stats -> long {} / medium {} / short {}",
            result["stats"]["long_count"].as_u64().unwrap_or(0),
            result["stats"]["medium_count"].as_u64().unwrap_or(0),
            result["stats"]["short_count"].as_u64().unwrap_or(0)
        ),
        "history" => format!("history -> {} keys", result["count"].as_u64().unwrap_or(0)),
        other => other.to_string(),
    }
}

// =============================================================================
// MATCH COMMAND
// =============================================================================

/// Test a wildcard pattern against names.
pub fn cmd_match(pattern: &str, names: &[String], json_mode: bool) -> Result<(), WeftError> {
    let is_pattern = path::is_pattern(pattern);

    if json_mode {
        let matches: Vec<Value> = names
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "matched": path::matches(pattern, name),
                })
            })
            .collect();
        let output = json!({
            "pattern": pattern,
            "is_pattern": is_pattern,
            "matches": matches,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    let label = if is_pattern { "wildcard" } else { "exact name" };
    println!("Pattern: {} ({})", pattern, label);
    println!();

    let mut matched = 0;
    for name in names {
        if path::matches(pattern, name) {
            matched += 1;
            println!("  {:<32} match", name);
        } else {
            println!("  {:<32} -", name);
        }
    }

    println!();
    println!("{} of {} names match", matched, names.len());

    Ok(())
}

// =============================================================================
// CLASSIFY COMMAND
// =============================================================================

/// Report the starting tier and context weight of keys.
pub fn cmd_classify(keys: &[String], json_mode: bool) -> Result<(), WeftError> {
    if json_mode {
        let rows: Vec<Value> = keys
            .iter()
            .map(|key| {
                let depth = path::depth(key);
                json!({
                    "key": key,
                    "depth": depth,
                    "tier": Tier::classify_depth(depth),
                    "weight_millionths": path::context_weight_millionths(key),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "keys": rows })).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Key Classification");
    println!("==================");
    for key in keys {
        let depth = path::depth(key);
        let tier = Tier::classify_depth(depth);
        println!(
            "  {:<32} tier={:<6} depth={:<2} weight={}",
            key,
            tier.as_str(),
            depth,
            path::context_weight_millionths(key)
        );
    }

    Ok(())
}

// =============================================================================
// DEFAULTS COMMAND
// =============================================================================

/// Show the built-in default tuning.
pub fn cmd_defaults(json_mode: bool) -> Result<(), WeftError> {
    let config = CacheConfig::default();

    if json_mode {
        let output = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "long_max_depth": LONG_MAX_DEPTH,
            "medium_max_depth": MEDIUM_MAX_DEPTH,
            "cache": config,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Weft Default Tuning");
    println!("===================");
    println!();
    println!("Tier bands (by key depth):");
    println!("  Long:   depth <= {}", LONG_MAX_DEPTH);
    println!("  Medium: depth <= {}", MEDIUM_MAX_DEPTH);
    println!("  Short:  deeper");
    println!();
    println!("Retention:");
    println!("  Short capacity:       {}", config.short_capacity);
    println!("  Medium capacity:      {}", config.medium_capacity);
    println!("  History capacity:     {}", config.history_capacity);
    println!();
    println!("Migration:");
    println!("  Promote to Medium at: {} accesses", config.promote_to_medium_threshold);
    println!("  Promote to Long at:   {} accesses", config.promote_to_long_threshold);
    println!("  Demote after:         {} idle cycles", config.demotion_after_cycles);

    Ok(())
}

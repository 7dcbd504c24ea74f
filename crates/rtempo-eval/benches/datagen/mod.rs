//! Synthetic data generators for rtempo-eval benchmarks.
//!
//! Generates pattern YAML and JSON events. All generators are seeded for
//! reproducibility.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed seed for reproducible benchmarks.
const SEED: u64 = 0x7E3F_0A11_CE55;

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(SEED)
}

// ---------------------------------------------------------------------------
// Value pools
// ---------------------------------------------------------------------------

pub const EVENT_TYPES: &[&str] = &[
    "login",
    "login_failed",
    "process_create",
    "file_write",
    "network_connect",
    "alert",
    "ack",
];

const USER_NAMES: &[&str] = &["admin", "alice", "bob", "svc_backup", "guest", "root"];

const HOSTS: &[&str] = &["web-01", "web-02", "db-01", "bastion", "build-07"];

// ---------------------------------------------------------------------------
// Event generators
// ---------------------------------------------------------------------------

pub fn gen_event_value(rng: &mut StdRng) -> serde_json::Value {
    let ty = EVENT_TYPES[rng.random_range(0..EVENT_TYPES.len())];
    let user = USER_NAMES[rng.random_range(0..USER_NAMES.len())];
    let host = HOSTS[rng.random_range(0..HOSTS.len())];
    let bytes = rng.random_range(0..10_000_000u64);

    serde_json::json!({
        "type": ty,
        "user": { "name": user },
        "host": host,
        "bytes": bytes,
    })
}

pub fn gen_event_values(n: usize) -> Vec<serde_json::Value> {
    let mut rng = rng();
    (0..n).map(|_| gen_event_value(&mut rng)).collect()
}

// ---------------------------------------------------------------------------
// Pattern generators
// ---------------------------------------------------------------------------

/// Generate `n` patterns cycling through the three kinds.
pub fn gen_patterns(n: usize) -> String {
    let mut rng = rng();
    let mut docs = Vec::with_capacity(n);
    for i in 0..n {
        let a = EVENT_TYPES[rng.random_range(0..EVENT_TYPES.len())];
        let b = EVENT_TYPES[rng.random_range(0..EVENT_TYPES.len())];
        let doc = match i % 3 {
            0 => format!(
                "id: seq-{i}\nsequence:\n  window: 30s\n  steps:\n    - type: {a}\n    - type: {b}\n"
            ),
            1 => format!(
                "id: freq-{i}\nfrequency:\n  window: 10s\n  threshold: {}\n  filter:\n    type: {a}\n    bytes|gte: 1000\n",
                rng.random_range(2..20u32)
            ),
            _ => format!(
                "id: corr-{i}\ncorrelation:\n  window: 1m\n  trigger:\n    type: {a}\n  response:\n    type: {b}\n"
            ),
        };
        docs.push(doc);
    }
    docs.join("---\n")
}

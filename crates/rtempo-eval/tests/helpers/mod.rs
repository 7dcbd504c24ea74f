use rtempo_eval::{Event, Outcome, TemporalEngine};
use rtempo_spec::{FilterSpec, parse_pattern_yaml};
use serde_json::{Value, json};

pub fn engine_from_yaml(yaml: &str) -> TemporalEngine {
    let collection = parse_pattern_yaml(yaml).unwrap();
    assert!(collection.errors.is_empty(), "load errors: {:?}", collection.errors);
    let engine = TemporalEngine::default();
    engine.add_collection(&collection).unwrap();
    engine
}

pub fn type_is(ty: &str) -> FilterSpec {
    FilterSpec::eq("type", ty)
}

pub fn typed(ty: &str) -> Value {
    json!({"type": ty})
}

pub fn deliver(engine: &TemporalEngine, id: &str, event_json: Value, now: i64) -> Outcome {
    let event = Event::from_value(&event_json);
    engine.deliver_event(id, &event, now)
}

//! Whatever comes in through JSON ends up as a usable pattern.

use acidstep::sequencing::{DrumInstrument, KnobKey, Pattern, PatternStore, MAX_PAGES};
use serde_json::json;

#[test]
fn empty_object_is_default_pattern() {
    let pattern = Pattern::from_value(&json!({}));
    assert_eq!(pattern, Pattern::default());
    assert_eq!(pattern.len(), 16);
}

#[test]
fn bad_note_becomes_rest() {
    let pattern = Pattern::from_value(&json!({ "steps": [{ "note": "Zz-9" }] }));
    assert_eq!(pattern.steps()[0].note, None);
}

#[test]
fn flats_and_junk_fields() {
    let pattern = Pattern::from_value(&json!({
        "steps": [
            { "note": "Db-2", "accent": 1, "slide": "yes" },
            { "note": "fb2", "extend": 0 },
            "not a step",
            null
        ],
        "knobs": { "cutoff": 99999, "resonance": "loud", "envMod": -5 },
        "waveform": "triangle"
    }));

    assert_eq!(pattern.steps()[0].note.map(|n| n.to_string()).as_deref(), Some("C#-2"));
    assert!(pattern.steps()[0].accent);
    assert!(pattern.steps()[0].slide);
    assert_eq!(pattern.steps()[1].note.map(|n| n.to_string()).as_deref(), Some("E-2"));
    assert!(!pattern.steps()[1].extend);
    assert!(pattern.steps()[2].is_empty());

    assert_eq!(pattern.knobs.get(KnobKey::Cutoff), 4000.0);
    assert_eq!(pattern.knobs.get(KnobKey::Resonance), KnobKey::Resonance.default_value());
    assert_eq!(pattern.knobs.get(KnobKey::EnvMod), 0.0);
    assert_eq!(pattern.waveform, Default::default());
}

#[test]
fn pages_are_inferred_and_clamped() {
    let steps: Vec<_> = (0..40).map(|_| json!({ "note": "A-2" })).collect();
    let pattern = Pattern::from_value(&json!({ "steps": steps }));
    assert_eq!(pattern.pages(), 3);
    assert_eq!(pattern.len(), 48);
    assert!(pattern.steps()[47].is_empty());

    let pattern = Pattern::from_value(&json!({ "pages": 99 }));
    assert_eq!(pattern.pages(), MAX_PAGES);
}

#[test]
fn legacy_drum_booleans() {
    let pattern = Pattern::from_value(&json!({ "drums": { "kick": true, "snare": true } }));
    let kick = pattern.drums().lane(DrumInstrument::Kick);
    let on: Vec<usize> = (0..16).filter(|&i| kick.is_on(i)).collect();
    assert_eq!(on, [0, 4, 8, 12]);
    let snare = pattern.drums().lane(DrumInstrument::Snare);
    let on: Vec<usize> = (0..16).filter(|&i| snare.is_on(i)).collect();
    assert_eq!(on, [4, 12]);
}

#[test]
fn saved_json_loads_back_identically() {
    let mut store = PatternStore::default();
    store.toggle_note(3, "G#-3");
    store.set_pages(2);
    store.toggle_drum(DrumInstrument::Clap, 20);
    let text = store.to_json();

    let mut other = PatternStore::default();
    other.load_json(&text).unwrap();
    assert_eq!(other.pattern(), store.pattern());
}

#[test]
fn syntax_errors_are_errors_not_panics() {
    let mut store = PatternStore::default();
    assert!(store.load_json("{ nope").is_err());
    // Failed load leaves the pattern and history alone
    assert_eq!(store.pattern(), &Pattern::default());
    assert!(!store.can_undo());
}

#[test]
fn library_entry_document_loads_its_pattern() {
    let text = r#"{
        "id": "1700000000000_abcdef",
        "name": "acid",
        "bpm": 128,
        "createdAt": "2023-11-14T22:13:20.000Z",
        "pattern": { "steps": [{ "note": "C-2", "accent": true }], "waveform": "square" }
    }"#;
    let pattern = Pattern::from_json_str(text).unwrap();
    assert_eq!(pattern.steps()[0].note.map(|n| n.to_string()).as_deref(), Some("C-2"));
    assert!(pattern.steps()[0].accent);
    assert_eq!(pattern.len(), 16);

    let mut store = PatternStore::default();
    store.load_json(text).unwrap();
    assert_eq!(store.pattern(), &pattern);
}

#[test]
fn preset_document_loads_its_pattern() {
    let pattern = Pattern::from_value(&json!({ "steps": [{ "note": "F#-1" }] }));
    let preset = json!({ "type": "TB303_TR909_PRESET", "name": "p", "bpm": 140, "tb303": pattern.to_value() });
    assert_eq!(Pattern::from_document(&preset), pattern);
}

#[test]
fn non_object_pattern_field_is_not_unwrapped() {
    // A stray scalar `pattern` key must not hide the real steps
    let pattern = Pattern::from_value(&json!({ "pattern": 3, "steps": [{ "note": "D-2" }] }));
    let loaded = Pattern::from_json_str(r#"{ "pattern": 3, "steps": [{ "note": "D-2" }] }"#).unwrap();
    assert_eq!(loaded, pattern);
    assert!(loaded.steps()[0].note.is_some());
}

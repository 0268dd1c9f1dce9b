use std::fs;
use std::path::{Path, PathBuf};

use overworld::{DefinitionError, Map, MapDefinition, MapError, NodeKind, NodeTag};

fn shipped(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../definitions").join(name)
}

#[test]
fn test_shipped_definitions_load_and_generate() {
    let meadow = MapDefinition::load(&shipped("meadow.json")).expect("meadow.json should parse");
    let forest = MapDefinition::load(&shipped("forest.toml")).expect("forest.toml should parse");

    assert_eq!(meadow.name, "Meadow");
    assert_eq!(meadow.starting_node.name, "Village");
    assert_eq!(meadow.nodes_to_generate[1].node.rules.not_after, vec![NodeTag::Battle]);
    assert!(matches!(forest.ending_nodes[0].kind, NodeKind::Win { message: Some(_) }));
    assert_eq!(forest.min_split_amount, 1, "missing keys fall back to defaults");

    let mut map =
        Map::new("Overworld", vec![meadow, forest]).expect("shipped definitions are valid");
    map.generate(2_026).expect("generation failed");
    assert_eq!(map.segments().len(), 2);
    assert!(map.graph().node_count() > 0);
}

#[test]
fn test_definition_file_round_trip_through_tempdir() {
    let dir = tempfile::tempdir().unwrap();
    let original = MapDefinition::load(&shipped("meadow.json")).unwrap();

    let json_path = dir.path().join("copy.json");
    fs::write(&json_path, serde_json::to_string_pretty(&original).unwrap()).unwrap();
    assert_eq!(MapDefinition::load(&json_path).unwrap(), original);

    let toml_path = dir.path().join("copy.toml");
    fs::write(&toml_path, toml::to_string(&original).unwrap()).unwrap();
    assert_eq!(MapDefinition::load(&toml_path).unwrap(), original);
}

#[test]
fn test_definition_file_errors_are_reported() {
    let dir = tempfile::tempdir().unwrap();

    let missing = MapDefinition::load(&dir.path().join("missing.json"));
    assert!(matches!(missing, Err(MapError::Io(_))));

    let yaml = dir.path().join("map.yaml");
    fs::write(&yaml, "name: Nope").unwrap();
    assert!(matches!(
        MapDefinition::load(&yaml),
        Err(MapError::UnsupportedFormat(extension)) if extension == "yaml"
    ));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, "{ \"name\": ").unwrap();
    assert!(matches!(MapDefinition::load(&broken), Err(MapError::Json(_))));

    let broken = dir.path().join("broken.toml");
    fs::write(&broken, "name = [").unwrap();
    assert!(matches!(MapDefinition::load(&broken), Err(MapError::Toml(_))));

    let empty = dir.path().join("empty.toml");
    fs::write(&empty, "name = \"Empty\"").unwrap();
    let definition = MapDefinition::load(&empty).expect("every key has a default");
    assert!(matches!(
        Map::new("Empty", vec![definition]),
        Err(MapError::Definition(DefinitionError::NoNodesToGenerate { .. }))
    ));
}

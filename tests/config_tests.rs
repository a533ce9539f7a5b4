use luma_wipe::config::{Configuration, Orientation};
use luma_wipe::params::Direction;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn empty_document_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.image.color, PathBuf::from("assets/image-color.jpg"));
    assert!(cfg.image.gray.is_none());
    assert!(!cfg.image.watch);
    assert!((cfg.wipe.feather - 0.06).abs() < f32::EPSILON);
    assert!((cfg.wipe.speed - 0.18).abs() < f32::EPSILON);
    assert!((cfg.wipe.noise_scale - 2.5).abs() < f32::EPSILON);
    assert_eq!(cfg.wipe.direction, Direction::DarkToBright);
    assert_eq!(cfg.loader.max_dimension, 4096);
    assert_eq!(cfg.unsplash.endpoint, "https://api.unsplash.com");
    assert_eq!(cfg.unsplash.queries.len(), 8);
    assert_eq!(cfg.unsplash.orientation, Orientation::Landscape);
    assert_eq!(cfg.viewer.title, "MaskKing");
    assert_eq!(cfg.viewer.nudge_steps, 10);
    assert_eq!(cfg.viewer.coarse_nudge_steps, 100);
}

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
image:
  color: "art/color.jpg"
  gray: "art/bw.jpg"
  watch: true
wipe:
  threshold: 0.25
  feather: 0.1
  direction: bright-to-dark
  noise-strength: 0.2
  noise-scale: 4.0
  paused: true
loader:
  max-dimension: 2048
  max-concurrent-loads: 1
unsplash:
  access-key-env: MY_KEY
  queries: [storm, flood]
  orientation: squarish
  timeout: 3s
viewer:
  title: Wipe
  fullscreen: true
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.image.gray, Some(PathBuf::from("art/bw.jpg")));
    assert_eq!(
        cfg.image.watched_paths(),
        vec![PathBuf::from("art/color.jpg"), PathBuf::from("art/bw.jpg")]
    );
    assert!((cfg.wipe.threshold - 0.25).abs() < f32::EPSILON);
    assert_eq!(cfg.wipe.direction, Direction::BrightToDark);
    assert!(cfg.wipe.paused);
    assert_eq!(cfg.loader.max_concurrent_loads, 1);
    assert_eq!(cfg.unsplash.access_key_env, "MY_KEY");
    assert_eq!(cfg.unsplash.queries, vec!["storm", "flood"]);
    assert_eq!(cfg.unsplash.orientation, Orientation::Squarish);
    assert_eq!(cfg.unsplash.timeout, Duration::from_secs(3));
    assert!(cfg.viewer.fullscreen);
}

#[test]
fn out_of_range_wipe_values_are_clamped() {
    let yaml = r#"
wipe:
  threshold: 1.7
  feather: -1.0
  speed: 9.0
  noise-strength: 1.0
  noise-scale: 0.1
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.wipe.threshold, 1.0);
    assert_eq!(cfg.wipe.feather, 0.0);
    assert_eq!(cfg.wipe.speed, 1.5);
    assert!((cfg.wipe.noise_strength - 0.35).abs() < f32::EPSILON);
    assert_eq!(cfg.wipe.noise_scale, 0.5);
}

#[test]
fn rejects_invalid_values() {
    for yaml in [
        "loader:\n  max-dimension: 0\n",
        "loader:\n  max-concurrent-loads: 0\n",
        "unsplash:\n  queries: []\n",
        "unsplash:\n  timeout: 0s\n",
        "viewer:\n  nudge-steps: 0\n",
    ] {
        let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.validated().is_err(), "accepted: {yaml}");
    }
}

#[test]
fn rejects_unknown_direction() {
    let yaml = "wipe:\n  direction: sideways\n";
    assert!(serde_yaml::from_str::<Configuration>(yaml).is_err());
}

#[test]
fn access_key_prefers_config_value() {
    let yaml = r#"
unsplash:
  access-key: "  from-file  "
  access-key-env: LUMA_WIPE_TEST_UNSET_VARIABLE
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.unsplash.resolve_access_key().as_deref(), Some("from-file"));
    assert!(!format!("{:?}", cfg.unsplash).contains("from-file"));
}

#[test]
fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "viewer:\n  title: From File\n").unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.viewer.title, "From File");
    assert!(Configuration::from_yaml_file(dir.path().join("missing.yaml")).is_err());
}

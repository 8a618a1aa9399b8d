use spin_config::{load_file, load_toml};
use rstest::rstest;

const BASE: &str = r#"
[serial]
port = "/dev/ttyUSB0"

[ports]
chamber = 1
drain = 2
air = 3
waste = 4
fluid_1 = 5
fluid_2 = 6

[wash]
volume_ml = 25.0
count = 3
"#;

#[test]
fn minimal_config_gets_bench_defaults() {
    let cfg = load_toml(BASE).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.serial.baud_rate, 9600);
    assert_eq!(cfg.pump.fill_stroke_ul, 5000);
    assert_eq!(cfg.pump.prime_stroke_ul, 1500);
    assert_eq!(cfg.motor.agitation_velocity, 300_000);
    assert_eq!(cfg.timing.self_test_dwell_ms, 3000);
    assert!(cfg.wash.duration_min.is_none());
    assert!(cfg.clean.soak_min > 0.0);
}

#[test]
fn rejects_two_ports_on_one_position() {
    let toml = BASE.replace("fluid_2 = 6", "fluid_2 = 5");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate position must fail");
    let msg = err.to_string();
    assert!(msg.contains("fluid_1") && msg.contains("fluid_2"), "{msg}");
}

#[rstest]
#[case("chamber = 1", "chamber = 0", "ports.chamber")]
#[case("chamber = 1", "chamber = 7", "outside 1..=6")]
#[case("count = 3", "count = 0", "wash.count")]
#[case("volume_ml = 25.0", "volume_ml = -1.0", "wash.volume_ml")]
#[case("volume_ml = 25.0", "volume_ml = 1e10", "wash.volume_ml")]
#[case("count = 3", "count = 3\nduration_min = 1e300", "wash.duration_min")]
#[case("count = 3", "count = 3\n\n[clean]\nsoak_min = 1441.0", "clean.soak_min")]
#[case("port = \"/dev/ttyUSB0\"", "port = \"/dev/ttyUSB0\"\nbaud_rate = 1234", "baud_rate")]
fn rejects_out_of_range_values(
    #[case] from: &str,
    #[case] to: &str,
    #[case] needle: &str,
) {
    let cfg = load_toml(&BASE.replacen(from, to, 1)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn rejects_prime_stroke_larger_than_syringe() {
    let toml = format!("{BASE}\n[pump]\nprime_stroke_ul = 6000\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("oversized prime");
    assert!(err.to_string().contains("prime_stroke_ul"));
}

#[test]
fn rejects_unknown_rotation() {
    let toml = format!("{BASE}\n[logging]\nrotation = \"weekly\"\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_non_positive_clean_soak() {
    let toml = format!("{BASE}\n[clean]\nsoak_min = 0.0\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    let err = cfg.validate().expect_err("zero soak");
    assert!(err.to_string().contains("clean.soak_min"));
}

#[test]
fn missing_ports_section_is_a_parse_error() {
    let toml = BASE.replace("[ports]", "[not_ports]");
    assert!(load_toml(&toml).is_err());
}

#[test]
fn load_file_reads_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.toml");
    std::fs::write(&good, BASE).unwrap();
    let cfg = load_file(&good).expect("load");
    assert_eq!(cfg.ports.fluid_2, 6);

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, BASE.replace("count = 3", "count = 0")).unwrap();
    assert!(load_file(&bad).is_err());

    let missing = dir.path().join("missing.toml");
    let err = load_file(&missing).expect_err("missing file");
    assert!(err.to_string().contains("read config"));
}

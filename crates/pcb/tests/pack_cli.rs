use anyhow::Result;
use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;

const INPUT: &str = r#"{
    "components": [
        {
            "component_id": "U1",
            "pads": [
                { "pad_id": "U1.1", "network_id": "VCC", "size": { "x": 1.0, "y": 0.5 }, "offset": { "x": -2.0, "y": 0.0 } },
                { "pad_id": "U1.2", "network_id": "GND", "size": { "x": 1.0, "y": 0.5 }, "offset": { "x": 2.0, "y": 0.0 } }
            ]
        },
        {
            "component_id": "C1",
            "pads": [
                { "pad_id": "C1.1", "network_id": "VCC", "size": { "x": 0.6, "y": 0.6 }, "offset": { "x": -0.5, "y": 0.0 } },
                { "pad_id": "C1.2", "network_id": "GND", "size": { "x": 0.6, "y": 0.6 }, "offset": { "x": 0.5, "y": 0.0 } }
            ],
            "available_rotation_degrees": [0, 90]
        }
    ],
    "min_gap": 0.2
}"#;

fn pcb() -> Command {
    Command::cargo_bin("pcb").unwrap()
}

#[test]
fn test_pack_writes_output_that_checks_clean() -> Result<()> {
    let temp = TempDir::new()?;
    let input = temp.child("input.json");
    input.write_str(INPUT)?;
    let output = temp.child("packed.json");

    pcb()
        .arg("pack")
        .arg(input.path())
        .arg("--output")
        .arg(output.path())
        .assert()
        .success();

    let packed: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(output.path())?)?;
    let components = packed["components"].as_array().unwrap();
    assert_eq!(components.len(), 2);
    assert_eq!(components[0]["component_id"], "U1");

    let assert = pcb()
        .arg("check")
        .arg(output.path())
        .arg("--input")
        .arg(input.path())
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("no violations"), "{stdout}");
    Ok(())
}

#[test]
fn test_pack_prints_to_stdout_with_overrides() -> Result<()> {
    let temp = TempDir::new()?;
    let input = temp.child("input.json");
    input.write_str(INPUT)?;

    let assert = pcb()
        .args(["pack", "--min-gap", "0.5", "--order", "input-order", "--objective", "sum-distance"])
        .arg(input.path())
        .assert()
        .success();

    let packed: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(packed["components"].as_array().unwrap().len(), 2);
    Ok(())
}

#[test]
fn test_check_reports_overlaps() -> Result<()> {
    let temp = TempDir::new()?;
    let packed = temp.child("packed.json");
    packed.write_str(
        r#"{
        "components": [
            {
                "component_id": "A",
                "center": { "x": 0.0, "y": 0.0 },
                "ccw_rotation_offset_degrees": 0.0,
                "pads": [{
                    "pad_id": "A.1", "network_id": "N", "size": { "x": 1.0, "y": 1.0 },
                    "offset": { "x": 0.0, "y": 0.0 }, "absolute_center": { "x": 0.0, "y": 0.0 }
                }]
            },
            {
                "component_id": "B",
                "center": { "x": 0.5, "y": 0.0 },
                "ccw_rotation_offset_degrees": 0.0,
                "pads": [{
                    "pad_id": "B.1", "network_id": "N", "size": { "x": 1.0, "y": 1.0 },
                    "offset": { "x": 0.0, "y": 0.0 }, "absolute_center": { "x": 0.5, "y": 0.0 }
                }]
            }
        ]
    }"#,
    )?;

    let assert = pcb().arg("check").arg(packed.path()).assert().failure();
    let output = assert.get_output();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    assert!(stdout.contains("A overlaps B"), "{stdout}");
    assert!(stderr.contains("1 violations found"), "{stderr}");
    Ok(())
}

#[test]
fn test_unplaceable_component_fails_with_its_id() -> Result<()> {
    let temp = TempDir::new()?;
    let input = temp.child("input.json");
    input.write_str(
        r#"{
        "components": [
            {
                "component_id": "BIG",
                "pads": [{
                    "pad_id": "BIG.1", "network_id": "N",
                    "size": { "x": 2.0, "y": 2.0 }, "offset": { "x": 0.0, "y": 0.0 }
                }]
            },
            {
                "component_id": "SMALL",
                "pads": [{
                    "pad_id": "SMALL.1", "network_id": "N",
                    "size": { "x": 1.0, "y": 1.0 }, "offset": { "x": 0.0, "y": 0.0 }
                }]
            }
        ],
        "bounds": { "min_x": -1.0, "min_y": -1.0, "max_x": 1.0, "max_y": 1.0 }
    }"#,
    )?;

    let assert = pcb().arg("pack").arg(input.path()).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("SMALL"), "{stderr}");
    Ok(())
}

#[test]
fn test_malformed_input_is_reported() -> Result<()> {
    let temp = TempDir::new()?;
    let input = temp.child("input.json");
    input.write_str("{ \"components\": 5 }")?;

    let assert = pcb().arg("pack").arg(input.path()).assert().failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("Failed to parse pack input"), "{stderr}");
    Ok(())
}

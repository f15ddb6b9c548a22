//! Build script for lumen-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates panel.toml at compile time
//! - Encodes the panel description for the firmware to load at boot

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use lumen_core::PanelConfig;

fn main() {
    setup_linker();
    let config = validate_config();
    write_panel(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate panel.toml and parse it into a panel description
fn validate_config() -> PanelConfig {
    println!("cargo:rerun-if-changed=panel.toml");

    let config_path = Path::new("panel.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: panel.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a panel.toml describing the display.      ║\n\
            ║  Please create one in the lumen-firmware directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read panel.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    // Syntax first, so the error names a line
    let value: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in panel.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    validate_geometry(&value);
    validate_registers(&value);

    let config = match PanelConfig::from_toml(&config_content) {
        Ok(config) => config,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: panel.toml does not describe a panel                     ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ║                                                                  ║\n\
                ║  Check key names and value types against the example file.      ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    println!("cargo:warning=panel.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Panel size and offsets must fit the 320x320 frame memory
fn validate_geometry(config: &toml::Value) {
    let frame_columns = i64::from(PanelConfig::FRAME_COLUMNS);
    let frame_rows = i64::from(PanelConfig::FRAME_ROWS);
    let mut errors = Vec::new();

    let get = |key: &str, default: i64| {
        config
            .get(key)
            .and_then(|v| v.as_integer())
            .unwrap_or(default)
    };

    let width = get("width", 240);
    let height = get("height", 240);
    let column_offset = get("column_offset", 0);
    let row_offset = get("row_offset", 0);

    if width <= 0 || height <= 0 {
        errors.push(format!("width and height must be positive ({}x{})", width, height));
    }
    if column_offset < 0 || column_offset + width > frame_columns {
        errors.push(format!(
            "columns {}..{} exceed frame memory",
            column_offset,
            column_offset + width
        ));
    }
    if row_offset < 0 || row_offset + height > frame_rows {
        errors.push(format!(
            "rows {}..{} exceed frame memory",
            row_offset,
            row_offset + height
        ));
    }

    report("Invalid panel geometry", &errors);
}

/// Register values that the command layer would silently mask
fn validate_registers(config: &toml::Value) {
    let mut errors = Vec::new();
    let mut check = |path: &str, value: Option<&toml::Value>, max: i64| {
        check_range(&mut errors, path, value, max)
    };

    check("vcom", config.get("vcom"), 0x3F);
    check("lcm", config.get("lcm"), 0x7F);
    check("vrh", config.get("vrh"), 0x3F);
    check("vdv", config.get("vdv"), 0x3F);

    if let Some(gate) = config.get("gate") {
        check("gate.vghs", gate.get("vghs"), 0x07);
        check("gate.vgls", gate.get("vgls"), 0x07);
    }
    if let Some(frame_rate) = config.get("frame_rate") {
        check("frame_rate.nla", frame_rate.get("nla"), 0x07);
        check("frame_rate.rtna", frame_rate.get("rtna"), 0x1F);
    }
    if let Some(power) = config.get("power") {
        check("power.avdd", power.get("avdd"), 0x03);
        check("power.avcl", power.get("avcl"), 0x03);
        check("power.vds", power.get("vds"), 0x03);
    }
    if let Some(porch) = config.get("porch") {
        check("porch.back", porch.get("back"), 0x7F);
        check("porch.front", porch.get("front"), 0x7F);
        for key in ["idle_back", "idle_front", "partial_back", "partial_front"] {
            check(&format!("porch.{}", key), porch.get(key), 0x0F);
        }
    }

    for table in ["positive_gamma", "negative_gamma"] {
        if let Some(bytes) = config.get(table) {
            match bytes.as_array() {
                Some(array) if array.len() == 14 => {
                    for (i, byte) in array.iter().enumerate() {
                        check_range(&mut errors, &format!("{}[{}]", table, i), Some(byte), 0xFF);
                    }
                }
                _ => errors.push(format!("{} must be an array of 14 bytes", table)),
            }
        }
    }

    report("Register value out of range", &errors);
}

fn check_range(errors: &mut Vec<String>, path: &str, value: Option<&toml::Value>, max: i64) {
    if let Some(v) = value.and_then(|v| v.as_integer()) {
        if !(0..=max).contains(&v) {
            errors.push(format!("{} = {:#04x} (max {:#04x})", path, v, max));
        }
    }
}

fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    let error_list = errors
        .iter()
        .map(|e| format!("║  - {:<62} ║", e))
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, error_list
    );
}

/// Encode the parsed panel for `include_bytes!`
fn write_panel(config: &PanelConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let bytes = config.to_postcard_vec().unwrap();
    fs::write(out_dir.join("panel.bin"), bytes).unwrap();
}

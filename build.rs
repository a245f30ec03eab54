// build.rs
//
// Generates the C header for the re-injection engine by scanning the Rust
// sources for the enums shared with C:
//
//   src/lib.rs    -> ResultCode        (SCP result codes)
//   src/config.rs -> SubCommand, PacketType, and the build-time tunables
//   src/c_api.rs  -> ReinjectorStatus  (C ABI status codes)
//
// No cbindgen is used. Output:
//   - C-Headers/reinjector.h   (injects into the template marker)
//
// Optional env vars:
//   - REINJECTOR_RS_SKIP_ENUMGEN=1      -> skip header generation
//   - REINJECTOR_PKT_QUEUE_SIZE=<n>     -> queue slots (also read by the crate)
//   - REINJECTOR_TICK_PERIOD_US=<n>     -> timer tick (also read by the crate)

use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const TUNABLE_ENVS: &[&str] = &["REINJECTOR_PKT_QUEUE_SIZE", "REINJECTOR_TICK_PERIOD_US"];

// ========================= main =========================

fn main() {
    // The crate reads these through `define_env_constant!`; rebuild when they change.
    for var in TUNABLE_ENVS {
        println!("cargo:rerun-if-env-changed={var}");
    }
    println!("cargo:rerun-if-env-changed=REINJECTOR_RS_SKIP_ENUMGEN");

    if env::var_os("REINJECTOR_RS_SKIP_ENUMGEN").is_some() {
        println!("cargo:warning=Skipping enum generation (REINJECTOR_RS_SKIP_ENUMGEN set)");
        return;
    }

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));

    let lib_rs = crate_dir.join("src/lib.rs");
    let config_rs = crate_dir.join("src/config.rs");
    let c_api_rs = crate_dir.join("src/c_api.rs");
    let header_tpl = crate_dir.join("header_templates/reinjector.h.txt");

    for p in [&lib_rs, &config_rs, &c_api_rs, &header_tpl] {
        println!("cargo:rerun-if-changed={}", p.display());
    }

    let lib_text = read(&lib_rs);
    let config_text = read(&config_rs);
    let c_api_text = read(&c_api_rs);

    let result_codes = parse_enum(&lib_text, "ResultCode", &lib_rs);
    let sub_commands = parse_enum(&config_text, "SubCommand", &config_rs);
    let packet_types = parse_enum(&config_text, "PacketType", &config_rs);
    let statuses = parse_enum(&c_api_text, "ReinjectorStatus", &c_api_rs);

    let tunables = parse_tunables(&config_text, &config_rs);

    let c_enums = [
        render_c_enum("ReinjectorResultCode", "REINJECTOR_RC_", &result_codes),
        render_c_enum("ReinjectorSubCommand", "REINJECTOR_CMD_", &sub_commands),
        render_c_enum("ReinjectorPacketType", "REINJECTOR_PKT_", &packet_types),
        render_c_enum("ReinjectorStatus", "REINJECTOR_", &statuses),
    ]
    .join("\n\n");

    let injected = format!("{}\n\n{c_enums}\n", render_c_defines(&tunables));

    write_injected(
        &header_tpl,
        "/* {{AUTOGEN:ENUMS}} */",
        &crate_dir.join("C-Headers/reinjector.h"),
        &injected,
    );
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

// ========================= parsing =========================

#[derive(Debug, Clone)]
struct EnumMember {
    name: String,
    /// Value as written in the source (decimal or hex), so the header keeps
    /// the same spelling.
    value: String,
    doc: Option<String>,
}

/// Parse `pub enum <name> { Variant = <int>, ... }`, keeping `///` docs.
fn parse_enum(text: &str, name: &str, path: &Path) -> Vec<EnumMember> {
    let re_enum = Regex::new(&format!(r"(?s)\bpub\s+enum\s+{name}\s*\{{(.*?)\}}"))
        .expect("regex compile failed");

    let caps = re_enum.captures(text).unwrap_or_else(|| {
        panic!(
            "could not find `pub enum {name} {{ ... }}` in {}",
            path.display()
        )
    });
    let body = caps.get(1).unwrap().as_str();

    let re_member =
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=\s*(-?(?:0x[0-9A-Fa-f]+|\d+))\s*,?\s*$")
            .expect("regex compile failed");
    let re_doc = Regex::new(r"^\s*///\s?(.*)$").expect("regex compile failed");

    let mut members = Vec::new();
    let mut doc: Vec<String> = Vec::new();
    for line in body.lines() {
        if let Some(d) = re_doc.captures(line) {
            doc.push(d.get(1).unwrap().as_str().trim().to_string());
            continue;
        }
        if let Some(m) = re_member.captures(line) {
            members.push(EnumMember {
                name: m.get(1).unwrap().as_str().to_string(),
                value: m.get(2).unwrap().as_str().to_string(),
                doc: (!doc.is_empty()).then(|| doc.join(" ")),
            });
        }
        doc.clear();
    }

    if members.is_empty() {
        panic!(
            "{name} enum found, but no explicit `Variant = <int>` members were parsed in {}",
            path.display()
        );
    }
    members
}

/// `define_env_constant!(NAME: ty, env = "VAR", default = N ...)` invocations,
/// resolved against the build environment the same way the macro does.
fn parse_tunables(text: &str, path: &Path) -> Vec<(String, u64)> {
    let re = Regex::new(
        r#"(?s)define_env_constant!\s*\(\s*([A-Z_][A-Z0-9_]*)\s*:\s*\w+\s*,\s*env\s*=\s*"([^"]+)"\s*,\s*default\s*=\s*(\d+)(?:\s*,\s*min\s*=\s*(\d+))?"#,
    )
    .expect("regex compile failed");

    let mut out = Vec::new();
    for c in re.captures_iter(text) {
        let name = c.get(1).unwrap().as_str().to_string();
        let var = c.get(2).unwrap().as_str();
        let default: u64 = c.get(3).unwrap().as_str().parse().unwrap();
        let min: u64 = c.get(4).map_or(1, |m| m.as_str().parse().unwrap());

        let value = env::var(var)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v >= min)
            .unwrap_or(default);
        out.push((name, value));
    }

    if out.is_empty() {
        panic!("no define_env_constant! invocations found in {}", path.display());
    }
    out
}

fn to_screaming_snake(s: &str) -> String {
    // PascalCase -> SCREAMING_SNAKE
    let mut out = String::new();
    let mut prev_lower_or_digit = false;

    for ch in s.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(ch);
            prev_lower_or_digit = false;
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
            prev_lower_or_digit = true;
        }
    }

    if out.is_empty() {
        "UNKNOWN".to_string()
    } else {
        out
    }
}

// ========================= render C =========================

fn render_c_enum(type_name: &str, prefix: &str, members: &[EnumMember]) -> String {
    let mut lines = Vec::new();
    lines.push(format!("typedef enum {type_name} {{"));

    for m in members {
        if let Some(doc) = &m.doc {
            lines.push(format!("  /* {} */", sanitize_c_comment(doc)));
        }
        lines.push(format!(
            "  {prefix}{} = {},",
            to_screaming_snake(&m.name),
            m.value
        ));
    }

    lines.push(format!("}} {type_name};"));
    lines.join("\n")
}

fn render_c_defines(tunables: &[(String, u64)]) -> String {
    tunables
        .iter()
        .map(|(name, value)| format!("#define REINJECTOR_{name} {value}u"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn sanitize_c_comment(s: &str) -> String {
    s.replace("*/", "* /")
}

// ========================= template injection =========================

fn write_injected(template_path: &Path, marker: &str, out_path: &Path, injected: &str) {
    let tpl = fs::read_to_string(template_path)
        .unwrap_or_else(|e| panic!("read template {} failed: {e}", template_path.display()));

    if !tpl.contains(marker) {
        panic!(
            "template {} is missing marker: {}",
            template_path.display(),
            marker
        );
    }

    let final_text = tpl.replace(marker, injected);

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .unwrap_or_else(|e| panic!("create dir {} failed: {e}", parent.display()));
    }

    fs::write(out_path, final_text)
        .unwrap_or_else(|e| panic!("write {} failed: {e}", out_path.display()));
}

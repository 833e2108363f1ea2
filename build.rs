use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LOCALE: &str = "en";

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let locales_dir = manifest_dir.join("locales");
    println!("cargo:rerun-if-changed={}", locales_dir.display());

    let mut locales = Vec::new();
    if let Ok(entries) = fs::read_dir(&locales_dir) {
        let mut paths = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect::<Vec<_>>();
        paths.sort();
        for path in paths {
            println!("cargo:rerun-if-changed={}", path.display());
            locales.push(load_locale(&path));
        }
    }

    let mut out = String::new();
    writeln!(out, "pub const DEFAULT_LOCALE: &str = {DEFAULT_LOCALE:?};").expect("write");
    writeln!(out, "pub static LOCALES: &[(&str, &[(&str, &str)])] = &[").expect("write");
    for (locale, entries) in &locales {
        writeln!(out, "    ({locale:?}, &[").expect("write");
        for (key, value) in entries {
            writeln!(out, "        ({key:?}, {value:?}),").expect("write");
        }
        writeln!(out, "    ]),").expect("write");
    }
    writeln!(out, "];").expect("write");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("out dir"));
    fs::write(out_dir.join("hddui_i18n_generated.rs"), out).expect("write generated catalog");
}

fn load_locale(path: &Path) -> (String, Vec<(String, String)>) {
    let locale = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .expect("locale file name must be valid utf-8")
        .to_string();
    let content = fs::read_to_string(path)
        .unwrap_or_else(|error| panic!("failed to read {}: {error}", path.display()));
    let table = content
        .parse::<toml::Table>()
        .unwrap_or_else(|error| panic!("failed to parse {}: {error}", path.display()));

    let mut entries = Vec::new();
    flatten("", &table, &mut entries);
    entries.sort();
    (locale, entries)
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut Vec<(String, String)>) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten(&full_key, nested, out),
            toml::Value::String(text) => out.push((full_key, text.clone())),
            other => out.push((full_key, other.to_string())),
        }
    }
}

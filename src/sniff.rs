//! Content sniffer - maps raw entry bytes to a filename extension tag.
//!
//! [`sniff`] is a pure function: same bytes in, same extension out, no
//! I/O, no allocation beyond the returned `&'static str`. It is called up
//! to three times per entry by the pipeline (`crate::pipeline`) as each
//! unwrapping stage peels off a layer (scramble, rotor, decompression).
//!
//! Rule order is significant - the first matching rule wins, and this
//! module preserves the original tool's evaluation order exactly (prefix
//! table, then the three offset checks, then the substring scan). Do not
//! reorder entries when adding new ones.

/// Exact-prefix rules, tested in order against `data[0..prefix.len()]`.
const PREFIX_RULES: &[(&[u8], &str)] = &[
    (b"CocosStudio-UI", "coc"),
    (&[0x28, 0xB5, 0x2F, 0xFD], "zst"),
    (&[0x50, 0x4B, 0x03, 0x04], "zip"),
    (&[0x50, 0x4B, 0x05, 0x06], "zip"),
    (b"SKELETON", "skeleton"),
    (b"%", "tpl"),
    (b"{", "json"),
    (b"hit", "hit"),
    (b"PKM", "pkm"),
    (b"PVR", "pvr"),
    (b"DDS", "dds"),
    (b"BM", "bmp"),
    (b"from typing import ", "pyi"),
    (b"KTX", "ktx"),
    (b"PNG", "png"),
    (b"VANT", "vant"),
    (b"MDMP", "mdmp"),
    (b"RGIS", "gis"),
    (b"NTRK", "ntrk"),
    (b"RIFF", "riff"),
    (b"BKHD", "bnk"),
    (b"-----BEGIN PUBLIC KEY-----", "pem"),
    (b"<", "xml"),
    (&[0x34, 0x80, 0xC8, 0xBB], "mesh"),
    (&[0x14, 0x00, 0x00, 0x00], "type1"),
    (&[0x04, 0x00, 0x00, 0x00], "type2"),
    (&[0x00, 0x01, 0x00, 0x00], "type3"),
    (&[0xE3, 0x00, 0x00, 0x00], "pyc"),
    (&[0x63, 0x00, 0x00, 0x00], "pyc"),
];

/// Case-insensitive substring rules, tested in order, only when
/// `data.len() < SUBSTRING_SCAN_LIMIT`.
const SUBSTRING_RULES: &[(&str, &str)] = &[
    ("package google.protobuf", "proto"),
    ("#ifndef google_protobuf", "h"),
    ("#include <google/protobuf", "cc"),
];

const SHADER_KEYWORDS: &[&str] = &["void", "main(", "include", "float"];
const SHADER_KEYWORDS_2: &[&str] = &["technique", "ifndef"];
const MODEL_KEYWORDS: &[&str] = &["biped", "bip001", "bone", "bone001", "bip01"];

const SUBSTRING_SCAN_LIMIT: usize = 1_000_000;

/// Classify `data` and return its extension tag.
///
/// Never panics, never allocates beyond what the caller already owns.
/// Tests can feed arbitrary byte slices (including empty ones) safely.
pub fn sniff(data: &[u8]) -> &'static str {
    if data.is_empty() {
        return "none";
    }

    for &(prefix, ext) in PREFIX_RULES {
        if data.starts_with(prefix) {
            return ext;
        }
    }

    if is_tga(data) {
        return "tga";
    }
    if data.len() >= 2 && matches!(&data[..2], [0x28, 0xB5] | [0x1D, 0x04] | [0x15, 0x23]) {
        return "rot";
    }
    if data.len() >= 15 && data[7..15] == [0x4E, 0x58, 0x53, 0x33, 0x03, 0x00, 0x00, 0x01] {
        return "nxs3";
    }

    if data.len() < SUBSTRING_SCAN_LIMIT {
        if let Some(ext) = sniff_by_substring(data) {
            return ext;
        }
    }

    "dat"
}

fn is_tga(data: &[u8]) -> bool {
    let trailer_ok = data.len() >= 18 && &data[data.len() - 18..data.len() - 2] == b"TRUEVISION-XFILE";
    trailer_ok || data.len() >= 3 && matches!(&data[..3], [0x00, 0x00, 0x02] | [0x0D, 0x00, 0x02])
}

fn sniff_by_substring(data: &[u8]) -> Option<&'static str> {
    // A lossy lowercase copy is fine here: the scan only needs ASCII
    // keyword matches, and this path is capped at SUBSTRING_SCAN_LIMIT
    // bytes per entry.
    let lower = String::from_utf8_lossy(data).to_lowercase();

    for &(needle, ext) in SUBSTRING_RULES {
        if lower.contains(needle) {
            return Some(ext);
        }
    }
    if SHADER_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some("shader");
    }
    if SHADER_KEYWORDS_2.iter().any(|k| lower.contains(k)) {
        return Some("shader");
    }
    if lower.contains("?xml") {
        return Some("xml");
    }
    if lower.contains("<script") {
        return Some("html");
    }
    if lower.contains("javascript") {
        return Some("js");
    }
    if MODEL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return Some("model");
    }
    if lower.contains("div.document") {
        return Some("css");
    }
    None
}
